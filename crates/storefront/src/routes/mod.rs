//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (document store)
//!
//! # Cart (local when signed out, remote when signed in)
//! GET  /cart                            - Cart lines
//! GET  /cart/count                      - Total units
//! POST /cart/add                        - Add units of an item
//! POST /cart/update                     - Overwrite a line's quantity
//! POST /cart/remove                     - Remove a line
//! POST /cart/clear                      - Empty the cart
//!
//! # Auth
//! POST /auth/sign-in                    - Verify ID token, merge carts, load profile
//! POST /auth/sign-out                   - Forget the signed-in user
//! GET  /auth/state                      - Signed-in user and cached profile
//!
//! # Account (requires auth)
//! GET  /account/profile                 - Reload profile and addresses
//! GET  /account/addresses               - Address modal view
//! POST /account/addresses/events        - Apply an address modal event
//! POST /account/addresses               - Add an address
//! POST /account/addresses/{id}/default  - Make an address the default
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod health;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the auth routes router.
///
/// Sign-in gets the strict limiter; the rest share the API limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-in", post(auth::sign_in))
        .layer(auth_rate_limiter())
        .merge(
            Router::new()
                .route("/sign-out", post(auth::sign_out))
                .route("/state", get(auth::auth_state))
                .layer(api_rate_limiter()),
        )
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(account::profile))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/events", post(account::address_event))
        .route(
            "/addresses/{id}/default",
            post(account::set_default_address),
        )
}

/// Create all routes for the storefront, with per-group rate limits.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes().layer(api_rate_limiter()))
        .nest("/auth", auth_routes())
        .nest("/account", account_routes().layer(api_rate_limiter()))
}

/// Build the complete application: routes, sessions, and the middleware stack.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    Router::new()
        .merge(routes())
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .with_state(state)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

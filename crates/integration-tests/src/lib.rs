//! Integration tests for Shopfront.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (in-memory document and session stores)
//! cargo test -p shopfront-integration-tests
//!
//! # Tests against a running storefront (`STOREFRONT_URL`)
//! cargo test -p shopfront-integration-tests -- --ignored
//! ```
//!
//! [`TestApp`] drives the full router in process: the real middleware
//! stack over a [`MemoryDocumentStore`], an in-memory session store, and a
//! [`FakeIdentity`] that accepts tokens of the form `valid:{uid}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use shopfront_core::UserUid;
use shopfront_storefront::config::{AuthConfig, StorefrontConfig};
use shopfront_storefront::db::MemoryDocumentStore;
use shopfront_storefront::models::CurrentUser;
use shopfront_storefront::routes;
use shopfront_storefront::services::auth::{AuthError, IdentityVerifier};
use shopfront_storefront::state::AppState;

/// Client IP sent with every request; the rate limiters key on it.
const TEST_CLIENT_IP: &str = "203.0.113.7";

/// Identity verifier accepting `valid:{uid}` tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeIdentity;

#[async_trait]
impl IdentityVerifier for FakeIdentity {
    async fn verify(&self, id_token: &str) -> Result<CurrentUser, AuthError> {
        let uid = id_token
            .strip_prefix("valid:")
            .filter(|uid| !uid.is_empty())
            .ok_or(AuthError::InvalidToken)?;
        Ok(CurrentUser {
            uid: UserUid::new(uid),
            email: Some(format!("{uid}@example.com")),
            display_name: None,
        })
    }
}

/// Configuration for in-process tests.
///
/// # Panics
///
/// Never panics; the URLs are constants.
#[must_use]
#[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/shopfront_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        auth: AuthConfig {
            api_key: SecretString::from("test-api-key"),
            base_url: Url::parse("http://localhost:9099/identitytoolkit/v1").unwrap(),
            timeout: Duration::from_secs(5),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Response captured by [`TestApp::send`].
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// Parsed JSON body; plain text as a string, `Value::Null` when empty.
    pub body: Value,
}

/// One browser talking to an in-process storefront.
///
/// Keeps the session cookie between requests.
pub struct TestApp {
    router: Router,
    /// Document store behind the app, for seeding and assertions.
    pub documents: Arc<MemoryDocumentStore>,
    cookie: Option<String>,
}

impl TestApp {
    /// Build a fresh app with empty stores.
    #[must_use]
    pub fn new() -> Self {
        let documents = Arc::new(MemoryDocumentStore::new());
        let state = AppState::new(test_config(), documents.clone(), Arc::new(FakeIdentity));
        Self {
            router: routes::app(state, MemoryStore::default()),
            documents,
            cookie: None,
        }
    }

    /// Send a request, optionally with a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    #[allow(clippy::missing_panics_doc, clippy::unwrap_used)]
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", TEST_CLIENT_IP);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, body }
    }

    /// `GET` a path.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    /// `POST` a JSON body to a path.
    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    /// Sign in as `uid` through the public endpoint.
    pub async fn sign_in(&mut self, uid: &str) -> TestResponse {
        self.post(
            "/auth/sign-in",
            serde_json::json!({ "idToken": format!("valid:{uid}") }),
        )
        .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

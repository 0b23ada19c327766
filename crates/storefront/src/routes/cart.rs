//! Cart route handlers.
//!
//! Signed-out visitors use the device-local cart kept in their session.
//! Signed-in users use their remote cart in the document store. Every
//! handler answers with the resulting cart.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::{CartLine, ItemId, Quantity};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, session_keys};
use crate::services::local_cart::LocalCart;
use crate::services::local_storage::SessionStorage;
use crate::services::remote_cart::RemoteCart;
use crate::state::AppState;

/// Cart returned by every cart endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Whether the lines come from the remote cart.
    pub signed_in: bool,
    pub lines: Vec<CartLine>,
    pub total_quantity: u64,
}

impl CartView {
    fn new(signed_in: bool, lines: Vec<CartLine>) -> Self {
        let total_quantity = lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum();
        Self {
            signed_in,
            lines,
            total_quantity,
        }
    }
}

/// Cart count badge.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub item_id: ItemId,
    /// Defaults to one unit.
    pub quantity: Option<Quantity>,
}

/// Change quantity request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub item_id: ItemId,
    pub quantity: Quantity,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub item_id: ItemId,
}

// =============================================================================
// Helpers
// =============================================================================

/// Load the session slot holding the device-local cart.
async fn local_storage(session: &Session) -> Result<SessionStorage> {
    Ok(SessionStorage::load(session, &[session_keys::LOCAL_CART]).await?)
}

/// Reject item ids that cannot name a cart document.
fn validate_item_id(item_id: &ItemId) -> Result<()> {
    let id = item_id.as_str();
    if id.trim().is_empty() || id.contains('/') {
        return Err(AppError::BadRequest(format!("invalid item id: {id:?}")));
    }
    Ok(())
}

/// Current cart for the visitor.
async fn current_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<CartView> {
    match user {
        Some(user) => {
            let lines = RemoteCart::new(state.documents())
                .lines(&user.context())
                .await?;
            Ok(CartView::new(true, lines))
        }
        None => {
            let mut storage = local_storage(session).await?;
            let lines = LocalCart::new(&mut storage).lines();
            Ok(CartView::new(false, lines))
        }
    }
}

/// Run `mutate` against the device-local cart and write it back.
async fn with_local_cart<F>(session: &Session, mutate: F) -> Result<()>
where
    F: FnOnce(&mut LocalCart<'_, SessionStorage>),
{
    let mut storage = local_storage(session).await?;
    mutate(&mut LocalCart::new(&mut storage));
    storage.persist(session).await?;
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartView>> {
    current_cart(&state, &session, user.as_ref()).await.map(Json)
}

/// Total number of units in the cart.
#[instrument(skip(state, session, user))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartCount>> {
    let cart = current_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(CartCount {
        count: cart.total_quantity,
    }))
}

/// Add units of an item, creating its line if needed.
#[instrument(skip(state, session, user), fields(item_id = %body.item_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    validate_item_id(&body.item_id)?;
    let quantity = body.quantity.unwrap_or(Quantity::ONE);

    match &user {
        Some(user) => {
            RemoteCart::new(state.documents())
                .add_or_increment(&user.context(), &body.item_id, quantity)
                .await?;
        }
        None => with_local_cart(&session, |cart| cart.add(&body.item_id, quantity)).await?,
    }

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("item_id", body.item_id.as_str())]),
    );
    current_cart(&state, &session, user.as_ref()).await.map(Json)
}

/// Overwrite the quantity of a line. Unknown items are ignored.
#[instrument(skip(state, session, user), fields(item_id = %body.item_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    validate_item_id(&body.item_id)?;

    match &user {
        Some(user) => {
            let applied = RemoteCart::new(state.documents())
                .change_quantity(&user.context(), &body.item_id, body.quantity)
                .await?;
            if !applied {
                tracing::debug!("Quantity change for missing line ignored");
            }
        }
        None => {
            with_local_cart(&session, |cart| {
                cart.change_quantity(&body.item_id, body.quantity);
            })
            .await?;
        }
    }

    current_cart(&state, &session, user.as_ref()).await.map(Json)
}

/// Remove a line.
#[instrument(skip(state, session, user), fields(item_id = %body.item_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(body): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    validate_item_id(&body.item_id)?;

    match &user {
        Some(user) => {
            RemoteCart::new(state.documents())
                .remove(&user.context(), &body.item_id)
                .await?;
        }
        None => with_local_cart(&session, |cart| cart.remove(&body.item_id)).await?,
    }

    current_cart(&state, &session, user.as_ref()).await.map(Json)
}

/// Empty the cart.
///
/// Clearing a remote cart is not atomic; if some deletes fail the request
/// fails and the remaining lines stay in place.
#[instrument(skip(state, session, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartView>> {
    match &user {
        Some(user) => {
            let report = RemoteCart::new(state.documents())
                .clear(&user.context())
                .await?;
            if !report.is_complete() {
                return Err(AppError::Internal(format!(
                    "{} of {} cart lines could not be removed",
                    report.failed.len(),
                    report.failed.len() + report.succeeded.len()
                )));
            }
        }
        None => with_local_cart(&session, |cart| cart.clear()).await?,
    }

    current_cart(&state, &session, user.as_ref()).await.map(Json)
}

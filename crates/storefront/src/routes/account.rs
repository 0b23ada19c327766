//! Account route handlers.
//!
//! These routes require a signed-in user. Every address mutation is
//! followed by a full profile reload, cached in the session.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::{Address, AddressForm, AddressId, AddressModal};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{UserContext, UserState, session_keys};
use crate::services::addresses::{AddressBook, AddressEvent, AddressManager};
use crate::services::profile::ProfileLoader;
use crate::state::AppState;

/// Address modal as shown to the user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressModalView {
    pub view: AddressModal,
    pub open: bool,
    pub form: AddressForm,
    /// Default address first, the rest in stored order.
    pub addresses: Vec<Address>,
}

impl AddressModalView {
    fn new(manager: &AddressManager, profile: &UserState) -> Self {
        Self {
            view: manager.view(),
            open: manager.is_open(),
            form: manager.form().clone(),
            addresses: AddressBook::sorted_for_display(&profile.addresses)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

/// Response to a directly added address.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCreated {
    pub id: AddressId,
    pub profile: UserState,
}

// =============================================================================
// Helpers
// =============================================================================

/// Reload the profile and cache it in the session.
async fn refresh_profile(
    state: &AppState,
    session: &Session,
    ctx: &UserContext,
) -> Result<UserState> {
    let profile = ProfileLoader::new(state.documents())
        .update_user_data(ctx)
        .await?;
    session.insert(session_keys::USER_STATE, &profile).await?;
    Ok(profile)
}

async fn load_manager(session: &Session) -> Result<AddressManager> {
    Ok(session
        .get::<AddressManager>(session_keys::ADDRESS_MANAGER)
        .await?
        .unwrap_or_default())
}

// =============================================================================
// Handlers
// =============================================================================

/// Load the profile on demand.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserState>> {
    refresh_profile(&state, &session, &user.context())
        .await
        .map(Json)
}

/// Show the address modal with a freshly loaded address list.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn addresses(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AddressModalView>> {
    let manager = load_manager(&session).await?;
    let profile = refresh_profile(&state, &session, &user.context()).await?;
    Ok(Json(AddressModalView::new(&manager, &profile)))
}

/// Apply a modal event.
///
/// The stored modal state only changes if the event succeeds.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn address_event(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(event): Json<AddressEvent>,
) -> Result<Json<AddressModalView>> {
    let ctx = user.context();
    let mut manager = load_manager(&session).await?;

    let mutated = manager
        .handle(&AddressBook::new(state.documents()), &ctx, event)
        .await?;
    session
        .insert(session_keys::ADDRESS_MANAGER, &manager)
        .await?;

    let profile = if mutated {
        refresh_profile(&state, &session, &ctx).await?
    } else {
        session
            .get::<UserState>(session_keys::USER_STATE)
            .await?
            .unwrap_or_default()
    };
    Ok(Json(AddressModalView::new(&manager, &profile)))
}

/// Add an address without going through the modal.
#[instrument(skip(state, session, user, form), fields(uid = %user.uid))]
pub async fn create_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(form): Json<AddressForm>,
) -> Result<(StatusCode, Json<AddressCreated>)> {
    let ctx = user.context();
    let id = AddressBook::new(state.documents()).add(&ctx, form).await?;
    let profile = refresh_profile(&state, &session, &ctx).await?;
    Ok((StatusCode::CREATED, Json(AddressCreated { id, profile })))
}

/// Make an address the default without going through the modal.
#[instrument(skip(state, session, user), fields(uid = %user.uid))]
pub async fn set_default_address(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<UserState>> {
    let ctx = user.context();
    AddressBook::new(state.documents())
        .set_default(&ctx, &id)
        .await?;
    refresh_profile(&state, &session, &ctx).await.map(Json)
}

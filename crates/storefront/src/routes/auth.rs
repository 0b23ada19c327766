//! Sign-in and sign-out.
//!
//! Sign-in is the transition that merges the device-local cart into the
//! user's remote cart and loads their profile.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::ItemId;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, UserState, session_keys};
use crate::services::addresses::AddressManager;
use crate::services::local_storage::SessionStorage;
use crate::services::profile::ProfileLoader;
use crate::services::reconcile::{CartReconciler, MergeReport};
use crate::state::AppState;

/// Sign-in request carrying the provider's ID token.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub id_token: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

/// Outcome of merging the local cart at sign-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub merged: Vec<ItemId>,
    pub failed: Vec<ItemId>,
}

impl From<MergeReport> for MergeSummary {
    fn from(report: MergeReport) -> Self {
        Self {
            merged: report.succeeded,
            failed: report.failed.into_iter().map(|(id, _)| id).collect(),
        }
    }
}

/// Sign-in response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub user: CurrentUser,
    pub profile: UserState,
    pub cart_merge: MergeSummary,
}

/// Authentication state of the visitor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub signed_in: bool,
    pub user: Option<CurrentUser>,
    /// Last loaded profile snapshot, if any.
    pub profile: Option<UserState>,
}

/// Sign in with an ID token.
///
/// Verifies the token, stores the user in a fresh session, merges the
/// device-local cart into the remote cart, then loads the profile.
/// Cart merge failures are reported, not raised.
#[instrument(skip(state, session))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SignInRequest>,
) -> Result<Json<SignInResponse>> {
    let user = state.identity().verify(&body.id_token).await?;

    // New session id on privilege change
    session.cycle_id().await?;
    set_current_user(&session, &user).await?;
    set_sentry_user(&user.uid, user.email.as_deref());
    tracing::info!(uid = %user.uid, "User signed in");

    let ctx = user.context();
    let mut storage = SessionStorage::load(&session, &[session_keys::LOCAL_CART]).await?;
    let report = CartReconciler::new(state.documents())
        .combine_carts(&ctx, &mut storage)
        .await;
    storage.persist(&session).await?;

    let profile = ProfileLoader::new(state.documents())
        .update_user_data(&ctx)
        .await?;
    session.insert(session_keys::USER_STATE, &profile).await?;
    session
        .insert(session_keys::ADDRESS_MANAGER, AddressManager::new())
        .await?;

    Ok(Json(SignInResponse {
        user,
        profile,
        cart_merge: report.into(),
    }))
}

/// Sign out.
///
/// Failures are only logged; the response is always `204 No Content`.
#[instrument(skip(session))]
pub async fn sign_out(session: Session) -> StatusCode {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session on sign-out");
    }
    if let Err(e) = session.cycle_id().await {
        tracing::warn!(error = %e, "Failed to rotate session id on sign-out");
    }
    clear_sentry_user();
    tracing::info!("User signed out");

    StatusCode::NO_CONTENT
}

/// Current authentication state.
#[instrument(skip(session, user))]
pub async fn auth_state(
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<AuthState>> {
    let profile = match user {
        Some(_) => session.get::<UserState>(session_keys::USER_STATE).await?,
        None => None,
    };

    Ok(Json(AuthState {
        signed_in: user.is_some(),
        user,
        profile,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::RepositoryError;

    #[test]
    fn test_sign_in_request_debug_hides_token() {
        let request: SignInRequest =
            serde_json::from_str(r#"{ "idToken": "eyJhbGciOi.secret.sig" }"#).unwrap();
        assert_eq!(request.id_token, "eyJhbGciOi.secret.sig");
        assert!(!format!("{request:?}").contains("secret"));
    }

    #[test]
    fn test_merge_summary_lists_ids() {
        let report = MergeReport {
            succeeded: vec![ItemId::new("A")],
            failed: vec![(
                ItemId::new("B"),
                RepositoryError::NotFound("B".to_string()),
            )],
        };

        let summary = MergeSummary::from(report);
        assert_eq!(summary.merged, vec![ItemId::new("A")]);
        assert_eq!(summary.failed, vec![ItemId::new("B")]);
    }
}

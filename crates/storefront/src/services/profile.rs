//! User profile loading.

use tracing::instrument;

use shopfront_core::Address;

use crate::db::{DocumentStore, JsonMap, RepositoryError, paths};
use crate::models::{UserContext, UserState};

/// Loads (or lazily creates) a user's profile and addresses.
pub struct ProfileLoader<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProfileLoader<'a> {
    /// Create a loader over `store`.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Fetch the user's profile document and full address list.
    ///
    /// A first-time user gets an empty profile document created and an
    /// empty state back. Every call re-reads the whole address collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a read or the profile creation fails.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn update_user_data(&self, ctx: &UserContext) -> Result<UserState, RepositoryError> {
        let profile_path = paths::user_doc(ctx.uid())?;

        let Some(profile) = self.store.get(&profile_path).await? else {
            tracing::info!("Profile not found, creating");
            self.store.set(&profile_path, JsonMap::new()).await?;
            return Ok(UserState::default());
        };

        let addresses = self.addresses(ctx).await?;
        Ok(UserState {
            user_data: Some(profile.data),
            addresses,
        })
    }

    /// Read every address of the user, in stored order.
    ///
    /// Addresses that do not decode are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the listing fails.
    pub async fn addresses(&self, ctx: &UserContext) -> Result<Vec<Address>, RepositoryError> {
        let docs = self.store.list(&paths::addresses(ctx.uid())?).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode_with_id::<Address>() {
                Ok(address) => Some(address),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable address");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use shopfront_core::UserUid;

    use super::*;
    use crate::db::{MemoryDocumentStore, to_document};

    fn ctx() -> UserContext {
        UserContext::new(UserUid::new("u1"))
    }

    #[tokio::test]
    async fn test_first_sign_in_creates_empty_profile() {
        let store = MemoryDocumentStore::new();

        let state = ProfileLoader::new(&store)
            .update_user_data(&ctx())
            .await
            .unwrap();

        assert_eq!(state, UserState::default());
        let profile = store
            .get(&paths::user_doc(&UserUid::new("u1")).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(profile.data.is_empty());
    }

    #[tokio::test]
    async fn test_existing_profile_loads_addresses() {
        let store = MemoryDocumentStore::new();
        let uid = UserUid::new("u1");
        store
            .set(
                &paths::user_doc(&uid).unwrap(),
                to_document(&json!({ "theme": "dark" })).unwrap(),
            )
            .await
            .unwrap();
        store
            .add(
                &paths::addresses(&uid).unwrap(),
                to_document(&json!({ "firstName": "Jo", "zip": "10001", "default": true }))
                    .unwrap(),
            )
            .await
            .unwrap();

        let state = ProfileLoader::new(&store)
            .update_user_data(&ctx())
            .await
            .unwrap();

        assert_eq!(state.user_data.unwrap()["theme"], json!("dark"));
        assert_eq!(state.addresses.len(), 1);
        assert_eq!(state.addresses[0].first_name, "Jo");
        assert!(state.addresses[0].is_default);
    }

    #[tokio::test]
    async fn test_second_call_sees_created_profile() {
        let store = MemoryDocumentStore::new();
        let loader = ProfileLoader::new(&store);

        loader.update_user_data(&ctx()).await.unwrap();
        let state = loader.update_user_data(&ctx()).await.unwrap();

        assert_eq!(state.user_data, Some(JsonMap::new()));
        assert!(state.addresses.is_empty());
    }
}

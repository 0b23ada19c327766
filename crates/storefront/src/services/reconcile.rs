//! Cart reconciliation on sign-in.
//!
//! Every line of the device-local cart is merged additively into the
//! user's remote cart, then the local cart is cleared.

use futures::future::join_all;
use tracing::instrument;

use shopfront_core::ItemId;

use super::BatchReport;
use super::local_cart::LocalCart;
use super::local_storage::KeyValueStore;
use super::remote_cart::RemoteCart;
use crate::db::DocumentStore;
use crate::models::UserContext;

/// Outcome of merging the local cart into the remote cart.
pub type MergeReport = BatchReport<ItemId>;

/// Merges device-local carts into remote carts.
pub struct CartReconciler<'a> {
    remote: RemoteCart<'a>,
}

impl<'a> CartReconciler<'a> {
    /// Create a reconciler writing to `store`.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            remote: RemoteCart::new(store),
        }
    }

    /// Merge the local cart held in `storage` into the user's remote cart.
    ///
    /// All remote writes run concurrently and are awaited before the local
    /// cart is cleared. The local cart is cleared whatever the outcome;
    /// lines whose write failed are listed in the report and logged.
    #[instrument(skip(self, storage), fields(uid = %ctx.uid()))]
    pub async fn combine_carts<S>(&self, ctx: &UserContext, storage: &mut S) -> MergeReport
    where
        S: KeyValueStore + ?Sized,
    {
        let lines = LocalCart::new(storage).lines();
        tracing::info!(lines = lines.len(), "Combining carts");

        let merges = lines.into_iter().map(|line| async move {
            let result = self
                .remote
                .add_or_increment(ctx, &line.item_id, line.quantity)
                .await;
            (line.item_id, result)
        });
        let report = BatchReport::collect(join_all(merges).await);

        LocalCart::new(storage).clear();

        for (item_id, error) in &report.failed {
            tracing::warn!(%item_id, error = %error, "Failed to merge local cart line");
        }
        report
    }
}

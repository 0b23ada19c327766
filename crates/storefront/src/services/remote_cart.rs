//! Per-user remote cart.
//!
//! One document per item at `user-data/{uid}/cart/{itemId}`, with the body
//! `{"itemId": ..., "quantity": n}`.

use futures::future::join_all;
use serde_json::Value;
use tracing::instrument;

use shopfront_core::{CartLine, ItemId, Quantity};

use super::BatchReport;
use crate::db::{DocumentStore, JsonMap, RepositoryError, paths, to_document};
use crate::models::UserContext;

const QUANTITY_FIELD: &str = "quantity";

/// Remote cart operations for one document store.
pub struct RemoteCart<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> RemoteCart<'a> {
    /// Create a remote cart over `store`.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// List the user's cart lines, ordered by item id.
    ///
    /// Documents that do not decode as a cart line are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the listing fails.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn lines(&self, ctx: &UserContext) -> Result<Vec<CartLine>, RepositoryError> {
        let docs = self.store.list(&paths::cart(ctx.uid())?).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode::<CartLine>() {
                Ok(line) => Some(line),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable cart line");
                    None
                }
            })
            .collect())
    }

    /// Add `quantity` units of `item_id`, creating the line if needed.
    ///
    /// A single atomic increment, so concurrent adds from several devices
    /// never lose units. The total is capped at [`Quantity::MAX`], as in the
    /// local cart. Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn add_or_increment(
        &self,
        ctx: &UserContext,
        item_id: &ItemId,
        quantity: Quantity,
    ) -> Result<i64, RepositoryError> {
        let path = paths::cart_line(ctx.uid(), item_id)?;
        let mut seed = JsonMap::new();
        seed.insert("itemId".to_owned(), Value::String(item_id.to_string()));

        let total = self
            .store
            .increment(
                &path,
                QUANTITY_FIELD,
                i64::from(quantity),
                i64::from(Quantity::MAX),
                seed,
            )
            .await?;
        tracing::debug!(total, "Remote cart line incremented");
        Ok(total)
    }

    /// Overwrite the quantity of `item_id`.
    ///
    /// Returns `false` (and writes nothing) if the line does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn change_quantity(
        &self,
        ctx: &UserContext,
        item_id: &ItemId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let path = paths::cart_line(ctx.uid(), item_id)?;
        let mut fields = JsonMap::new();
        fields.insert(QUANTITY_FIELD.to_owned(), Value::from(quantity.get()));
        self.store.update(&path, fields).await
    }

    /// Delete the line for `item_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn remove(&self, ctx: &UserContext, item_id: &ItemId) -> Result<(), RepositoryError> {
        self.store
            .delete(&paths::cart_line(ctx.uid(), item_id)?)
            .await
    }

    /// Delete every line of the user's cart.
    ///
    /// Deletes run concurrently and are all awaited. Not atomic: failed
    /// deletes are reported and leave those lines in place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` only if the cart cannot be listed.
    #[instrument(skip(self), fields(uid = %ctx.uid()))]
    pub async fn clear(&self, ctx: &UserContext) -> Result<BatchReport<ItemId>, RepositoryError> {
        let cart = paths::cart(ctx.uid())?;
        let docs = self.store.list(&cart).await?;

        let deletes = docs.into_iter().map(|doc| {
            let cart = &cart;
            async move {
                let item_id = ItemId::new(doc.id.into_inner());
                let result = match cart.doc(item_id.as_str()) {
                    Ok(path) => self.store.delete(&path).await,
                    Err(e) => Err(e),
                };
                (item_id, result)
            }
        });

        let report = BatchReport::collect(join_all(deletes).await);
        if !report.is_complete() {
            tracing::warn!(
                failed = report.failed.len(),
                "Remote cart only partially cleared"
            );
        }
        Ok(report)
    }

    /// Upsert `lines` into the user's cart.
    ///
    /// Used by tooling; each listed line is written with a full-document
    /// set. Lines not listed are left in place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on the first failed write.
    pub async fn put_lines(
        &self,
        ctx: &UserContext,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        for line in lines {
            let path = paths::cart_line(ctx.uid(), &line.item_id)?;
            self.store.set(&path, to_document(line)?).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::UserUid;

    use super::*;
    use crate::db::MemoryDocumentStore;

    fn ctx() -> UserContext {
        UserContext::new(UserUid::new("u1"))
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_add_or_increment_creates_missing_line() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);

        let total = cart
            .add_or_increment(&ctx(), &ItemId::new("A"), qty(2))
            .await
            .unwrap();

        assert_eq!(total, 2);
        assert_eq!(
            cart.lines(&ctx()).await.unwrap(),
            vec![CartLine::new(ItemId::new("A"), qty(2))]
        );
    }

    #[tokio::test]
    async fn test_add_or_increment_adds_to_existing_line() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        let a = ItemId::new("A");

        cart.add_or_increment(&ctx(), &a, qty(2)).await.unwrap();
        let total = cart.add_or_increment(&ctx(), &a, qty(3)).await.unwrap();

        assert_eq!(total, 5);
        assert_eq!(
            cart.lines(&ctx()).await.unwrap(),
            vec![CartLine::new(a, qty(5))]
        );
    }

    #[tokio::test]
    async fn test_add_or_increment_caps_at_max_quantity() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        let a = ItemId::new("A");
        let max = qty(Quantity::MAX);

        cart.add_or_increment(&ctx(), &a, max).await.unwrap();
        let total = cart.add_or_increment(&ctx(), &a, Quantity::ONE).await.unwrap();

        assert_eq!(total, i64::from(max));
        assert_eq!(cart.lines(&ctx()).await.unwrap(), vec![CartLine::new(a, max)]);
    }

    #[tokio::test]
    async fn test_concurrent_increments_do_not_lose_updates() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        let a = ItemId::new("A");
        let context = ctx();

        let adds = (0..10).map(|_| cart.add_or_increment(&context, &a, qty(1)));
        for result in join_all(adds).await {
            result.unwrap();
        }

        assert_eq!(
            cart.lines(&context).await.unwrap(),
            vec![CartLine::new(a, qty(10))]
        );
    }

    #[tokio::test]
    async fn test_change_quantity_missing_line_is_noop() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);

        let applied = cart
            .change_quantity(&ctx(), &ItemId::new("A"), qty(4))
            .await
            .unwrap();

        assert!(!applied);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_change_quantity_overwrites() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        let a = ItemId::new("A");
        cart.add_or_increment(&ctx(), &a, qty(2)).await.unwrap();

        assert!(cart.change_quantity(&ctx(), &a, qty(9)).await.unwrap());
        assert_eq!(
            cart.lines(&ctx()).await.unwrap(),
            vec![CartLine::new(a, qty(9))]
        );
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        for id in ["A", "B", "C"] {
            cart.add_or_increment(&ctx(), &ItemId::new(id), qty(1))
                .await
                .unwrap();
        }

        cart.remove(&ctx(), &ItemId::new("B")).await.unwrap();
        assert_eq!(cart.lines(&ctx()).await.unwrap().len(), 2);

        let report = cart.clear(&ctx()).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.succeeded.len(), 2);
        assert!(cart.lines(&ctx()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_reports_partial_failure() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        for id in ["A", "B"] {
            cart.add_or_increment(&ctx(), &ItemId::new(id), qty(1))
                .await
                .unwrap();
        }
        store.fail_writes_to(&paths::cart_line(&UserUid::new("u1"), &ItemId::new("B")).unwrap());

        let report = cart.clear(&ctx()).await.unwrap();

        assert_eq!(report.succeeded, vec![ItemId::new("A")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            cart.lines(&ctx()).await.unwrap(),
            vec![CartLine::new(ItemId::new("B"), qty(1))]
        );
    }

    #[tokio::test]
    async fn test_put_lines_upserts_listed_lines_only() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        cart.add_or_increment(&ctx(), &ItemId::new("A"), qty(5))
            .await
            .unwrap();
        cart.add_or_increment(&ctx(), &ItemId::new("Z"), qty(1))
            .await
            .unwrap();

        cart.put_lines(
            &ctx(),
            &[
                CartLine::new(ItemId::new("A"), qty(2)),
                CartLine::new(ItemId::new("B"), qty(3)),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            cart.lines(&ctx()).await.unwrap(),
            vec![
                CartLine::new(ItemId::new("A"), qty(2)),
                CartLine::new(ItemId::new("B"), qty(3)),
                CartLine::new(ItemId::new("Z"), qty(1)),
            ]
        );
    }

    #[tokio::test]
    async fn test_carts_are_scoped_per_user() {
        let store = MemoryDocumentStore::new();
        let cart = RemoteCart::new(&store);
        let other = UserContext::new(UserUid::new("u2"));

        cart.add_or_increment(&ctx(), &ItemId::new("A"), qty(1))
            .await
            .unwrap();

        assert!(cart.lines(&other).await.unwrap().is_empty());
    }
}

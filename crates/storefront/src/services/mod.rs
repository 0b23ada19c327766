//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `local_cart` - Device-local cart for signed-out visitors
//! - `remote_cart` - Per-user cart in the document store
//! - `reconcile` - Merging the local cart into the remote cart on sign-in
//! - `profile` - Loading and lazily creating the user profile
//! - `addresses` - Address book and the address manager state machine
//! - `auth` - Identity token verification

pub mod addresses;
pub mod auth;
pub mod local_cart;
pub mod local_storage;
pub mod profile;
pub mod reconcile;
pub mod remote_cart;

use crate::db::RepositoryError;

/// Outcome of a set of concurrent writes, keyed by what was written.
///
/// Every write is awaited before a report is built, so a report is final.
#[derive(Debug, Default)]
pub struct BatchReport<K> {
    /// Keys whose write succeeded, in submission order.
    pub succeeded: Vec<K>,
    /// Keys whose write failed, with the error.
    pub failed: Vec<(K, RepositoryError)>,
}

impl<K> BatchReport<K> {
    /// Build a report from `(key, result)` pairs.
    pub fn collect<T>(results: impl IntoIterator<Item = (K, Result<T, RepositoryError>)>) -> Self {
        let mut report = Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for (key, result) in results {
            match result {
                Ok(_) => report.succeeded.push(key),
                Err(e) => report.failed.push((key, e)),
            }
        }
        report
    }

    /// Whether every write succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

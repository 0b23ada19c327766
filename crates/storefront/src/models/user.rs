//! Per-user state exposed to the UI.

use serde::{Deserialize, Serialize};

use shopfront_core::Address;

use crate::db::JsonMap;

/// In-memory snapshot of a user's profile and addresses.
///
/// A first-time user has no profile body yet (`user_data` is `None`) and
/// no addresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    pub user_data: Option<JsonMap>,
    pub addresses: Vec<Address>,
}

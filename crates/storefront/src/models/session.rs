//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use shopfront_core::UserUid;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user,
/// as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Provider-issued user id; scopes every remote document path.
    pub uid: UserUid,
    /// Email address, if the provider shared one.
    pub email: Option<String>,
    /// Display name, if the provider shared one.
    pub display_name: Option<String>,
}

impl CurrentUser {
    /// Explicit context for remote operations on behalf of this user.
    #[must_use]
    pub fn context(&self) -> UserContext {
        UserContext::new(self.uid.clone())
    }
}

/// Identity passed explicitly into every remote cart, profile and address
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserContext {
    uid: UserUid,
}

impl UserContext {
    /// Create a context for `uid`.
    #[must_use]
    pub const fn new(uid: UserUid) -> Self {
        Self { uid }
    }

    /// The user whose documents are addressed.
    #[must_use]
    pub const fn uid(&self) -> &UserUid {
        &self.uid
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the device-local cart slot.
    pub const LOCAL_CART: &str = crate::services::local_cart::LOCAL_CART_KEY;

    /// Key for the cached profile snapshot.
    pub const USER_STATE: &str = "user_state";

    /// Key for the address modal's view state.
    pub const ADDRESS_MANAGER: &str = "address_manager";
}

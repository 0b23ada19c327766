//! Fixed document layout for per-user data.

use shopfront_core::{AddressId, ItemId, UserUid};

use super::{CollectionPath, DocumentPath, RepositoryError};

/// Top-level collection holding one profile document per user.
pub const USER_DATA: &str = "user-data";

/// Per-user sub-collection of cart lines, keyed by item id.
pub const CART: &str = "cart";

/// Per-user sub-collection of addresses, keyed by generated id.
pub const ADDRESSES: &str = "addresses";

/// `user-data/{uid}`
///
/// # Errors
///
/// Returns `RepositoryError::InvalidPath` if `uid` is not a valid segment.
pub fn user_doc(uid: &UserUid) -> Result<DocumentPath, RepositoryError> {
    CollectionPath::root(USER_DATA)?.doc(uid.as_str())
}

/// `user-data/{uid}/cart`
///
/// # Errors
///
/// Returns `RepositoryError::InvalidPath` if `uid` is not a valid segment.
pub fn cart(uid: &UserUid) -> Result<CollectionPath, RepositoryError> {
    user_doc(uid)?.collection(CART)
}

/// `user-data/{uid}/cart/{itemId}`
///
/// # Errors
///
/// Returns `RepositoryError::InvalidPath` if either id is not a valid segment.
pub fn cart_line(uid: &UserUid, item_id: &ItemId) -> Result<DocumentPath, RepositoryError> {
    cart(uid)?.doc(item_id.as_str())
}

/// `user-data/{uid}/addresses`
///
/// # Errors
///
/// Returns `RepositoryError::InvalidPath` if `uid` is not a valid segment.
pub fn addresses(uid: &UserUid) -> Result<CollectionPath, RepositoryError> {
    user_doc(uid)?.collection(ADDRESSES)
}

/// `user-data/{uid}/addresses/{addressId}`
///
/// # Errors
///
/// Returns `RepositoryError::InvalidPath` if either id is not a valid segment.
pub fn address(uid: &UserUid, id: &AddressId) -> Result<DocumentPath, RepositoryError> {
    addresses(uid)?.doc(id.as_str())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let uid = UserUid::new("u1");
        assert_eq!(user_doc(&uid).unwrap().as_str(), "user-data/u1");
        assert_eq!(
            cart_line(&uid, &ItemId::new("A")).unwrap().as_str(),
            "user-data/u1/cart/A"
        );
        assert_eq!(
            address(&uid, &AddressId::new("x9")).unwrap().as_str(),
            "user-data/u1/addresses/x9"
        );
    }

    #[test]
    fn test_item_ids_with_slashes_rejected() {
        let uid = UserUid::new("u1");
        assert!(cart_line(&uid, &ItemId::new("a/b")).is_err());
    }
}

//! Domain models for storefront.
//!
//! - [`session`] - Identity and slots stored in the browser session
//! - [`user`] - Per-user state assembled from the document store

pub mod session;
pub mod user;

pub use session::{CurrentUser, UserContext, keys as session_keys};
pub use user::UserState;

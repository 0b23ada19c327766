//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod cart;
pub mod id;
pub mod quantity;

pub use address::{Address, AddressField, AddressForm, AddressModal};
pub use cart::CartLine;
pub use id::*;
pub use quantity::{Quantity, QuantityError};

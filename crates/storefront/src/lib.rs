//! Shopfront storefront library.
//!
//! Cart, profile and address handling for the storefront: a device-local
//! cart for signed-out visitors, a remote cart per signed-in user, the
//! sign-in cart merge, and the address selection modal.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

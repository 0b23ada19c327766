//! Device-local cart for visitors who are not signed in.
//!
//! The whole cart is one JSON array of [`CartLine`] stored under
//! [`LOCAL_CART_KEY`]. Clearing stores the JSON literal `null`
//! ([`NULL_MARKER`]). An absent, `null`, or unparsable slot reads as an
//! absent cart.

use shopfront_core::{CartLine, ItemId, Quantity};

use super::local_storage::KeyValueStore;

/// Storage key of the device-local cart.
pub const LOCAL_CART_KEY: &str = "cart";

/// Value stored when the local cart is cleared.
pub const NULL_MARKER: &str = "null";

/// Cart operations over a device storage slot.
pub struct LocalCart<'a, S: KeyValueStore + ?Sized> {
    storage: &'a mut S,
}

impl<'a, S: KeyValueStore + ?Sized> LocalCart<'a, S> {
    /// Wrap device storage.
    pub const fn new(storage: &'a mut S) -> Self {
        Self { storage }
    }

    /// Current lines; empty when the cart is absent.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.load().unwrap_or_default()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines()
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Add `quantity` units of `item_id`.
    ///
    /// Increments the existing line for the item, or appends a new one.
    pub fn add(&mut self, item_id: &ItemId, quantity: Quantity) {
        tracing::debug!(%item_id, %quantity, "Adding to local cart");

        let mut lines = self.lines();
        match lines.iter_mut().find(|line| &line.item_id == item_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => lines.push(CartLine::new(item_id.clone(), quantity)),
        }
        self.store(&lines);
    }

    /// Overwrite the quantity of `item_id`.
    ///
    /// Does nothing if the cart or the item is absent.
    pub fn change_quantity(&mut self, item_id: &ItemId, quantity: Quantity) {
        let Some(mut lines) = self.load() else {
            return;
        };
        let Some(line) = lines.iter_mut().find(|line| &line.item_id == item_id) else {
            return;
        };
        tracing::debug!(%item_id, %quantity, "Changing local cart quantity");
        line.quantity = quantity;
        self.store(&lines);
    }

    /// Remove the line for `item_id`.
    ///
    /// Does nothing if the cart or the item is absent.
    pub fn remove(&mut self, item_id: &ItemId) {
        let Some(mut lines) = self.load() else {
            return;
        };
        let Some(index) = lines.iter().position(|line| &line.item_id == item_id) else {
            return;
        };
        tracing::debug!(%item_id, "Removing from local cart");
        lines.remove(index);
        self.store(&lines);
    }

    /// Replace the cart with the null marker.
    pub fn clear(&mut self) {
        tracing::debug!("Clearing local cart");
        self.storage
            .set_item(LOCAL_CART_KEY, NULL_MARKER.to_owned());
    }

    fn load(&self) -> Option<Vec<CartLine>> {
        let raw = self.storage.get_item(LOCAL_CART_KEY)?;
        match serde_json::from_str::<Option<Vec<CartLine>>>(&raw) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed local cart");
                None
            }
        }
    }

    fn store(&mut self, lines: &[CartLine]) {
        match serde_json::to_string(lines) {
            Ok(raw) => self.storage.set_item(LOCAL_CART_KEY, raw),
            // CartLine contains only strings and integers
            Err(e) => tracing::error!(error = %e, "Failed to serialize local cart"),
        }
    }
}

//! Cart line type shared by the device-local and remote carts.

use serde::{Deserialize, Serialize};

use crate::{ItemId, Quantity};

/// An (item, quantity) pair.
///
/// Serialized as `{"itemId": "...", "quantity": n}`, which is both the
/// element format of the device-local cart blob and the body of a remote
/// cart document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: Quantity,
}

impl CartLine {
    /// Create a new cart line.
    #[must_use]
    pub const fn new(item_id: ItemId, quantity: Quantity) -> Self {
        Self { item_id, quantity }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_camel_case() {
        let line = CartLine::new(ItemId::new("A"), Quantity::new(2).unwrap());
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json, serde_json::json!({ "itemId": "A", "quantity": 2 }));
    }

    #[test]
    fn test_rejects_zero_quantity() {
        let result = serde_json::from_str::<CartLine>(r#"{"itemId":"A","quantity":0}"#);
        assert!(result.is_err());
    }
}

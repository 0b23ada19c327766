//! Address types and the address modal's view states.

use serde::{Deserialize, Serialize};

use crate::AddressId;

/// A user's delivery address.
///
/// At most one address per user has `is_default` set. Stored documents may
/// lack fields (they are written from free-form UI input), so every string
/// field defaults to empty when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

/// Pending input of the "add an address" form.
///
/// This is also the exact body written for a new address document, so
/// `is_default` is always `false` for newly added addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressForm {
    pub first_name: String,
    pub last_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(rename = "default")]
    pub is_default: bool,
}

impl AddressForm {
    /// Overwrite a single form field.
    pub fn set(&mut self, field: AddressField, value: String) {
        let slot = match field {
            AddressField::FirstName => &mut self.first_name,
            AddressField::LastName => &mut self.last_name,
            AddressField::StreetAddress => &mut self.street_address,
            AddressField::City => &mut self.city,
            AddressField::State => &mut self.state,
            AddressField::Zip => &mut self.zip,
        };
        *slot = value;
    }

    /// Build the stored address for a document id.
    #[must_use]
    pub fn into_address(self, id: AddressId) -> Address {
        Address {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            street_address: self.street_address,
            city: self.city,
            state: self.state,
            zip: self.zip,
            is_default: self.is_default,
        }
    }
}

/// Editable text fields of the address form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressField {
    FirstName,
    LastName,
    StreetAddress,
    City,
    State,
    Zip,
}

/// Which view of the address modal is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AddressModal {
    /// Address list; clicking an address makes it the default.
    #[default]
    #[serde(rename = "chooseAddressModal")]
    ChooseAddress,
    /// Form entry for a new address.
    #[serde(rename = "addAddressModal")]
    AddAddress,
}

impl std::fmt::Display for AddressModal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChooseAddress => write!(f, "chooseAddressModal"),
            Self::AddAddress => write!(f, "addAddressModal"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_decodes_with_missing_fields() {
        let address: Address =
            serde_json::from_value(serde_json::json!({ "id": "a1", "city": "Austin" })).unwrap();
        assert_eq!(address.id.as_str(), "a1");
        assert_eq!(address.city, "Austin");
        assert!(address.first_name.is_empty());
        assert!(!address.is_default);
    }

    #[test]
    fn test_default_flag_uses_wire_name() {
        let form = AddressForm::default();
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["default"], serde_json::json!(false));
        assert!(json.get("isDefault").is_none());
    }

    #[test]
    fn test_form_set_field() {
        let mut form = AddressForm::default();
        form.set(AddressField::FirstName, "Jo".to_string());
        form.set(AddressField::Zip, "10001".to_string());
        assert_eq!(form.first_name, "Jo");
        assert_eq!(form.zip, "10001");
    }

    #[test]
    fn test_modal_names() {
        assert_eq!(AddressModal::default(), AddressModal::ChooseAddress);
        assert_eq!(
            serde_json::to_string(&AddressModal::AddAddress).unwrap(),
            "\"addAddressModal\""
        );
        assert_eq!(AddressModal::ChooseAddress.to_string(), "chooseAddressModal");
    }
}

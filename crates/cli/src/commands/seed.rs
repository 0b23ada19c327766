//! Seed user profiles, remote carts and addresses from YAML.
//!
//! ```yaml
//! users:
//!   - uid: user-123
//!     profile:
//!       displayName: Jo
//!     cart:
//!       - itemId: sku-1
//!         quantity: 2
//!     addresses:
//!       - firstName: Jo
//!         zip: "10001"
//!         default: true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use shopfront_core::{AddressForm, CartLine, UserUid};
use shopfront_storefront::db::{DocumentStore, JsonMap, PgDocumentStore, paths};
use shopfront_storefront::models::UserContext;
use shopfront_storefront::services::addresses::AddressBook;
use shopfront_storefront::services::remote_cart::RemoteCart;

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
}

/// One user to seed.
#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub uid: UserUid,
    #[serde(default)]
    pub profile: JsonMap,
    #[serde(default)]
    pub cart: Vec<CartLine>,
    #[serde(default)]
    pub addresses: Vec<AddressForm>,
}

/// Check a seed file for problems that would leave bad data behind.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for user in &seed.users {
        if !seen.insert(user.uid.as_str()) {
            errors.push(format!("duplicate uid {}", user.uid));
        }
        let defaults = user.addresses.iter().filter(|a| a.is_default).count();
        if defaults > 1 {
            errors.push(format!(
                "user {} has {defaults} default addresses",
                user.uid
            ));
        }
    }
    errors
}

/// Seed users from a YAML file.
///
/// Profiles are overwritten and listed cart lines are upserted (lines not
/// in the file are kept). Addresses are appended; the
/// one marked default becomes the single default.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or if any
/// database write fails.
pub async fn users(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading users from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let store = PgDocumentStore::new(super::connect().await?);
    let book = AddressBook::new(&store);
    let cart = RemoteCart::new(&store);

    for user in seed.users {
        let ctx = UserContext::new(user.uid.clone());

        store.set(&paths::user_doc(&user.uid)?, user.profile).await?;
        cart.put_lines(&ctx, &user.cart).await?;

        for form in user.addresses {
            let make_default = form.is_default;
            let id = book.add(&ctx, form).await?;
            if make_default {
                book.set_default(&ctx, &id).await?;
            }
        }

        info!(uid = %user.uid, lines = user.cart.len(), "Seeded user");
    }

    info!("Seeding complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_file() {
        let yaml = r#"
users:
  - uid: user-1
    profile:
      displayName: Jo
    cart:
      - itemId: A
        quantity: 2
    addresses:
      - firstName: Jo
        zip: "10001"
        default: true
  - uid: user-2
"#;
        let seed: SeedFile = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(seed.users.len(), 2);
        assert_eq!(seed.users[0].cart[0].quantity.get(), 2);
        assert!(seed.users[0].addresses[0].is_default);
        assert!(seed.users[1].cart.is_empty());
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_validate_rejects_two_defaults_and_duplicates() {
        let yaml = r"
users:
  - uid: user-1
    addresses:
      - default: true
      - default: true
  - uid: user-1
";
        let seed: SeedFile = serde_yaml::from_str(yaml).unwrap();

        let errors = validate(&seed);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("duplicate uid")));
        assert!(errors.iter().any(|e| e.contains("2 default addresses")));
    }
}

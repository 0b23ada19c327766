//! Remote cart inspection.

use shopfront_core::UserUid;
use shopfront_storefront::db::PgDocumentStore;
use shopfront_storefront::models::UserContext;
use shopfront_storefront::services::remote_cart::RemoteCart;

/// Print the lines of a user's remote cart as JSON.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the uid is invalid.
pub async fn show(uid: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = PgDocumentStore::new(super::connect().await?);
    let ctx = UserContext::new(UserUid::new(uid));

    let lines = RemoteCart::new(&store).lines(&ctx).await?;
    tracing::info!(uid, lines = lines.len(), "Loaded remote cart");

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    }
    Ok(())
}

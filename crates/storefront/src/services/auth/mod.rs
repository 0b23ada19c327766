//! Identity verification.
//!
//! The browser signs in with the identity provider directly and hands the
//! storefront an ID token. The storefront resolves that token to a user by
//! calling the provider's `accounts:lookup` endpoint.

mod error;

pub use error::AuthError;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

use shopfront_core::UserUid;

use crate::config::AuthConfig;
use crate::models::CurrentUser;

/// Provider error messages that mean the token itself is unusable.
const REJECTED_TOKEN_MESSAGES: &[&str] = &["INVALID_ID_TOKEN", "TOKEN_EXPIRED", "USER_NOT_FOUND"];

/// Resolves an ID token to the signed-in user.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `id_token` and return the user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the provider rejects the token.
    async fn verify(&self, id_token: &str) -> Result<CurrentUser, AuthError>;
}

/// Identity Toolkit (`accounts:lookup`) client.
#[derive(Clone)]
pub struct IdentityToolkitVerifier {
    client: reqwest::Client,
    lookup_url: Url,
}

impl IdentityToolkitVerifier {
    /// Create a verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the base URL
    /// cannot be extended with the lookup path.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let base = config.base_url.as_str().trim_end_matches('/');
        let mut lookup_url = Url::parse(&format!("{base}/accounts:lookup"))
            .map_err(|e| AuthError::UnexpectedResponse(format!("invalid lookup URL: {e}")))?;
        lookup_url
            .query_pairs_mut()
            .append_pair("key", config.api_key.expose_secret());

        Ok(Self { client, lookup_url })
    }
}

#[async_trait]
impl IdentityVerifier for IdentityToolkitVerifier {
    async fn verify(&self, id_token: &str) -> Result<CurrentUser, AuthError> {
        let response = self
            .client
            .post(self.lookup_url.clone())
            .json(&LookupRequest { id_token })
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::UnexpectedResponse(e.to_string()))?;
        let user = lookup.into_user()?;
        tracing::debug!(uid = %user.uid, "Identity token verified");
        Ok(user)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl LookupResponse {
    fn into_user(self) -> Result<CurrentUser, AuthError> {
        let user = self
            .users
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidToken)?;
        if user.local_id.is_empty() {
            return Err(AuthError::UnexpectedResponse("empty localId".to_string()));
        }
        Ok(CurrentUser {
            uid: UserUid::new(user.local_id),
            email: user.email,
            display_name: user.display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a non-success lookup response to an error.
fn classify_failure(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_default();

    // Messages may carry a suffix, e.g. "TOKEN_EXPIRED : ..."
    if status == 400
        && REJECTED_TOKEN_MESSAGES
            .iter()
            .any(|rejected| message.starts_with(rejected))
    {
        return AuthError::InvalidToken;
    }

    tracing::warn!(status, %message, "Identity lookup failed");
    AuthError::UnexpectedResponse(format!("{status}: {message}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;

    fn config(base_url: &str) -> AuthConfig {
        AuthConfig {
            api_key: SecretString::from("test-api-key"),
            base_url: Url::parse(base_url).unwrap(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_lookup_url_keeps_version_segment() {
        let verifier =
            IdentityToolkitVerifier::new(&config("https://identitytoolkit.googleapis.com/v1"))
                .unwrap();
        assert_eq!(
            verifier.lookup_url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:lookup?key=test-api-key"
        );

        let verifier = IdentityToolkitVerifier::new(&config("http://localhost:9099/v1/")).unwrap();
        assert_eq!(
            verifier.lookup_url.as_str(),
            "http://localhost:9099/v1/accounts:lookup?key=test-api-key"
        );
    }

    #[test]
    fn test_lookup_response_maps_first_user() {
        let lookup: LookupResponse = serde_json::from_str(
            r#"{
                "kind": "identitytoolkit#GetAccountInfoResponse",
                "users": [{
                    "localId": "abc123",
                    "email": "jo@example.com",
                    "displayName": "Jo",
                    "emailVerified": true
                }]
            }"#,
        )
        .unwrap();

        let user = lookup.into_user().unwrap();
        assert_eq!(user.uid.as_str(), "abc123");
        assert_eq!(user.email.as_deref(), Some("jo@example.com"));
        assert_eq!(user.display_name.as_deref(), Some("Jo"));
    }

    #[test]
    fn test_lookup_without_users_is_invalid_token() {
        let lookup: LookupResponse = serde_json::from_str(r#"{ "kind": "x" }"#).unwrap();
        assert!(matches!(lookup.into_user(), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_classify_failure() {
        let body = r#"{ "error": { "code": 400, "message": "INVALID_ID_TOKEN" } }"#;
        assert!(matches!(classify_failure(400, body), AuthError::InvalidToken));

        let body = r#"{ "error": { "code": 400, "message": "TOKEN_EXPIRED : expired" } }"#;
        assert!(matches!(classify_failure(400, body), AuthError::InvalidToken));

        let body = r#"{ "error": { "code": 400, "message": "API key not valid." } }"#;
        assert!(matches!(
            classify_failure(400, body),
            AuthError::UnexpectedResponse(_)
        ));

        assert!(matches!(
            classify_failure(503, "upstream down"),
            AuthError::UnexpectedResponse(_)
        ));
    }
}

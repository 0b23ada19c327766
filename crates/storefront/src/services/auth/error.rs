//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while verifying a sign-in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token rejected by the provider, expired, or for an unknown user.
    #[error("invalid identity token")]
    InvalidToken,

    /// HTTP request to the provider failed.
    #[error("identity provider error: {0}")]
    Provider(#[from] reqwest::Error),

    /// Provider answered with something other than a lookup result.
    #[error("unexpected identity provider response: {0}")]
    UnexpectedResponse(String),
}

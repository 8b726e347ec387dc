//! User directory lookups for WebFinger.
//!
//! This lives in a separate crate so that the HTTP client and its TLS stack
//! are not recompiled on every change to the server.
mod authentik;

pub use authentik::AuthentikClient;

/// A user as returned by the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    /// Primary email address, never empty.
    pub email: String,
    /// Display name.
    pub name: String,
    /// URL of the user's avatar.
    pub avatar: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("request to the directory failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("directory responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("could not decode directory response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response did not contain any users")]
    MissingResults,
    #[error("could not find account")]
    NotFound,
    #[error("user has no email address")]
    MissingEmail,
    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },
}

/// A source of user records.
///
/// Implementations hold no per-request state and are shared between all
/// in-flight requests.
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// Find the active user whose email equals `email`.
    ///
    /// When multiple users match, the first one is returned.
    async fn lookup(&self, email: &str) -> Result<UserRecord, LookupError>;
    /// Hostname of the identity provider behind this directory.
    fn host(&self) -> &str;
}

//! AWS credential model and providers.
//!
//! Credentials are read exactly once, when the stream is started; rotation
//! and refresh live outside this crate. Providers that need to hit the
//! network (IMDS, SSO, …) can implement [`ProvideCredentials`] downstream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, ScribeError};

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// An AWS access key pair with optional session token.
#[derive(Clone)]
pub struct Credentials {
    // ---
    pub access_key_id: String,

    pub secret_access_key: String,

    /// Present for temporary (STS) credentials; sent as
    /// `x-amz-security-token` and included in the signed header set.
    pub session_token: Option<String>,

    /// Advisory expiration instant for temporary credentials. The client
    /// does not refresh; a stream outliving its credentials is terminated
    /// by the service.
    pub expiration: Option<DateTime<Utc>>,
}

// ---

impl Credentials {
    // ---
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

// The secret key must never reach logs; Debug prints the key id only.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ProvideCredentials
// ---------------------------------------------------------------------------

/// Source of AWS credentials, resolved once at stream start.
#[async_trait]
pub trait ProvideCredentials: Send + Sync {
    // ---
    async fn provide(&self) -> Result<Credentials>;
}

// ---------------------------------------------------------------------------
// StaticCredentials
// ---------------------------------------------------------------------------

/// Fixed credentials supplied by the caller.
pub struct StaticCredentials(pub Credentials);

#[async_trait]
impl ProvideCredentials for StaticCredentials {
    // ---
    async fn provide(&self) -> Result<Credentials> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// EnvCredentials
// ---------------------------------------------------------------------------

/// Credentials from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
/// (and `AWS_SESSION_TOKEN` when set).
pub struct EnvCredentials;

#[async_trait]
impl ProvideCredentials for EnvCredentials {
    // ---
    async fn provide(&self) -> Result<Credentials> {
        // ---
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            ScribeError::Configuration("AWS_ACCESS_KEY_ID is not set".into())
        })?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            ScribeError::Configuration("AWS_SECRET_ACCESS_KEY is not set".into())
        })?;

        Ok(Credentials {
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
            expiration: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    // ---

    /// The secret must never appear in Debug output.
    #[test]
    fn debug_redacts_secret() {
        // ---
        let creds = Credentials::new("AKIDEXAMPLE", "super-secret").with_session_token("tok");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("tok"));
    }

    // ---

    #[tokio::test]
    async fn static_provider_round_trips() {
        // ---
        let provider = StaticCredentials(Credentials::new("id", "key"));
        let creds = provider.provide().await.unwrap();
        assert_eq!(creds.access_key_id, "id");
        assert!(creds.session_token.is_none());
    }
}

//! Azure session management.

use crate::session::is_expired;
use crate::Session;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Treat tokens as expired this long before the provider says so.
const EXPIRY_SKEW_SECS: i64 = 120;

/// Azure Resource Manager session.
///
/// Holds one bearer token for the management scope.
#[derive(Clone)]
pub struct AzureSession {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AzureSession {
    /// Creates a new Azure session.
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }
}

impl std::fmt::Debug for AzureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSession")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
impl Session for AzureSession {
    fn token(&self) -> &str {
        &self.token
    }

    async fn is_valid(&self) -> bool {
        !self.token.is_empty()
            && !is_expired(self.expires_at, Duration::seconds(EXPIRY_SKEW_SECS))
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

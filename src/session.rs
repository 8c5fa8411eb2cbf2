//! Authenticated sessions.
//!
//! A [`Session`] is obtained once from [`Backend::authenticate`](crate::Backend::authenticate)
//! and passed by reference to every subsequent call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Session represents an authenticated session with a backend.
///
/// All session implementations must be `Send + Sync` so a session can be
/// shared across async tasks.
#[async_trait]
pub trait Session: Send + Sync {
    /// Returns the bearer token.
    ///
    /// Backends that need no token return a placeholder.
    fn token(&self) -> &str;

    /// Checks if the session is still valid.
    async fn is_valid(&self) -> bool;

    /// Returns when the session expires, if applicable.
    fn expires_at(&self) -> Option<DateTime<Utc>>;
}

/// Returns true if `expires_at` is in the past (with `skew` of headroom).
pub(crate) fn is_expired(expires_at: Option<DateTime<Utc>>, skew: chrono::Duration) -> bool {
    match expires_at {
        Some(at) => Utc::now() + skew >= at,
        None => false,
    }
}

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Access token claims scoped to a relying application.
///
/// Every field is covered by the token signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Email the user authenticated with
    pub email: String,

    /// Application the token was issued for
    pub app_id: i32,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims for a user logging into an application.
    ///
    /// The clock is read once; `iat` and `exp` are both derived from that
    /// single reading.
    ///
    /// # Arguments
    /// * `user_id` - Unique user identifier
    /// * `email` - User email
    /// * `app_id` - Application identifier
    /// * `ttl` - Time until the token expires
    pub fn new(user_id: impl ToString, email: impl ToString, app_id: i32, ttl: Duration) -> Self {
        Self::issued_at(user_id, email, app_id, Utc::now().timestamp(), ttl)
    }

    /// Create claims with an explicit issue time (Unix timestamp).
    pub fn issued_at(
        user_id: impl ToString,
        email: impl ToString,
        app_id: i32,
        now: i64,
        ttl: Duration,
    ) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            app_id,
            iat: now,
            exp: now.saturating_add(ttl_secs),
        }
    }

    /// Subject parsed as a numeric user identifier.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    /// Check if token is expired.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp < current_timestamp
    }
}

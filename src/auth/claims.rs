//! Access token claims
//!
//! The payload of an access token: the registered JWT claims (RFC 7519) the
//! service relies on, as a fixed struct. No free-form claim map.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Issuer stamped into every access token and required on validation
pub const TOKEN_ISSUER: &str = "chirpy";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id`, issued now and expiring after `ttl`.
    ///
    /// A non-positive `ttl` yields claims that are already expired.
    ///
    /// # Errors
    /// `Internal` if `now + ttl` falls outside the representable date range
    pub fn new(user_id: Uuid, ttl: Duration) -> Result<Self, AppError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal(format!("Access token TTL out of range: {}", ttl)))?;

        Ok(Self {
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// `MalformedToken` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedToken)
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Duration::hours(1)).expect("Failed to build claims");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let claims =
            Claims::new(Uuid::new_v4(), Duration::hours(-1)).expect("Failed to build claims");
        assert!(claims.exp < claims.iat);
        assert!(claims.is_expired());
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Duration::hours(1)).expect("Failed to build claims");

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims =
            Claims::new(Uuid::new_v4(), Duration::hours(1)).expect("Failed to build claims");
        claims.sub = "invalid-uuid".to_string();

        assert_eq!(claims.user_id(), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_ttl_past_calendar_range_is_rejected() {
        let result = Claims::new(Uuid::new_v4(), Duration::days(365 * 300_000));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}

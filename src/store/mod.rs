//! Resource Store interface
//!
//! The auth core owns no durable state. Refresh token records and password
//! credentials live in the Resource Store and every lifecycle operation
//! round-trips through one of these traits. Implementations must give
//! read-committed visibility: once `revoke_refresh_token` returns, any later
//! `find_refresh_token` observes `revoked_at`.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::error::StoreError;

/// A persisted refresh token
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A user's stored password credential
#[derive(Clone, sqlx::FromRow)]
pub struct Credential {
    pub user_id: Uuid,
    pub password_hash: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new record
    ///
    /// # Errors
    /// `UniqueViolation` if the token value already exists
    async fn create_refresh_token(
        &self,
        record: RefreshTokenRecord,
    ) -> Result<RefreshTokenRecord, StoreError>;

    /// Look up a record by exact token value
    async fn find_refresh_token(&self, token: &str)
        -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Set `revoked_at` on the record unless already set
    ///
    /// # Errors
    /// `NotFound` if no record has this token value
    async fn revoke_refresh_token(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_credential_by_email(&self, email: &str)
        -> Result<Option<Credential>, StoreError>;
}

/// Bound a store call by `limit`; `None` waits indefinitely
///
/// Dropping the returned future cancels the call.
pub async fn with_deadline<T, F>(limit: Option<Duration>, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoreError::Timeout)?,
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    fn record(expires_in: Duration, revoked: bool) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            token: "a".repeat(64),
            user_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
        }
    }

    #[test]
    fn test_active_record() {
        let rec = record(Duration::days(60), false);
        assert!(!rec.is_revoked());
        assert!(!rec.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_revoked_record() {
        assert!(record(Duration::days(60), true).is_revoked());
    }

    #[tokio::test]
    async fn test_deadline_expires_stalled_call() {
        let stalled = futures::future::pending::<Result<(), StoreError>>();
        let result = with_deadline(Some(StdDuration::from_millis(20)), stalled).await;
        assert_eq!(result, Err(StoreError::Timeout));
    }

    #[tokio::test]
    async fn test_no_deadline_passes_result_through() {
        let result = with_deadline(None, async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[test]
    fn test_expiry_boundary() {
        let rec = record(Duration::days(1), false);
        assert!(rec.is_expired_at(rec.expires_at));
        assert!(!rec.is_expired_at(rec.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn test_credential_debug_redacts_hash() {
        let credential = Credential {
            user_id: Uuid::new_v4(),
            password_hash: "$2b$04$secretsecretsecret".to_string(),
        };
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("secretsecret"));
        assert!(rendered.contains("<redacted>"));
    }
}

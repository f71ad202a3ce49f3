//! Refresh Token Management
//!
//! Refresh tokens are:
//! - 256 bits from the OS entropy source, hex-encoded (64 lowercase chars)
//! - Stored and looked up by their exact value in the Resource Store
//! - Valid for a fixed lifetime (60 days by default) unless revoked
//! - Reusable: authenticating does not rotate or consume the token
//!
//! Expiry is evaluated lazily when a token is presented; nothing sweeps
//! expired records.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AuthError, StoreError};
use crate::store::{with_deadline, RefreshTokenRecord, RefreshTokenStore};

const TOKEN_BYTES: usize = 32;

/// Default refresh token lifetime
pub fn default_refresh_token_lifetime() -> Duration {
    Duration::days(60)
}

/// Generate a new refresh token value
///
/// # Errors
/// `RandomSourceFailure` if the OS entropy source fails. There is no
/// fallback to a weaker generator.
pub fn generate_refresh_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!(error = %e, "OS random source failed");
        AuthError::RandomSourceFailure
    })?;
    Ok(hex::encode(bytes))
}

/// Creates, authenticates and revokes refresh tokens against a store
#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    lifetime: Duration,
    store_timeout: Option<std::time::Duration>,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            store,
            lifetime: default_refresh_token_lifetime(),
            store_timeout: None,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Bound every store call by `timeout`
    pub fn with_store_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Create and persist a refresh token for `user_id`
    ///
    /// A uniqueness violation is retried once with a fresh token, then
    /// surfaced.
    pub async fn create(&self, user_id: Uuid) -> Result<String, AppError> {
        let mut retried = false;
        loop {
            let token = generate_refresh_token()?;
            let now = Utc::now();
            let expires_at = now.checked_add_signed(self.lifetime).ok_or_else(|| {
                AppError::Internal(format!("Refresh token lifetime out of range: {}", self.lifetime))
            })?;
            let record = RefreshTokenRecord {
                token,
                user_id,
                created_at: now,
                expires_at,
                revoked_at: None,
            };

            let created = self.store.create_refresh_token(record);
            match with_deadline(self.store_timeout, created).await
            {
                Ok(created) => {
                    tracing::info!(user_id = %user_id, expires_at = %created.expires_at, "Refresh token created");
                    return Ok(created.token);
                }
                Err(StoreError::UniqueViolation(_)) if !retried => {
                    tracing::warn!(user_id = %user_id, "Refresh token collision, regenerating once");
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Return the user a refresh token belongs to
    ///
    /// Checks, in order: the token exists, it is not revoked, it is not
    /// expired. The record is never modified.
    pub async fn authenticate(&self, token: &str) -> Result<Uuid, AppError> {
        self.authenticate_at(token, Utc::now()).await
    }

    async fn authenticate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AppError> {
        let record = with_deadline(self.store_timeout, self.store.find_refresh_token(token))
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh token not found");
                AuthError::TokenNotFound
            })?;

        if record.is_revoked() {
            tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
            return Err(AuthError::TokenRevoked.into());
        }

        if record.is_expired_at(now) {
            tracing::info!(user_id = %record.user_id, "Refresh token expired");
            return Err(AuthError::TokenExpired.into());
        }

        Ok(record.user_id)
    }

    /// Revoke a refresh token
    ///
    /// Revoking twice keeps the first revocation time. An unknown token is
    /// reported as `TokenNotFound`.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        match with_deadline(
            self.store_timeout,
            self.store.revoke_refresh_token(token, Utc::now()),
        )
        .await
        {
            Ok(()) => {
                tracing::info!("Refresh token revoked");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(AuthError::TokenNotFound.into()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager() -> (Arc<InMemoryStore>, RefreshTokenManager) {
        let store = Arc::new(InMemoryStore::new());
        let manager = RefreshTokenManager::new(store.clone());
        (store, manager)
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token().expect("Failed to generate token");

        assert_eq!(token.len(), 64);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let tokens: HashSet<String> = (0..10_000)
            .map(|_| generate_refresh_token().expect("Failed to generate token"))
            .collect();

        assert_eq!(tokens.len(), 10_000);
        assert!(tokens.iter().all(|t| t.len() == 64));
    }

    #[tokio::test]
    async fn test_create_persists_sixty_day_record() {
        let (store, manager) = manager();
        let user_id = Uuid::new_v4();

        let token = manager.create(user_id).await.expect("Failed to create token");

        let record = store
            .find_refresh_token(&token)
            .await
            .expect("Lookup failed")
            .expect("Record missing");
        assert_eq!(record.user_id, user_id);
        assert_eq!(record.expires_at - record.created_at, Duration::days(60));
        assert!(record.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_returns_user() {
        let (_, manager) = manager();
        let user_id = Uuid::new_v4();
        let token = manager.create(user_id).await.expect("Failed to create token");

        assert_eq!(manager.authenticate(&token).await.expect("Auth failed"), user_id);
    }

    #[tokio::test]
    async fn test_authenticate_is_repeatable() {
        let (store, manager) = manager();
        let user_id = Uuid::new_v4();
        let token = manager.create(user_id).await.expect("Failed to create token");
        let before = store.find_refresh_token(&token).await.expect("Lookup failed");

        for _ in 0..3 {
            assert_eq!(manager.authenticate(&token).await.expect("Auth failed"), user_id);
        }

        let after = store.find_refresh_token(&token).await.expect("Lookup failed");
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_authenticate_after_revoke() {
        let (_, manager) = manager();
        let token = manager.create(Uuid::new_v4()).await.expect("Failed to create token");

        manager.revoke(&token).await.expect("Revoke failed");

        let err = manager.authenticate(&token).await.unwrap_err();
        assert_eq!(err.as_auth(), Some(AuthError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_authenticate_expired_record() {
        let (store, manager) = manager();
        let now = Utc::now();
        store
            .create_refresh_token(RefreshTokenRecord {
                token: "e".repeat(64),
                user_id: Uuid::new_v4(),
                created_at: now - Duration::days(61),
                expires_at: now - Duration::days(1),
                revoked_at: None,
            })
            .await
            .expect("Failed to seed record");

        let err = manager.authenticate(&"e".repeat(64)).await.unwrap_err();
        assert_eq!(err.as_auth(), Some(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn test_revoked_checked_before_expiry() {
        let (store, manager) = manager();
        let now = Utc::now();
        store
            .create_refresh_token(RefreshTokenRecord {
                token: "r".repeat(64),
                user_id: Uuid::new_v4(),
                created_at: now - Duration::days(61),
                expires_at: now - Duration::days(1),
                revoked_at: Some(now - Duration::days(2)),
            })
            .await
            .expect("Failed to seed record");

        let err = manager.authenticate(&"r".repeat(64)).await.unwrap_err();
        assert_eq!(err.as_auth(), Some(AuthError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_token_expires_after_lifetime() {
        let (_, manager) = manager();
        let user_id = Uuid::new_v4();
        let token = manager.create(user_id).await.expect("Failed to create token");

        let later = Utc::now() + Duration::days(60) + Duration::seconds(1);
        let err = manager.authenticate_at(&token, later).await.unwrap_err();
        assert_eq!(err.as_auth(), Some(AuthError::TokenExpired));

        let earlier = Utc::now() + Duration::days(59);
        assert_eq!(
            manager.authenticate_at(&token, earlier).await.expect("Auth failed"),
            user_id
        );
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let (_, manager) = manager();
        let err = manager.authenticate("deadbeef").await.unwrap_err();
        assert_eq!(err.as_auth(), Some(AuthError::TokenNotFound));
    }

    #[tokio::test]
    async fn test_revoke_unknown_token() {
        let (_, manager) = manager();
        let err = manager.revoke(&"0".repeat(64)).await.unwrap_err();
        assert_eq!(err.as_auth(), Some(AuthError::TokenNotFound));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (store, manager) = manager();
        let token = manager.create(Uuid::new_v4()).await.expect("Failed to create token");

        manager.revoke(&token).await.expect("Revoke failed");
        let first = store
            .find_refresh_token(&token)
            .await
            .expect("Lookup failed")
            .and_then(|r| r.revoked_at);

        manager.revoke(&token).await.expect("Second revoke failed");
        let second = store
            .find_refresh_token(&token)
            .await
            .expect("Lookup failed")
            .and_then(|r| r.revoked_at);

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_lifetime_past_calendar_range_is_an_error() {
        let (store, manager) = manager();
        let manager = manager.with_lifetime(Duration::days(365 * 300_000));

        let err = manager.create(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(store.refresh_token_count().await, 0);
    }

    /// Rejects the first `collisions` inserts as duplicates
    struct CollidingStore {
        inner: InMemoryStore,
        collisions: usize,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl RefreshTokenStore for CollidingStore {
        async fn create_refresh_token(
            &self,
            record: RefreshTokenRecord,
        ) -> Result<RefreshTokenRecord, StoreError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.collisions {
                return Err(StoreError::UniqueViolation("refresh token".to_string()));
            }
            self.inner.create_refresh_token(record).await
        }

        async fn find_refresh_token(
            &self,
            token: &str,
        ) -> Result<Option<RefreshTokenRecord>, StoreError> {
            self.inner.find_refresh_token(token).await
        }

        async fn revoke_refresh_token(
            &self,
            token: &str,
            revoked_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.inner.revoke_refresh_token(token, revoked_at).await
        }
    }

    fn colliding(collisions: usize) -> Arc<CollidingStore> {
        Arc::new(CollidingStore {
            inner: InMemoryStore::new(),
            collisions,
            attempts: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_create_retries_collision_once() {
        let store = colliding(1);
        let manager = RefreshTokenManager::new(store.clone());

        let token = manager.create(Uuid::new_v4()).await.expect("Retry should succeed");

        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
        assert!(manager.authenticate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_surfaces_repeated_collision() {
        let store = colliding(usize::MAX);
        let manager = RefreshTokenManager::new(store.clone());

        let err = manager.create(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, AppError::Store(StoreError::UniqueViolation(_))));
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    }

    /// Never answers
    struct StalledStore;

    #[async_trait]
    impl RefreshTokenStore for StalledStore {
        async fn create_refresh_token(
            &self,
            _record: RefreshTokenRecord,
        ) -> Result<RefreshTokenRecord, StoreError> {
            futures::future::pending().await
        }

        async fn find_refresh_token(
            &self,
            _token: &str,
        ) -> Result<Option<RefreshTokenRecord>, StoreError> {
            futures::future::pending().await
        }

        async fn revoke_refresh_token(
            &self,
            _token: &str,
            _revoked_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_store_deadline() {
        let manager = RefreshTokenManager::new(Arc::new(StalledStore))
            .with_store_timeout(Some(std::time::Duration::from_millis(20)));

        let err = manager.authenticate("whatever").await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Timeout)));

        let err = manager.revoke("whatever").await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Timeout)));
    }
}

//! In-memory Resource Store for tests and local development

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Credential, CredentialStore, RefreshTokenRecord, RefreshTokenStore};
use crate::error::StoreError;

#[derive(Default)]
pub struct InMemoryStore {
    refresh_tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
    credentials: RwLock<HashMap<String, Credential>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user's credential under `email`
    pub async fn insert_credential(&self, email: &str, user_id: Uuid, password_hash: String) {
        self.credentials.write().await.insert(
            email.to_string(),
            Credential {
                user_id,
                password_hash,
            },
        );
    }

    pub async fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.read().await.len()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn create_refresh_token(
        &self,
        record: RefreshTokenRecord,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(&record.token) {
            return Err(StoreError::UniqueViolation("refresh token".to_string()));
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.refresh_tokens.read().await.get(token).cloned())
    }

    async fn revoke_refresh_token(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        let record = tokens
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))?;
        record.revoked_at.get_or_insert(revoked_at);
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_credential_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self.credentials.read().await.get(email).cloned())
    }
}

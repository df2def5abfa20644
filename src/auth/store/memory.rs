//! In-process store for tests and local runs.

use async_trait::async_trait;
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, ConflictField, StoreError, StoreResult};
use crate::auth::{
    account::{Account, AccountUpdate},
    clock::{Clock, SystemClock},
};

/// Stamps `updated_at` from its own clock; share the authenticator's clock to
/// keep both on the same timeline.
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts: RwLock::default(),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_email_or_username(
        &self,
        email: Option<&str>,
        username: Option<&str>,
    ) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        let by_email = email.and_then(|email| accounts.values().find(|a| a.email == email));
        let found = by_email.or_else(|| {
            username.and_then(|username| accounts.values().find(|a| a.username == username))
        });
        Ok(found.cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn insert(&self, account: Account) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict(ConflictField::Email));
        }
        if accounts.values().any(|a| a.username == account.username) {
            return Err(StoreError::Conflict(ConflictField::Username));
        }
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_fields(&self, id: Uuid, update: AccountUpdate) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.apply(&update, self.clock.now());
        Ok(account.clone())
    }

    async fn list(&self) -> StoreResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{account::fixtures, clock::ManualClock};
    use anyhow::Result;

    #[tokio::test]
    async fn insert_rejects_duplicates() -> Result<()> {
        let store = MemoryStore::new();
        store.insert(fixtures::account("ada", "ada@example.com")).await?;

        let dup_email = store
            .insert(fixtures::account("grace", "ada@example.com"))
            .await;
        assert!(matches!(
            dup_email,
            Err(StoreError::Conflict(ConflictField::Email))
        ));

        let dup_username = store
            .insert(fixtures::account("ada", "grace@example.com"))
            .await;
        assert!(matches!(
            dup_username,
            Err(StoreError::Conflict(ConflictField::Username))
        ));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn finds_by_either_identifier() -> Result<()> {
        let store = MemoryStore::new();
        let account = store.insert(fixtures::account("ada", "ada@example.com")).await?;

        let by_email = store
            .find_by_email_or_username(Some("ada@example.com"), None)
            .await?;
        assert_eq!(by_email.map(|a| a.id), Some(account.id));

        let by_username = store.find_by_email_or_username(None, Some("ada")).await?;
        assert_eq!(by_username.map(|a| a.id), Some(account.id));

        let missing = store
            .find_by_email_or_username(Some("nobody@example.com"), Some("nobody"))
            .await?;
        assert!(missing.is_none());
        assert!(store.find_by_email_or_username(None, None).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_missing_account_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .update_fields(Uuid::now_v7(), AccountUpdate::default())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn update_applies_fields() -> Result<()> {
        let store = MemoryStore::new();
        let account = store.insert(fixtures::account("ada", "ada@example.com")).await?;
        let updated = store
            .update_fields(
                account.id,
                AccountUpdate {
                    is_active: Some(false),
                    ..AccountUpdate::default()
                },
            )
            .await?;
        assert!(!updated.is_active);
        assert_eq!(store.find_by_id(account.id).await?, Some(updated));
        Ok(())
    }

    #[tokio::test]
    async fn update_stamps_time_from_injected_clock() -> Result<()> {
        let start = chrono::Utc::now() - chrono::Duration::days(30);
        let clock = Arc::new(ManualClock::new(start));
        let store = MemoryStore::with_clock(clock.clone());
        let account = store.insert(fixtures::account("ada", "ada@example.com")).await?;

        clock.advance(chrono::Duration::minutes(5));
        let updated = store
            .update_fields(
                account.id,
                AccountUpdate {
                    failed_login_attempts: Some(1),
                    ..AccountUpdate::default()
                },
            )
            .await?;
        assert_eq!(updated.updated_at, start + chrono::Duration::minutes(5));
        Ok(())
    }
}

//! Account persistence.
//!
//! [`AccountStore`] owns the uniqueness rules on username and email and applies
//! each update atomically per record. Nothing above it assumes more than that.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::account::{Account, AccountUpdate};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Identity field that collided with an existing account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictField {
    Email,
    Username,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account not found")]
    NotFound,
    #[error("duplicate {0:?}")]
    Conflict(ConflictField),
    #[error("store operation timed out")]
    Timeout,
    #[error("store unavailable: {0:#}")]
    Unavailable(#[source] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Match on either identifier; both are expected already normalized.
    /// Email wins when both are given and point at different accounts.
    async fn find_by_email_or_username(
        &self,
        email: Option<&str>,
        username: Option<&str>,
    ) -> StoreResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;

    /// # Errors
    /// [`StoreError::Conflict`] when the username or email is already taken.
    async fn insert(&self, account: Account) -> StoreResult<Account>;

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when no account has this id.
    async fn update_fields(&self, id: Uuid, update: AccountUpdate) -> StoreResult<Account>;

    /// All accounts, oldest first.
    async fn list(&self) -> StoreResult<Vec<Account>>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

//! PostgreSQL-backed account store.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::{AccountStore, ConflictField, StoreError, StoreResult};
use crate::auth::account::{Account, AccountUpdate, Role};

const SCHEMA: &str = include_str!("../../../sql/schema.sql");

const USERNAME_CONSTRAINT: &str = "accounts_username_key";
const EMAIL_CONSTRAINT: &str = "accounts_email_key";

const COLUMNS: &str = "id, username, email, first_name, last_name, office_id, password_hash, \
     role, is_active, failed_login_attempts, account_locked_until, password_changed_at, \
     current_refresh_token, last_login, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `accounts` table and its constraints if they do not exist.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be applied.
    pub async fn apply_schema(&self) -> anyhow::Result<()> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DDL",
            db.statement = "sql/schema.sql"
        );
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to apply account schema")?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn find_by_email_or_username(
        &self,
        email: Option<&str>,
        username: Option<&str>,
    ) -> StoreResult<Option<Account>> {
        if email.is_none() && username.is_none() {
            return Ok(None);
        }
        let query = format!(
            "SELECT {COLUMNS} FROM accounts \
             WHERE email = $1 OR username = $2 \
             ORDER BY (email = $1) IS TRUE DESC \
             LIMIT 1"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_error(err, "failed to lookup account"))?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_error(err, "failed to load account"))?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn insert(&self, account: Account) -> StoreResult<Account> {
        let query = format!(
            "INSERT INTO accounts ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(account.id)
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.office_id)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .bind(account.is_active)
            .bind(attempts_to_db(account.failed_login_attempts))
            .bind(account.account_locked_until)
            .bind(account.password_changed_at)
            .bind(&account.current_refresh_token)
            .bind(account.last_login)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| match conflict_field(&err) {
                Some(field) => StoreError::Conflict(field),
                None => store_error(err, "failed to insert account"),
            })?;

        account_from_row(&row)
    }

    async fn update_fields(&self, id: Uuid, update: AccountUpdate) -> StoreResult<Account> {
        let mut builder = update_query(id, update);
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = builder.sql()
        );
        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_error(err, "failed to update account"))?;

        match row {
            Some(row) => account_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn list(&self) -> StoreResult<Vec<Account>> {
        let query = format!("SELECT {COLUMNS} FROM accounts ORDER BY created_at, id");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| store_error(err, "failed to list accounts"))?;

        rows.iter().map(account_from_row).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        let acquire_span = tracing::info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .map_err(|err| store_error(err, "failed to acquire connection"))?;

        let ping_span =
            tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .map_err(|err| store_error(err, "failed to ping database"))
    }
}

/// Only the fields present in `update` are written; `updated_at` always is.
fn update_query(id: Uuid, update: AccountUpdate) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE accounts SET updated_at = NOW()");
    if let Some(hash) = update.password_hash {
        builder.push(", password_hash = ").push_bind(hash);
    }
    if let Some(role) = update.role {
        builder.push(", role = ").push_bind(role.as_str());
    }
    if let Some(active) = update.is_active {
        builder.push(", is_active = ").push_bind(active);
    }
    if let Some(attempts) = update.failed_login_attempts {
        builder
            .push(", failed_login_attempts = ")
            .push_bind(attempts_to_db(attempts));
    }
    if let Some(locked_until) = update.account_locked_until {
        builder
            .push(", account_locked_until = ")
            .push_bind(locked_until);
    }
    if let Some(changed_at) = update.password_changed_at {
        builder.push(", password_changed_at = ").push_bind(changed_at);
    }
    if let Some(token) = update.current_refresh_token {
        builder.push(", current_refresh_token = ").push_bind(token);
    }
    if let Some(last_login) = update.last_login {
        builder.push(", last_login = ").push_bind(last_login);
    }
    builder.push(" WHERE id = ").push_bind(id);
    builder.push(" RETURNING ").push(COLUMNS);
    builder
}

fn attempts_to_db(attempts: u32) -> i32 {
    i32::try_from(attempts).unwrap_or(i32::MAX)
}

fn account_from_row(row: &PgRow) -> StoreResult<Account> {
    let decode = |err: sqlx::Error| store_error(err, "failed to decode account row");

    let role: String = row.try_get("role").map_err(decode)?;
    let role = role
        .parse::<Role>()
        .map_err(|err| StoreError::Unavailable(anyhow!(err)))?;
    let attempts: i32 = row.try_get("failed_login_attempts").map_err(decode)?;

    Ok(Account {
        id: row.try_get("id").map_err(decode)?,
        username: row.try_get("username").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        office_id: row.try_get("office_id").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        role,
        is_active: row.try_get("is_active").map_err(decode)?,
        failed_login_attempts: u32::try_from(attempts).unwrap_or_default(),
        account_locked_until: row.try_get("account_locked_until").map_err(decode)?,
        password_changed_at: row.try_get("password_changed_at").map_err(decode)?,
        current_refresh_token: row.try_get("current_refresh_token").map_err(decode)?,
        last_login: row.try_get("last_login").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn store_error(err: sqlx::Error, context: &'static str) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        other => StoreError::Unavailable(anyhow::Error::new(other).context(context)),
    }
}

/// Unique violations (SQLSTATE 23505) on one of the identity constraints.
fn conflict_field(err: &sqlx::Error) -> Option<ConflictField> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    match db_err.constraint() {
        Some(EMAIL_CONSTRAINT) => Some(ConflictField::Email),
        Some(USERNAME_CONSTRAINT) => Some(ConflictField::Username),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
        constraint: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    fn db_error(code: &'static str, constraint: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(TestDbError {
            code: Some(code),
            constraint,
        }))
    }

    #[test]
    fn unique_violation_names_the_field() {
        assert_eq!(
            conflict_field(&db_error("23505", Some(EMAIL_CONSTRAINT))),
            Some(ConflictField::Email)
        );
        assert_eq!(
            conflict_field(&db_error("23505", Some(USERNAME_CONSTRAINT))),
            Some(ConflictField::Username)
        );
        assert_eq!(
            conflict_field(&db_error("23505", Some("accounts_pkey"))),
            None
        );
        assert_eq!(
            conflict_field(&db_error("99999", Some(EMAIL_CONSTRAINT))),
            None
        );
        assert_eq!(conflict_field(&sqlx::Error::RowNotFound), None);
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            store_error(sqlx::Error::PoolTimedOut, "ctx"),
            StoreError::Timeout
        ));
        assert!(matches!(
            store_error(sqlx::Error::RowNotFound, "ctx"),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn update_query_writes_only_present_fields() {
        let id = Uuid::nil();
        let builder = update_query(
            id,
            AccountUpdate {
                failed_login_attempts: Some(0),
                account_locked_until: Some(None),
                ..AccountUpdate::default()
            },
        );
        let sql = builder.sql();
        assert!(sql.starts_with("UPDATE accounts SET updated_at = NOW()"));
        assert!(sql.contains("failed_login_attempts = $1"));
        assert!(sql.contains("account_locked_until = $2"));
        assert!(sql.contains("WHERE id = $3"));
        assert!(!sql.contains("password_hash ="));
        assert!(!sql.contains("current_refresh_token ="));
    }

    #[test]
    fn schema_declares_identity_constraints() {
        assert!(SCHEMA.contains(EMAIL_CONSTRAINT));
        assert!(SCHEMA.contains(USERNAME_CONSTRAINT));
    }
}

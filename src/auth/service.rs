//! Session authenticator: registration, login, token refresh, logout and
//! access-token verification.
//!
//! Every store call is bounded by the configured store timeout. Password
//! hashing runs on the blocking pool. Login's read-check-write is not
//! serialized per account, so two concurrent failures can race on the counter;
//! the store only guarantees per-record atomicity.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::{fmt, future::Future, sync::Arc, time::Duration};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    account::{Account, AccountProfile, AccountUpdate, Role, normalize_identifier},
    clock::Clock,
    config::AuthConfig,
    error::{AuthError, FieldError},
    guard::Identity,
    lockout::{FailureOutcome, LockoutPolicy},
    password::PasswordHasher,
    store::{AccountStore, ConflictField, StoreError, StoreResult},
    token::TokenIssuer,
};

/// Shortest password [`Authenticator::register`] accepts, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Input for [`Authenticator::register`].
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub office_id: String,
    /// Defaults to [`Role::Employee`].
    pub role: Option<Role>,
}

/// Input for [`Authenticator::login`]; either identifier may be given.
pub struct Credentials {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: SecretString,
}

/// Tokens handed out by a successful registration or login.
#[derive(Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    #[serde(rename = "user")]
    pub account: AccountProfile,
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("account", &self.account)
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

pub struct Authenticator {
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    lockout: LockoutPolicy,
    store_timeout: Duration,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("tokens", &self.tokens)
            .field("lockout", &self.lockout)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            clock,
            hasher: PasswordHasher::new(config.hash_cost())?,
            tokens: TokenIssuer::new(config),
            lockout: LockoutPolicy::new(config.max_failed_logins(), config.lockout_seconds()),
            store_timeout: config.store_timeout(),
        })
    }

    /// Create an account and open its first session.
    ///
    /// # Errors
    /// - [`AuthError::ValidationFailed`] for a password shorter than
    ///   [`MIN_PASSWORD_LENGTH`].
    /// - [`AuthError::Conflict`] naming the email or username already in use.
    #[instrument(skip(self, registration))]
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        if registration.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::ValidationFailed(vec![FieldError::new(
                "password",
                "Password must be at least 8 characters long",
            )]));
        }

        let email = normalize_identifier(&registration.email);
        let username = normalize_identifier(&registration.username);

        let existing = self
            .bounded(
                self.store
                    .find_by_email_or_username(Some(email.as_str()), Some(username.as_str())),
            )
            .await?;
        if let Some(existing) = existing {
            let field = if existing.email == email {
                ConflictField::Email
            } else {
                ConflictField::Username
            };
            debug!(?field, "registration rejected: identifier taken");
            return Err(AuthError::Conflict(field));
        }

        let password_hash = self.hash_password(registration.password).await?;

        let now = self.clock.now();
        let mut account = Account {
            id: Uuid::now_v7(),
            username,
            email,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            office_id: registration.office_id.trim().to_string(),
            password_hash,
            role: registration.role.unwrap_or_default(),
            is_active: true,
            failed_login_attempts: 0,
            account_locked_until: None,
            password_changed_at: None,
            current_refresh_token: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        // Tokens are minted before the insert so the account and its session
        // land in a single write.
        let access_token = self.tokens.issue_access(&account, now)?;
        let refresh_token = self.tokens.issue_refresh(account.id, now)?;
        account.current_refresh_token = Some(refresh_token.clone());

        let account = self.bounded(self.store.insert(account)).await?;
        info!(account_id = %account.id, role = %account.role, "account registered");

        Ok(AuthSession {
            account: account.profile(),
            access_token,
            refresh_token,
        })
    }

    /// Authenticate by email or username and rotate the refresh token.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredentials`] for an unknown identifier or wrong
    ///   password (the latter carries the attempts left).
    /// - [`AuthError::AccountLocked`] / [`AuthError::LockoutTriggered`] while
    ///   or when the lock engages.
    /// - [`AuthError::AccountDeactivated`] for inactive accounts.
    #[instrument(skip(self, credentials))]
    pub async fn login(&self, credentials: Credentials) -> Result<AuthSession, AuthError> {
        let email = non_empty(credentials.email.as_deref());
        let username = non_empty(credentials.username.as_deref());
        if email.is_none() && username.is_none() {
            return Err(AuthError::InvalidCredentials {
                attempts_remaining: None,
            });
        }

        let account = self
            .bounded(
                self.store
                    .find_by_email_or_username(email.as_deref(), username.as_deref()),
            )
            .await?
            .ok_or(AuthError::InvalidCredentials {
                attempts_remaining: None,
            })?;

        let now = self.clock.now();
        if self.lockout.is_locked(&account, now) {
            debug!(account_id = %account.id, "login refused: account locked");
            return Err(AuthError::AccountLocked {
                remaining_minutes: self.lockout.remaining_minutes(&account, now),
            });
        }
        if !account.is_active {
            debug!(account_id = %account.id, "login refused: account deactivated");
            return Err(AuthError::AccountDeactivated);
        }

        let verified = self
            .verify_password(credentials.password, account.password_hash.clone())
            .await?;
        if !verified {
            return Err(self.record_failure(&account).await);
        }

        let access_token = self.tokens.issue_access(&account, now)?;
        let refresh_token = self.tokens.issue_refresh(account.id, now)?;
        let update = AccountUpdate {
            failed_login_attempts: Some(0),
            account_locked_until: Some(None),
            last_login: Some(now),
            current_refresh_token: Some(Some(refresh_token.clone())),
            ..AccountUpdate::default()
        };
        let account = self
            .bounded(self.store.update_fields(account.id, update))
            .await
            .map_err(vanished_as_invalid)?;
        info!(account_id = %account.id, "login succeeded");

        Ok(AuthSession {
            account: account.profile(),
            access_token,
            refresh_token,
        })
    }

    async fn record_failure(&self, account: &Account) -> AuthError {
        let now = self.clock.now();
        let outcome = self.lockout.register_failure(account, now);
        let mut update = AccountUpdate {
            failed_login_attempts: Some(outcome.attempts()),
            ..AccountUpdate::default()
        };
        let rejection = match outcome {
            FailureOutcome::Locked { until, .. } => {
                update.account_locked_until = Some(Some(until));
                warn!(account_id = %account.id, %until, "account locked after repeated failures");
                AuthError::LockoutTriggered {
                    lock_minutes: self.lockout.lock_minutes(),
                }
            }
            FailureOutcome::Counted {
                attempts_remaining, ..
            } => {
                debug!(account_id = %account.id, attempts_remaining, "login failed");
                AuthError::InvalidCredentials {
                    attempts_remaining: Some(attempts_remaining),
                }
            }
        };

        match self
            .bounded(self.store.update_fields(account.id, update))
            .await
            .map_err(vanished_as_invalid)
        {
            Ok(_) => rejection,
            Err(err) => err,
        }
    }

    /// Exchange the account's current refresh token for a new access token.
    /// The refresh token itself is not rotated.
    ///
    /// # Errors
    /// - [`AuthError::MissingRefreshToken`] for an empty token.
    /// - [`AuthError::RefreshTokenRejected`] for a forged or expired token.
    /// - [`AuthError::RefreshTokenSuperseded`] when it is not, byte for byte,
    ///   the stored one.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let now = self.clock.now();
        let claims = self
            .tokens
            .verify_refresh(refresh_token, now)
            .map_err(|err| {
                debug!(error = %err, "refresh token rejected");
                AuthError::RefreshTokenRejected
            })?;

        let account = self
            .bounded(self.store.find_by_id(claims.sub))
            .await?
            .filter(|account| account.current_refresh_token.as_deref() == Some(refresh_token))
            .ok_or(AuthError::RefreshTokenSuperseded)?;

        if !account.is_active {
            return Err(AuthError::AccountDeactivated);
        }
        if changed_after(&account, claims.iat) {
            return Err(AuthError::RefreshTokenSuperseded);
        }

        let access_token = self.tokens.issue_access(&account, now)?;
        debug!(account_id = %account.id, "access token refreshed");
        Ok(access_token)
    }

    /// Clear the stored refresh token. Repeating it, or logging out an account
    /// that no longer exists, succeeds.
    ///
    /// # Errors
    /// Only store failures.
    #[instrument(skip(self))]
    pub async fn logout(&self, account_id: Uuid) -> Result<(), AuthError> {
        let update = AccountUpdate {
            current_refresh_token: Some(None),
            ..AccountUpdate::default()
        };
        match self
            .bounded(self.store.update_fields(account_id, update))
            .await
        {
            Ok(_) | Err(AuthError::NotFound) => {
                info!(%account_id, "logged out");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Verify an access token against the live account.
    ///
    /// # Errors
    /// - [`AuthError::InvalidToken`] / [`AuthError::ExpiredToken`] when the
    ///   token does not verify.
    /// - [`AuthError::AccountGone`] when the account no longer exists.
    /// - [`AuthError::AccountDeactivated`] for inactive accounts.
    /// - [`AuthError::StaleToken`] when the password changed after issuance.
    #[instrument(skip(self, access_token))]
    pub async fn verify_access(&self, access_token: &str) -> Result<Identity, AuthError> {
        let now = self.clock.now();
        let claims = self.tokens.verify_access(access_token, now)?;

        let account = self
            .bounded(self.store.find_by_id(claims.sub))
            .await?
            .ok_or(AuthError::AccountGone)?;

        if !account.is_active {
            return Err(AuthError::AccountDeactivated);
        }
        if changed_after(&account, claims.iat) {
            debug!(account_id = %account.id, "stale access token");
            return Err(AuthError::StaleToken);
        }
        Ok(Identity::from(&account))
    }

    /// # Errors
    /// [`AuthError::NotFound`] if the account vanished.
    #[instrument(skip(self))]
    pub async fn current_account(&self, account_id: Uuid) -> Result<AccountProfile, AuthError> {
        self.bounded(self.store.find_by_id(account_id))
            .await?
            .map(|account| account.profile())
            .ok_or(AuthError::NotFound)
    }

    /// # Errors
    /// Only store failures.
    #[instrument(skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<AccountProfile>, AuthError> {
        let accounts = self.bounded(self.store.list()).await?;
        Ok(accounts.iter().map(Account::profile).collect())
    }

    /// # Errors
    /// [`AuthError::StoreUnavailable`] when the store does not answer.
    pub async fn check_store(&self) -> Result<(), AuthError> {
        self.bounded(self.store.ping()).await
    }

    async fn bounded<T>(&self, op: impl Future<Output = StoreResult<T>>) -> Result<T, AuthError> {
        match tokio::time::timeout(self.store_timeout, op).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => {
                warn!(timeout = ?self.store_timeout, "store call timed out");
                Err(AuthError::StoreUnavailable(StoreError::Timeout))
            }
        }
    }

    async fn hash_password(&self, password: SecretString) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| AuthError::Internal(err.into()))?
            .map_err(AuthError::Internal)
    }

    async fn verify_password(
        &self,
        password: SecretString,
        password_hash: String,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(|err| AuthError::Internal(err.into()))
    }
}

/// Whole-second comparison, matching the `iat` claim's resolution.
fn changed_after(account: &Account, issued_at: i64) -> bool {
    account
        .password_changed_at
        .is_some_and(|changed| changed.timestamp() > issued_at)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(normalize_identifier)
        .filter(|value| !value.is_empty())
}

/// An account deleted mid-login reads as a failed login, not a 404.
fn vanished_as_invalid(err: AuthError) -> AuthError {
    match err {
        AuthError::NotFound => AuthError::InvalidCredentials {
            attempts_remaining: None,
        },
        other => other,
    }
}

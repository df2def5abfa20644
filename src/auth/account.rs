//! Account records, roles, and the outward-facing profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Hr,
    Finance,
    Owner,
    Admin,
}

impl Role {
    pub const ALL: [Self; 5] = [
        Self::Employee,
        Self::Hr,
        Self::Finance,
        Self::Owner,
        Self::Admin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Hr => "hr",
            Self::Finance => "finance",
            Self::Owner => "owner",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}

/// Persisted identity record. Not serializable on purpose: use [`AccountProfile`].
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub office_id: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub failed_login_attempts: u32,
    pub account_locked_until: Option<DateTime<Utc>>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub current_refresh_token: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn profile(&self) -> AccountProfile {
        AccountProfile::from(self)
    }

    /// Apply a partial update in place. Stores call this so every backend
    /// interprets [`AccountUpdate`] the same way.
    pub fn apply(&mut self, update: &AccountUpdate, now: DateTime<Utc>) {
        if let Some(hash) = &update.password_hash {
            self.password_hash.clone_from(hash);
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        if let Some(attempts) = update.failed_login_attempts {
            self.failed_login_attempts = attempts;
        }
        if let Some(locked_until) = update.account_locked_until {
            self.account_locked_until = locked_until;
        }
        if let Some(changed_at) = update.password_changed_at {
            self.password_changed_at = changed_at;
        }
        if let Some(token) = &update.current_refresh_token {
            self.current_refresh_token.clone_from(token);
        }
        if let Some(last_login) = update.last_login {
            self.last_login = Some(last_login);
        }
        self.updated_at = now;
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("office_id", &self.office_id)
            .field("password_hash", &"***")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("failed_login_attempts", &self.failed_login_attempts)
            .field("account_locked_until", &self.account_locked_until)
            .field("password_changed_at", &self.password_changed_at)
            .field(
                "current_refresh_token",
                &self.current_refresh_token.as_ref().map(|_| "***"),
            )
            .field("last_login", &self.last_login)
            .finish_non_exhaustive()
    }
}

/// Field-wise partial update. `None` leaves a field untouched; for nullable
/// columns `Some(None)` clears the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub failed_login_attempts: Option<u32>,
    pub account_locked_until: Option<Option<DateTime<Utc>>>,
    pub password_changed_at: Option<Option<DateTime<Utc>>>,
    pub current_refresh_token: Option<Option<String>>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Public view of an account; never carries credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub office_id: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            office_id: account.office_id.clone(),
            role: account.role,
            is_active: account.is_active,
            last_login: account.last_login,
            created_at: account.created_at,
        }
    }
}

/// Normalize a username or email for lookups and uniqueness checks.
#[must_use]
pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn account(username: &str, email: &str) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            office_id: "hq".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            role: Role::Employee,
            is_active: true,
            failed_login_attempts: 0,
            account_locked_until: None,
            password_changed_at: None,
            current_refresh_token: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn role_parses_and_displays() -> Result<()> {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>()?, role);
        }
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::default(), Role::Employee);
        Ok(())
    }

    #[test]
    fn role_serializes_lowercase() -> Result<()> {
        assert_eq!(serde_json::to_value(Role::Finance)?, "finance");
        Ok(())
    }

    #[test]
    fn profile_never_exposes_credentials() -> Result<()> {
        let mut account = fixtures::account("ada", "ada@example.com");
        account.current_refresh_token = Some("refresh".to_string());
        let value = serde_json::to_value(account.profile())?;
        let object = value.as_object().cloned().unwrap_or_default();
        assert!(object.contains_key("username"));
        assert!(object.contains_key("officeId"));
        assert!(!object.keys().any(|key| key.to_lowercase().contains("password")));
        assert!(!object.keys().any(|key| key.to_lowercase().contains("token")));
        Ok(())
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut account = fixtures::account("ada", "ada@example.com");
        account.current_refresh_token = Some("refresh-secret".to_string());
        let debug = format!("{account:?}");
        assert!(!debug.contains("argon2id"));
        assert!(!debug.contains("refresh-secret"));
    }

    #[test]
    fn apply_sets_and_clears_fields() {
        let mut account = fixtures::account("ada", "ada@example.com");
        let now = Utc::now();
        account.apply(
            &AccountUpdate {
                failed_login_attempts: Some(3),
                account_locked_until: Some(Some(now)),
                current_refresh_token: Some(Some("token".to_string())),
                ..AccountUpdate::default()
            },
            now,
        );
        assert_eq!(account.failed_login_attempts, 3);
        assert_eq!(account.account_locked_until, Some(now));
        assert_eq!(account.current_refresh_token.as_deref(), Some("token"));

        account.apply(
            &AccountUpdate {
                account_locked_until: Some(None),
                current_refresh_token: Some(None),
                ..AccountUpdate::default()
            },
            now,
        );
        assert_eq!(account.failed_login_attempts, 3);
        assert_eq!(account.account_locked_until, None);
        assert_eq!(account.current_refresh_token, None);
    }

    #[test]
    fn normalize_identifier_trims_and_lowercases() {
        assert_eq!(normalize_identifier(" Alice@Example.COM "), "alice@example.com");
    }
}

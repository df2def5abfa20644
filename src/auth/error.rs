//! Tagged error type for every authentication operation.
//!
//! Callers branch on [`AuthError::kind`]; messages are stable and never reveal
//! which identifier matched during login.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::store::{ConflictField, StoreError};
use super::token::TokenError;

/// Coarse error classes the HTTP layer maps to status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    ValidationFailed,
    Unauthorized,
    Forbidden,
    NotFound,
    StoreUnavailable,
}

/// A single rejected input field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{}", conflict_message(.0))]
    Conflict(ConflictField),

    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),

    #[error("Invalid email or password")]
    InvalidCredentials { attempts_remaining: Option<u32> },

    #[error("Access denied. No token provided or invalid format.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Token expired. Please log in again.")]
    ExpiredToken,

    #[error("Password recently changed. Please log in again.")]
    StaleToken,

    #[error("User no longer exists.")]
    AccountGone,

    #[error("Refresh token is required")]
    MissingRefreshToken,

    #[error("Invalid or expired refresh token")]
    RefreshTokenRejected,

    #[error("Invalid refresh token")]
    RefreshTokenSuperseded,

    #[error("Account is locked. Please try again in {remaining_minutes} minutes.")]
    AccountLocked { remaining_minutes: i64 },

    #[error(
        "Account locked due to multiple failed login attempts. Please try again after {lock_minutes} minutes."
    )]
    LockoutTriggered { lock_minutes: i64 },

    #[error("Your account has been deactivated. Please contact administrator.")]
    AccountDeactivated,

    #[error("You do not have permission to perform this action.")]
    InsufficientRole,

    #[error("User not found")]
    NotFound,

    #[error("Internal server error")]
    StoreUnavailable(#[source] StoreError),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::InvalidCredentials { .. }
            | Self::MissingToken
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::StaleToken
            | Self::AccountGone
            | Self::MissingRefreshToken
            | Self::RefreshTokenRejected
            | Self::RefreshTokenSuperseded => ErrorKind::Unauthorized,
            Self::AccountLocked { .. }
            | Self::LockoutTriggered { .. }
            | Self::AccountDeactivated
            | Self::InsufficientRole => ErrorKind::Forbidden,
            Self::NotFound => ErrorKind::NotFound,
            Self::StoreUnavailable(_) | Self::Internal(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Remaining login attempts before lockout, when the failure carries one.
    #[must_use]
    pub const fn attempts_remaining(&self) -> Option<u32> {
        match self {
            Self::InvalidCredentials { attempts_remaining } => *attempts_remaining,
            _ => None,
        }
    }

    /// Underlying cause for infrastructure failures, used only for diagnostics.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::StoreUnavailable(err) => Some(err.to_string()),
            Self::Internal(err) => Some(format!("{err:#}")),
            _ => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => Self::Conflict(field),
            StoreError::NotFound => Self::NotFound,
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::ExpiredToken,
            TokenError::Malformed | TokenError::InvalidSignature | TokenError::WrongKind => {
                Self::InvalidToken
            }
            TokenError::Encode(err) => Self::Internal(err.into()),
        }
    }
}

const fn conflict_message(field: &ConflictField) -> &'static str {
    match field {
        ConflictField::Email => "User with this email already exists",
        ConflictField::Username => "Username already taken",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            AuthError::Conflict(ConflictField::Email).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            AuthError::InvalidCredentials {
                attempts_remaining: Some(4)
            }
            .kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(AuthError::StaleToken.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            AuthError::AccountLocked {
                remaining_minutes: 3
            }
            .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(AuthError::AccountDeactivated.kind(), ErrorKind::Forbidden);
        assert_eq!(AuthError::InsufficientRole.kind(), ErrorKind::Forbidden);
        assert_eq!(AuthError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            AuthError::StoreUnavailable(StoreError::Timeout).kind(),
            ErrorKind::StoreUnavailable
        );
    }

    #[test]
    fn conflict_names_the_field() {
        assert_eq!(
            AuthError::Conflict(ConflictField::Email).to_string(),
            "User with this email already exists"
        );
        assert_eq!(
            AuthError::Conflict(ConflictField::Username).to_string(),
            "Username already taken"
        );
    }

    #[test]
    fn lock_message_includes_minutes() {
        let err = AuthError::AccountLocked {
            remaining_minutes: 7,
        };
        assert_eq!(
            err.to_string(),
            "Account is locked. Please try again in 7 minutes."
        );
    }

    #[test]
    fn store_errors_map_to_kinds() {
        assert!(matches!(
            AuthError::from(StoreError::Conflict(ConflictField::Username)),
            AuthError::Conflict(ConflictField::Username)
        ));
        assert!(matches!(
            AuthError::from(StoreError::NotFound),
            AuthError::NotFound
        ));
        let err = AuthError::from(StoreError::Timeout);
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(err.detail().is_some());
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn token_errors_are_unauthorized() {
        assert!(matches!(
            AuthError::from(TokenError::Expired),
            AuthError::ExpiredToken
        ));
        assert!(matches!(
            AuthError::from(TokenError::WrongKind),
            AuthError::InvalidToken
        ));
    }
}

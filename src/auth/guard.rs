//! Bearer-token authentication and role checks for protected requests.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    account::{Account, Role},
    error::AuthError,
    service::Authenticator,
};

/// The caller behind a verified access token, taken from the live account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// # Errors
/// [`AuthError::MissingToken`] when the header is absent, uses another scheme,
/// or carries an empty token.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Resolve an `Authorization` header to the identity of a live account.
///
/// # Errors
/// Any error from [`bearer_token`] or [`Authenticator::verify_access`].
pub async fn authenticate(
    authenticator: &Authenticator,
    header: Option<&str>,
) -> Result<Identity, AuthError> {
    let token = bearer_token(header)?;
    authenticator.verify_access(token).await
}

/// # Errors
/// [`AuthError::InsufficientRole`] when the identity's role is not allowed.
pub fn authorize(identity: &Identity, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::account::fixtures;
    use crate::auth::error::ErrorKind;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).ok(), Some("abc.def.ghi"));
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(Some("Bearer ")),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(Some("bearer abc")),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn authorize_checks_membership() {
        let mut account = fixtures::account("ada", "ada@example.com");
        let employee = Identity::from(&account);
        let err = authorize(&employee, &[Role::Admin, Role::Owner]).err();
        assert_eq!(err.map(|err| err.kind()), Some(ErrorKind::Forbidden));

        account.role = Role::Admin;
        let admin = Identity::from(&account);
        assert!(authorize(&admin, &[Role::Admin, Role::Owner]).is_ok());
        assert!(authorize(&admin, &[]).is_err());
    }
}

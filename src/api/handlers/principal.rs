//! Authenticated caller extraction for protected handlers.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use super::ApiError;
use crate::{
    api::AppState,
    auth::{Identity, Role, authenticate, authorize},
};

/// Resolve the bearer token into the live account's identity.
///
/// # Errors
/// An [`ApiError`] for missing, invalid, expired or stale tokens and for
/// deactivated accounts.
pub async fn require_auth(headers: &HeaderMap, state: &AppState) -> Result<Identity, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    authenticate(state.authenticator(), header)
        .await
        .map_err(|err| state.reject(err))
}

/// [`require_auth`] plus a role check.
///
/// # Errors
/// As [`require_auth`], or forbidden when the role is not allowed.
pub async fn require_role(
    headers: &HeaderMap,
    state: &AppState,
    allowed: &[Role],
) -> Result<Identity, ApiError> {
    let identity = require_auth(headers, state).await?;
    authorize(&identity, allowed).map_err(|err| state.reject(err))?;
    Ok(identity)
}

//! HTTP handlers and the shared response envelope.
//!
//! Every body has the shape `{ "success": bool, "message"?: string, "data"?: ... }`.
//! Failures add `attemptsRemaining` and `errors` when relevant, and `error`
//! (diagnostic detail) only in the development environment.

pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod principal;
pub mod refresh;
pub mod register;
pub mod users;
pub mod validation;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use super::{AppState, Environment};
use crate::auth::{AccountProfile, AuthError, ErrorKind, FieldError};

#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageBody {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub user: AccountProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersData {
    pub users: Vec<AccountProfile>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An [`AuthError`] rendered for a given environment.
#[derive(Debug)]
pub struct ApiError {
    error: AuthError,
    environment: Environment,
}

impl ApiError {
    #[must_use]
    pub fn new(error: AuthError, environment: Environment) -> Self {
        Self { error, environment }
    }
}

impl AppState {
    /// Render a core error for this deployment's environment.
    #[must_use]
    pub fn reject(&self, error: AuthError) -> ApiError {
        ApiError::new(error, self.environment())
    }
}

/// Rejection for a request without a JSON body.
#[must_use]
pub fn missing_payload() -> AuthError {
    AuthError::ValidationFailed(vec![FieldError::new("body", "Missing payload")])
}

#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.error.kind();
        let detail = self.error.detail();
        if kind == ErrorKind::StoreUnavailable {
            error!(error = ?self.error, "request failed");
        }

        let errors = match &self.error {
            AuthError::ValidationFailed(fields) => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            message: self.error.to_string(),
            attempts_remaining: self.error.attempts_remaining(),
            errors,
            error: detail.filter(|_| self.environment.exposes_error_detail()),
        };

        (status_for(kind), Json(body)).into_response()
    }
}

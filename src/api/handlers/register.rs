use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiError, Envelope, ErrorBody, missing_payload, validation::validate_registration};
use crate::{
    api::AppState,
    auth::{AuthSession, Registration},
};

#[derive(ToSchema, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub office_id: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("office_id", &self.office_id)
            .field("password", &"***")
            .finish_non_exhaustive()
    }
}

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            username: request.username,
            email: request.email,
            password: SecretString::from(request.password),
            office_id: request.office_id,
            role: None,
        }
    }
}

#[utoipa::path(
    post,
    path= "/v1/auth/register",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Registration successful", body = Envelope<AuthSession>, content_type = "application/json"),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Email or username already in use", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(state, payload))]
pub async fn register(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(state.reject(missing_payload()));
    };
    validate_registration(&request).map_err(|err| state.reject(err))?;

    let session = state
        .authenticator()
        .register(request.into())
        .await
        .map_err(|err| state.reject(err))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(session, "User registered successfully")),
    )
        .into_response())
}

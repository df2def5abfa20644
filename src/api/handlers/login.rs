use axum::{Json, extract::Extension};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiError, Envelope, ErrorBody, missing_payload, validation::validate_login};
use crate::{
    api::AppState,
    auth::{AuthSession, Credentials},
};

#[derive(ToSchema, Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    post,
    path= "/v1/auth/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = Envelope<AuthSession>),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 403, description = "Account locked or deactivated", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(state, payload))]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<Envelope<AuthSession>>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(state.reject(missing_payload()));
    };
    validate_login(&request).map_err(|err| state.reject(err))?;

    let credentials = Credentials {
        email: request.email,
        username: request.username,
        password: SecretString::from(request.password),
    };
    let session = state
        .authenticator()
        .login(credentials)
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(Envelope::with_message(session, "Login successful")))
}

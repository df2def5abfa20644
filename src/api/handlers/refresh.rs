use axum::{Json, extract::Extension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiError, Envelope, ErrorBody};
use crate::api::AppState;

#[derive(ToSchema, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenData {
    pub access_token: String,
}

#[utoipa::path(
    post,
    path= "/v1/auth/refresh-token",
    request_body = RefreshRequest,
    responses (
        (status = 200, description = "New access token", body = Envelope<AccessTokenData>),
        (status = 401, description = "Missing, invalid, expired or superseded refresh token", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(state, payload))]
pub async fn refresh(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Json<Envelope<AccessTokenData>>, ApiError> {
    let token = payload
        .and_then(|Json(request)| request.refresh_token)
        .unwrap_or_default();

    let access_token = state
        .authenticator()
        .refresh(&token)
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(Envelope::ok(AccessTokenData { access_token })))
}

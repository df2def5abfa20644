use axum::{Json, extract::Extension, http::HeaderMap};
use std::sync::Arc;
use tracing::instrument;

use super::{ApiError, ErrorBody, MessageBody, principal::require_auth};
use crate::api::AppState;

#[utoipa::path(
    post,
    path= "/v1/auth/logout",
    responses (
        (status = 200, description = "Refresh token cleared", body = MessageBody),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
#[instrument(skip(state, headers))]
pub async fn logout(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MessageBody>, ApiError> {
    let identity = require_auth(&headers, &state).await?;

    state
        .authenticator()
        .logout(identity.id)
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(MessageBody {
        success: true,
        message: "Logged out successfully".to_string(),
    }))
}

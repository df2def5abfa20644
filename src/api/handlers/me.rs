use axum::{Json, extract::Extension, http::HeaderMap};
use std::sync::Arc;

use super::{ApiError, Envelope, ErrorBody, UserData, principal::require_auth};
use crate::api::AppState;

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Return the authenticated account profile.", body = Envelope<UserData>),
        (status = 401, description = "Missing, invalid or stale access token.", body = ErrorBody),
        (status = 404, description = "Account no longer exists.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<UserData>>, ApiError> {
    let identity = require_auth(&headers, &state).await?;

    let user = state
        .authenticator()
        .current_account(identity.id)
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(Envelope::ok(UserData { user })))
}

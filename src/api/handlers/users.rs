use axum::{Json, extract::Extension, http::HeaderMap};
use std::sync::Arc;

use super::{ApiError, Envelope, ErrorBody, UsersData, principal::require_role};
use crate::{api::AppState, auth::Role};

/// Roles allowed to list every account.
pub const LIST_ROLES: [Role; 2] = [Role::Admin, Role::Owner];

#[utoipa::path(
    get,
    path = "/v1/auth/users",
    responses(
        (status = 200, description = "All account profiles, oldest first.", body = Envelope<UsersData>),
        (status = 401, description = "Missing or invalid access token.", body = ErrorBody),
        (status = 403, description = "Caller is not an admin or owner.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn users(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<UsersData>>, ApiError> {
    require_role(&headers, &state, &LIST_ROLES).await?;

    let users = state
        .authenticator()
        .list_accounts()
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(Envelope::ok(UsersData { users })))
}

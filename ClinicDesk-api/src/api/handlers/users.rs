use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use clinic_desk_domain::auth::UserInfo;
use clinic_desk_domain::entities::user::{CreateUserRequest, User};

use crate::api::error::ApiResult;
use crate::entities::PublicErrorResponse;
use crate::api::extract::ApiJson;
use crate::api::state::AppState;

/// Enable or disable a login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetUserActiveRequest {
    pub active: bool,
}

/// Create a user (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid request", body = PublicErrorResponse),
        (status = 403, description = "Admin role required", body = PublicErrorResponse),
        (status = 409, description = "Username taken", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "users"
)]
#[instrument(skip(state, payload), fields(admin = %admin.username))]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<UserInfo>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.users.create_user(payload, Some(&admin.user_id)).await?;
    info!("Created user {} with role {}", user.username, user.role);
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users; password hashes are never included
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Admin role required", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "users"
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let users = state.users.list_users().await?;
    info!("Listed {} users", users.len());
    Ok(Json(users))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/active",
    params(("id" = String, Path, description = "User id")),
    request_body = SetUserActiveRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "users"
)]
pub async fn set_user_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<SetUserActiveRequest>,
) -> ApiResult<Json<User>> {
    let user = state.users.set_active(&id, payload.active).await?;
    info!("User {} active={}", user.username, user.active);
    Ok(Json(user))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::referral::{
    CreateReferralRequest, Referral, ReferralListQuery, UpdateReferralRequest,
};

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

#[utoipa::path(
    post,
    path = "/api/v1/referrals",
    request_body = CreateReferralRequest,
    responses(
        (status = 201, description = "Referral created", body = Referral),
        (status = 400, description = "Invalid request", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "referrals"
)]
#[instrument(skip(state, payload))]
pub async fn create_referral(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateReferralRequest>,
) -> ApiResult<(StatusCode, Json<Referral>)> {
    let referral = state.referrals.create_referral(payload).await?;
    info!("Created referral {} for patient {}", referral.id, referral.patient_id);
    Ok((StatusCode::CREATED, Json(referral)))
}

#[utoipa::path(
    get,
    path = "/api/v1/referrals",
    params(ReferralListQuery),
    responses((status = 200, description = "Matching referrals", body = [Referral])),
    security(("jwt_auth" = [])),
    tag = "referrals"
)]
pub async fn list_referrals(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ReferralListQuery>,
) -> ApiResult<Json<Vec<Referral>>> {
    Ok(Json(state.referrals.list_referrals(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/referrals/{id}",
    params(("id" = String, Path, description = "Referral id")),
    responses(
        (status = 200, description = "Referral found", body = Referral),
        (status = 404, description = "Referral not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "referrals"
)]
pub async fn get_referral(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Referral>> {
    Ok(Json(state.referrals.get_referral(&id).await?))
}

/// Edit a referral or move it along `pending -> accepted | declined`, `accepted -> completed`
#[utoipa::path(
    put,
    path = "/api/v1/referrals/{id}",
    params(("id" = String, Path, description = "Referral id")),
    request_body = UpdateReferralRequest,
    responses(
        (status = 200, description = "Referral updated", body = Referral),
        (status = 404, description = "Referral not found", body = PublicErrorResponse),
        (status = 409, description = "Status transition not allowed", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "referrals"
)]
#[instrument(skip(state, payload))]
pub async fn update_referral(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateReferralRequest>,
) -> ApiResult<Json<Referral>> {
    let referral = state.referrals.update_referral(&id, payload).await?;
    info!("Referral {} is {}", id, referral.status);
    Ok(Json(referral))
}

#[utoipa::path(
    delete,
    path = "/api/v1/referrals/{id}",
    params(("id" = String, Path, description = "Referral id")),
    responses(
        (status = 204, description = "Referral deleted"),
        (status = 404, description = "Referral not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "referrals"
)]
pub async fn delete_referral(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.referrals.delete_referral(&id).await?;
    info!("Deleted referral {}", id);
    Ok(StatusCode::NO_CONTENT)
}

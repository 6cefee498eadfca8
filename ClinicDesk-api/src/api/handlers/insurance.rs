use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::insurance::{
    CreateInsurancePolicyRequest, InsurancePolicy, InsuranceQuery, UpdateInsurancePolicyRequest,
};

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

#[utoipa::path(
    post,
    path = "/api/v1/patients/{id}/insurance",
    params(("id" = String, Path, description = "Patient id")),
    request_body = CreateInsurancePolicyRequest,
    responses(
        (status = 201, description = "Policy added", body = InsurancePolicy),
        (status = 400, description = "Invalid dates or amount, or unknown patient", body = PublicErrorResponse),
        (status = 409, description = "Policy number already registered with this provider", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "insurance"
)]
#[instrument(skip(state))]
pub async fn create_policy(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    ApiJson(payload): ApiJson<CreateInsurancePolicyRequest>,
) -> ApiResult<(StatusCode, Json<InsurancePolicy>)> {
    let policy = state.insurance.create_policy(&patient_id, payload).await?;
    info!("Added policy {} for patient {}", policy.id, patient_id);
    Ok((StatusCode::CREATED, Json(policy)))
}

/// Policies of a patient; `active_on` keeps those valid on that date
#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/insurance",
    params(("id" = String, Path, description = "Patient id"), InsuranceQuery),
    responses((status = 200, description = "Policies", body = [InsurancePolicy])),
    security(("jwt_auth" = [])),
    tag = "insurance"
)]
pub async fn list_policies(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    ApiQuery(query): ApiQuery<InsuranceQuery>,
) -> ApiResult<Json<Vec<InsurancePolicy>>> {
    Ok(Json(state.insurance.list_policies(&patient_id, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/insurance/{id}",
    params(("id" = String, Path, description = "Policy id")),
    responses(
        (status = 200, description = "Policy found", body = InsurancePolicy),
        (status = 404, description = "Policy not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "insurance"
)]
pub async fn get_policy(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<InsurancePolicy>> {
    Ok(Json(state.insurance.get_policy(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/insurance/{id}",
    params(("id" = String, Path, description = "Policy id")),
    request_body = UpdateInsurancePolicyRequest,
    responses(
        (status = 200, description = "Policy updated", body = InsurancePolicy),
        (status = 404, description = "Policy not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "insurance"
)]
#[instrument(skip(state))]
pub async fn update_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateInsurancePolicyRequest>,
) -> ApiResult<Json<InsurancePolicy>> {
    let policy = state.insurance.update_policy(&id, payload).await?;
    info!("Updated policy {}", id);
    Ok(Json(policy))
}

#[utoipa::path(
    delete,
    path = "/api/v1/insurance/{id}",
    params(("id" = String, Path, description = "Policy id")),
    responses(
        (status = 204, description = "Policy deleted"),
        (status = 404, description = "Policy not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "insurance"
)]
pub async fn delete_policy(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.insurance.delete_policy(&id).await?;
    info!("Deleted policy {}", id);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::clinic::{Clinic, CreateClinicRequest, UpdateClinicRequest};

use crate::api::error::ApiResult;
use crate::entities::PublicErrorResponse;
use crate::api::extract::ApiJson;
use crate::api::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/clinics",
    request_body = CreateClinicRequest,
    responses(
        (status = 201, description = "Clinic created", body = Clinic),
        (status = 400, description = "Invalid request", body = PublicErrorResponse),
        (status = 409, description = "HFR id already registered", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "clinics"
)]
#[instrument(skip(state))]
pub async fn create_clinic(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateClinicRequest>,
) -> ApiResult<(StatusCode, Json<Clinic>)> {
    let clinic = state.clinics.create_clinic(payload).await?;
    info!("Created clinic {}", clinic.id);
    Ok((StatusCode::CREATED, Json(clinic)))
}

#[utoipa::path(
    get,
    path = "/api/v1/clinics",
    responses((status = 200, description = "All clinics", body = [Clinic])),
    security(("jwt_auth" = [])),
    tag = "clinics"
)]
pub async fn list_clinics(State(state): State<AppState>) -> ApiResult<Json<Vec<Clinic>>> {
    Ok(Json(state.clinics.list_clinics().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/clinics/{id}",
    params(("id" = String, Path, description = "Clinic id")),
    responses(
        (status = 200, description = "Clinic found", body = Clinic),
        (status = 404, description = "Clinic not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "clinics"
)]
pub async fn get_clinic(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Clinic>> {
    Ok(Json(state.clinics.get_clinic(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/clinics/{id}",
    params(("id" = String, Path, description = "Clinic id")),
    request_body = UpdateClinicRequest,
    responses(
        (status = 200, description = "Clinic updated", body = Clinic),
        (status = 404, description = "Clinic not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "clinics"
)]
#[instrument(skip(state))]
pub async fn update_clinic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateClinicRequest>,
) -> ApiResult<Json<Clinic>> {
    let clinic = state.clinics.update_clinic(&id, payload).await?;
    info!("Updated clinic {}", id);
    Ok(Json(clinic))
}

#[utoipa::path(
    delete,
    path = "/api/v1/clinics/{id}",
    params(("id" = String, Path, description = "Clinic id")),
    responses(
        (status = 204, description = "Clinic deleted"),
        (status = 404, description = "Clinic not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "clinics"
)]
pub async fn delete_clinic(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.clinics.delete_clinic(&id).await?;
    info!("Deleted clinic {}", id);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::patient::{Patient, PatientSearchQuery, RegisterPatientRequest, UpdatePatientRequest};
use clinic_desk_domain::services::page_limit;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::entities::common::PatientPage;
use crate::entities::{PublicErrorResponse, PublicPaginatedResponse};

/// Register a patient and assign a UHID
#[utoipa::path(
    post,
    path = "/api/v1/patients",
    request_body = RegisterPatientRequest,
    responses(
        (status = 201, description = "Patient registered", body = Patient),
        (status = 400, description = "Invalid request", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "patients"
)]
#[instrument(skip(state, payload))]
pub async fn register_patient(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterPatientRequest>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let patient = state.patients.register_patient(payload).await?;
    info!("Registered patient {} as {}", patient.id, patient.uhid);
    Ok((StatusCode::CREATED, Json(patient)))
}

/// Search patients by name, phone or UHID
#[utoipa::path(
    get,
    path = "/api/v1/patients",
    params(PatientSearchQuery),
    responses((status = 200, description = "One page of patients", body = PatientPage)),
    security(("jwt_auth" = [])),
    tag = "patients"
)]
pub async fn search_patients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PatientSearchQuery>,
) -> ApiResult<Json<PatientPage>> {
    let limit = page_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    let (patients, total) = state.patients.search_patients(query).await?;
    Ok(Json(PublicPaginatedResponse::new(patients, total, offset, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient found", body = Patient),
        (status = 404, description = "Patient not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "patients"
)]
pub async fn get_patient(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Patient>> {
    Ok(Json(state.patients.get_patient(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 400, description = "Invalid request", body = PublicErrorResponse),
        (status = 404, description = "Patient not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "patients"
)]
#[instrument(skip(state, payload))]
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePatientRequest>,
) -> ApiResult<Json<Patient>> {
    let patient = state.patients.update_patient(&id, payload).await?;
    info!("Updated patient {}", id);
    Ok(Json(patient))
}

#[utoipa::path(
    delete,
    path = "/api/v1/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "patients"
)]
pub async fn delete_patient(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.patients.delete_patient(&id).await?;
    info!("Deleted patient {}", id);
    Ok(StatusCode::NO_CONTENT)
}

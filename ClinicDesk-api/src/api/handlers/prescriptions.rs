use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::prescription::{
    CreatePrescriptionRequest, Prescription, UpdatePrescriptionRequest,
};

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

/// Write a prescription, optionally starting from a prescription template
#[utoipa::path(
    post,
    path = "/api/v1/prescriptions",
    request_body = CreatePrescriptionRequest,
    responses(
        (status = 201, description = "Prescription created", body = Prescription),
        (status = 400, description = "Invalid request, no medicines, or unusable template", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "prescriptions"
)]
#[instrument(skip(state, payload))]
pub async fn create_prescription(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePrescriptionRequest>,
) -> ApiResult<(StatusCode, Json<Prescription>)> {
    let prescription = state.prescriptions.create_prescription(payload).await?;
    info!(
        "Created prescription {} for patient {} with {} medicines",
        prescription.id,
        prescription.patient_id,
        prescription.medicines.len()
    );
    Ok((StatusCode::CREATED, Json(prescription)))
}

/// Prescriptions of a patient, newest first
#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/prescriptions",
    params(("id" = String, Path, description = "Patient id")),
    responses((status = 200, description = "Prescriptions", body = [Prescription])),
    security(("jwt_auth" = [])),
    tag = "prescriptions"
)]
pub async fn list_patient_prescriptions(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<Prescription>>> {
    Ok(Json(state.prescriptions.list_for_patient(&patient_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/prescriptions/{id}",
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "Prescription found", body = Prescription),
        (status = 404, description = "Prescription not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "prescriptions"
)]
pub async fn get_prescription(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Prescription>> {
    Ok(Json(state.prescriptions.get_prescription(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/prescriptions/{id}",
    params(("id" = String, Path, description = "Prescription id")),
    request_body = UpdatePrescriptionRequest,
    responses(
        (status = 200, description = "Prescription updated", body = Prescription),
        (status = 404, description = "Prescription not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "prescriptions"
)]
#[instrument(skip(state, payload))]
pub async fn update_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePrescriptionRequest>,
) -> ApiResult<Json<Prescription>> {
    let prescription = state.prescriptions.update_prescription(&id, payload).await?;
    info!("Updated prescription {}", id);
    Ok(Json(prescription))
}

#[utoipa::path(
    delete,
    path = "/api/v1/prescriptions/{id}",
    params(("id" = String, Path, description = "Prescription id")),
    responses(
        (status = 204, description = "Prescription deleted"),
        (status = 404, description = "Prescription not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "prescriptions"
)]
pub async fn delete_prescription(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.prescriptions.delete_prescription(&id).await?;
    info!("Deleted prescription {}", id);
    Ok(StatusCode::NO_CONTENT)
}

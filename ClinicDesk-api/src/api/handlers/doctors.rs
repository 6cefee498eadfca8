use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::doctor::{
    AvailabilityQuery, CreateDoctorRequest, Doctor, DoctorAvailability, DoctorListQuery, ReplaceTimeSlotsRequest,
    TimeSlot, UpdateDoctorRequest,
};

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

#[utoipa::path(
    post,
    path = "/api/v1/doctors",
    request_body = CreateDoctorRequest,
    responses(
        (status = 201, description = "Doctor created", body = Doctor),
        (status = 400, description = "Invalid request or unknown clinic", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
#[instrument(skip(state))]
pub async fn create_doctor(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateDoctorRequest>,
) -> ApiResult<(StatusCode, Json<Doctor>)> {
    let doctor = state.doctors.create_doctor(payload).await?;
    info!("Created doctor {} at clinic {}", doctor.id, doctor.clinic_id);
    Ok((StatusCode::CREATED, Json(doctor)))
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors",
    params(DoctorListQuery),
    responses((status = 200, description = "Matching doctors", body = [Doctor])),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
pub async fn list_doctors(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DoctorListQuery>,
) -> ApiResult<Json<Vec<Doctor>>> {
    Ok(Json(state.doctors.list_doctors(query).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor found", body = Doctor),
        (status = 404, description = "Doctor not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
pub async fn get_doctor(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Doctor>> {
    Ok(Json(state.doctors.get_doctor(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    request_body = UpdateDoctorRequest,
    responses(
        (status = 200, description = "Doctor updated", body = Doctor),
        (status = 404, description = "Doctor not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
#[instrument(skip(state))]
pub async fn update_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateDoctorRequest>,
) -> ApiResult<Json<Doctor>> {
    let doctor = state.doctors.update_doctor(&id, payload).await?;
    info!("Updated doctor {}", id);
    Ok(Json(doctor))
}

/// Deactivate a doctor; history is kept
#[utoipa::path(
    delete,
    path = "/api/v1/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 204, description = "Doctor deactivated"),
        (status = 404, description = "Doctor not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
pub async fn deactivate_doctor(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.doctors.deactivate_doctor(&id).await?;
    info!("Deactivated doctor {}", id);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}/time-slots",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Weekly slots", body = [TimeSlot]),
        (status = 404, description = "Doctor not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
pub async fn get_time_slots(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<TimeSlot>>> {
    Ok(Json(state.doctors.get_time_slots(&id).await?))
}

/// Replace all weekly slots of a doctor in one transaction
#[utoipa::path(
    put,
    path = "/api/v1/doctors/{id}/time-slots",
    params(("id" = String, Path, description = "Doctor id")),
    request_body = ReplaceTimeSlotsRequest,
    responses(
        (status = 200, description = "Slots replaced", body = [TimeSlot]),
        (status = 400, description = "Invalid or overlapping slots", body = PublicErrorResponse),
        (status = 404, description = "Doctor not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
#[instrument(skip(state, payload))]
pub async fn replace_time_slots(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReplaceTimeSlotsRequest>,
) -> ApiResult<Json<Vec<TimeSlot>>> {
    let slots = state.doctors.replace_time_slots(&id, payload).await?;
    info!("Doctor {} now has {} weekly slots", id, slots.len());
    Ok(Json(slots))
}

#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}/availability",
    params(("id" = String, Path, description = "Doctor id"), AvailabilityQuery),
    responses(
        (status = 200, description = "Slot start times for the day", body = DoctorAvailability),
        (status = 400, description = "Invalid date", body = PublicErrorResponse),
        (status = 404, description = "Doctor not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "doctors"
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> ApiResult<Json<DoctorAvailability>> {
    Ok(Json(state.doctors.get_availability(&id, &query.date).await?))
}

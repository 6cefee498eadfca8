use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::appointment::{
    Appointment, AppointmentListQuery, BookAppointmentRequest, UpdateAppointmentRequest,
    UpdateAppointmentStatusRequest,
};
use clinic_desk_domain::services::page_limit;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::entities::common::AppointmentPage;
use crate::entities::{PublicErrorResponse, PublicPaginatedResponse};

/// Book an appointment; a doctor cannot be double-booked
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = BookAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = Appointment),
        (status = 400, description = "Invalid request", body = PublicErrorResponse),
        (status = 409, description = "Slot already taken or doctor inactive", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(state))]
pub async fn book_appointment(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<BookAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let appointment = state.appointments.book_appointment(payload).await?;
    info!(
        "Booked appointment {} with doctor {} on {} at {}",
        appointment.id, appointment.doctor_id, appointment.appointment_date, appointment.start_time
    );
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    params(AppointmentListQuery),
    responses((status = 200, description = "One page of appointments", body = AppointmentPage)),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AppointmentListQuery>,
) -> ApiResult<Json<AppointmentPage>> {
    let limit = page_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    let (appointments, total) = state.appointments.list_appointments(query).await?;
    Ok(Json(PublicPaginatedResponse::new(appointments, total, offset, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment found", body = Appointment),
        (status = 404, description = "Appointment not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
pub async fn get_appointment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.appointments.get_appointment(&id).await?))
}

/// Reschedule or annotate a scheduled appointment
#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated", body = Appointment),
        (status = 404, description = "Appointment not found", body = PublicErrorResponse),
        (status = 409, description = "Not scheduled any more, or the new slot is taken", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(state))]
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateAppointmentRequest>,
) -> ApiResult<Json<Appointment>> {
    let appointment = state.appointments.update_appointment(&id, payload).await?;
    info!("Updated appointment {}", id);
    Ok(Json(appointment))
}

#[utoipa::path(
    patch,
    path = "/api/v1/appointments/{id}/status",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Appointment),
        (status = 404, description = "Appointment not found", body = PublicErrorResponse),
        (status = 409, description = "Transition not allowed", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
#[instrument(skip(state))]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateAppointmentStatusRequest>,
) -> ApiResult<Json<Appointment>> {
    let appointment = state.appointments.update_status(&id, payload.status).await?;
    info!("Appointment {} is now {}", id, appointment.status);
    Ok(Json(appointment))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment cancelled", body = Appointment),
        (status = 404, description = "Appointment not found", body = PublicErrorResponse),
        (status = 409, description = "Appointment can no longer be cancelled", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "appointments"
)]
pub async fn cancel_appointment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Appointment>> {
    let appointment = state.appointments.cancel_appointment(&id).await?;
    info!("Cancelled appointment {}", id);
    Ok(Json(appointment))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::queue::{
    CallNextRequest, CheckInRequest, QueueEntry, QueueQuery, QueueSummary, UpdateQueueStatusRequest,
};

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

/// Check a patient in and hand out the next token for the doctor and day
#[utoipa::path(
    post,
    path = "/api/v1/queue/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Token issued", body = QueueEntry),
        (status = 400, description = "Invalid request", body = PublicErrorResponse),
        (status = 404, description = "Appointment not found", body = PublicErrorResponse),
        (status = 409, description = "Already in the queue, or appointment not scheduled", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "queue"
)]
#[instrument(skip(state))]
pub async fn check_in(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CheckInRequest>,
) -> ApiResult<(StatusCode, Json<QueueEntry>)> {
    let entry = state.queue.check_in(payload).await?;
    info!(
        "Patient {} checked in for doctor {} on {} with token {}",
        entry.patient_id, entry.doctor_id, entry.queue_date, entry.token_number
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// A doctor's queue for a day, ordered by token
#[utoipa::path(
    get,
    path = "/api/v1/queue",
    params(QueueQuery),
    responses((status = 200, description = "Queue entries", body = [QueueEntry])),
    security(("jwt_auth" = [])),
    tag = "queue"
)]
pub async fn list_queue(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QueueQuery>,
) -> ApiResult<Json<Vec<QueueEntry>>> {
    Ok(Json(state.queue.list_queue(query).await?))
}

/// Move the lowest waiting token into consultation
#[utoipa::path(
    post,
    path = "/api/v1/queue/call-next",
    request_body = CallNextRequest,
    responses(
        (status = 200, description = "Entry now in consultation", body = QueueEntry),
        (status = 404, description = "Nobody is waiting", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "queue"
)]
#[instrument(skip(state))]
pub async fn call_next(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CallNextRequest>,
) -> ApiResult<Json<QueueEntry>> {
    let entry = state.queue.call_next(payload).await?;
    info!("Called token {} for doctor {}", entry.token_number, entry.doctor_id);
    Ok(Json(entry))
}

#[utoipa::path(
    patch,
    path = "/api/v1/queue/{id}/status",
    params(("id" = String, Path, description = "Queue entry id")),
    request_body = UpdateQueueStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = QueueEntry),
        (status = 404, description = "Entry not found", body = PublicErrorResponse),
        (status = 409, description = "Transition not allowed", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "queue"
)]
#[instrument(skip(state))]
pub async fn update_queue_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateQueueStatusRequest>,
) -> ApiResult<Json<QueueEntry>> {
    let entry = state.queue.update_status(&id, payload.status).await?;
    info!("Queue entry {} (token {}) is now {}", id, entry.token_number, entry.status);
    Ok(Json(entry))
}

#[utoipa::path(
    get,
    path = "/api/v1/queue/summary",
    params(QueueQuery),
    responses((status = 200, description = "Counts per status and current token", body = QueueSummary)),
    security(("jwt_auth" = [])),
    tag = "queue"
)]
pub async fn queue_summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QueueQuery>,
) -> ApiResult<Json<QueueSummary>> {
    Ok(Json(state.queue.summary(query).await?))
}

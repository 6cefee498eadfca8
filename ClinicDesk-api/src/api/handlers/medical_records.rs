use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::{info, instrument};
use utoipa::ToSchema;

use clinic_desk_domain::auth::UserInfo;
use clinic_desk_domain::entities::medical_record::{MedicalRecord, UploadMedicalRecord};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

/// Multipart form accepted by the upload route
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadRecordForm {
    /// JPEG, PNG or PDF
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// e.g. `lab_report`, `xray`
    record_type: String,
    title: Option<String>,
}

/// Upload a report or scan; photos are resized and stored as JPEG
#[utoipa::path(
    post,
    path = "/api/v1/patients/{id}/records",
    params(("id" = String, Path, description = "Patient id")),
    request_body(content = UploadRecordForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Record stored", body = MedicalRecord),
        (status = 400, description = "Missing file or fields", body = PublicErrorResponse),
        (status = 404, description = "Patient not found", body = PublicErrorResponse),
        (status = 413, description = "File too large", body = PublicErrorResponse),
        (status = 415, description = "Unsupported file type", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "records"
)]
#[instrument(skip(state, user, multipart), fields(user_id = %user.user_id))]
pub async fn upload_record(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Path(patient_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MedicalRecord>)> {
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut record_type = None;
    let mut title = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("record_type") => record_type = Some(field.text().await?),
            Some("title") => title = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, content_type, bytes) = file.ok_or_else(|| ApiError::bad_request("Missing `file` field"))?;
    let record_type = record_type.ok_or_else(|| ApiError::bad_request("Missing `record_type` field"))?;

    let upload = UploadMedicalRecord {
        record_type,
        title: title.unwrap_or_else(|| file_name.clone()),
        file_name,
        content_type,
        bytes,
    };

    let record = state
        .records
        .upload_record(&patient_id, upload, Some(user.user_id.as_str()))
        .await?;
    info!("Stored record {} ({} bytes) for patient {}", record.id, record.size_bytes, patient_id);
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}/records",
    params(("id" = String, Path, description = "Patient id")),
    responses((status = 200, description = "Records, newest first", body = [MedicalRecord])),
    security(("jwt_auth" = [])),
    tag = "records"
)]
pub async fn list_records(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<MedicalRecord>>> {
    Ok(Json(state.records.list_records(&patient_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/records/{id}",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record metadata", body = MedicalRecord),
        (status = 404, description = "Record not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "records"
)]
pub async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<MedicalRecord>> {
    Ok(Json(state.records.get_record(&id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/records/{id}/download",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Stored file", content_type = "application/octet-stream"),
        (status = 404, description = "Record or file not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "records"
)]
pub async fn download_record(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let file = state.records.download_record(&id).await?;
    let disposition = format!("attachment; filename=\"{}\"", attachment_name(&file.record.file_name));

    Ok((
        [
            (header::CONTENT_TYPE, file.record.content_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/v1/records/{id}",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 204, description = "Record and file removed"),
        (status = 404, description = "Record not found", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "records"
)]
pub async fn delete_record(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.records.delete_record(&id).await?;
    info!("Deleted record {}", id);
    Ok(StatusCode::NO_CONTENT)
}

// Header-safe file name: printable ASCII without quotes or path separators
fn attachment_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if cleaned.trim().is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

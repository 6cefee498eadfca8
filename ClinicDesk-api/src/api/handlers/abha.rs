use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use clinic_desk_domain::entities::abha::{
    AbhaAccount, AbhaVerifyResponse, LoginOtpRequest, LoginVerifyRequest, OtpSentResponse, RegistrationOtpRequest,
    RegistrationVerifyRequest,
};

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::entities::PublicErrorResponse;

/// Start ABHA creation: ABDM sends an OTP to the Aadhaar-linked mobile
#[utoipa::path(
    post,
    path = "/api/v1/abha/registration/otp",
    request_body = RegistrationOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = OtpSentResponse),
        (status = 400, description = "Invalid Aadhaar number", body = PublicErrorResponse),
        (status = 404, description = "Patient not found", body = PublicErrorResponse),
        (status = 502, description = "ABDM request failed", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "abha"
)]
// Aadhaar numbers stay out of the logs
#[instrument(skip_all)]
pub async fn request_registration_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegistrationOtpRequest>,
) -> ApiResult<Json<OtpSentResponse>> {
    let patient_id = payload.patient_id.clone();
    let response = state.abha.request_registration_otp(payload).await?;
    info!("ABHA registration OTP sent for patient {} (session {})", patient_id, response.session_id);
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/abha/registration/verify",
    request_body = RegistrationVerifyRequest,
    responses(
        (status = 200, description = "ABHA created and linked", body = AbhaVerifyResponse),
        (status = 404, description = "Session not found", body = PublicErrorResponse),
        (status = 409, description = "Session is not waiting for an OTP", body = PublicErrorResponse),
        (status = 410, description = "OTP window has passed", body = PublicErrorResponse),
        (status = 502, description = "ABDM rejected the OTP or failed", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "abha"
)]
#[instrument(skip_all)]
pub async fn verify_registration(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegistrationVerifyRequest>,
) -> ApiResult<Json<AbhaVerifyResponse>> {
    let response = state.abha.verify_registration(payload).await?;
    info!("ABHA {} verified in session {}", response.account.abha_number, response.session_id);
    Ok(Json(response))
}

/// Start verification of an existing ABHA by ABHA number or mobile
#[utoipa::path(
    post,
    path = "/api/v1/abha/login/otp",
    request_body = LoginOtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = OtpSentResponse),
        (status = 400, description = "Invalid ABHA number or mobile", body = PublicErrorResponse),
        (status = 502, description = "ABDM request failed", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "abha"
)]
#[instrument(skip_all)]
pub async fn request_login_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginOtpRequest>,
) -> ApiResult<Json<OtpSentResponse>> {
    let hint = payload.login_hint;
    let response = state.abha.request_login_otp(payload).await?;
    info!("ABHA login OTP sent by {} (session {})", hint.as_str(), response.session_id);
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/abha/login/verify",
    request_body = LoginVerifyRequest,
    responses(
        (status = 200, description = "ABHA verified", body = AbhaVerifyResponse),
        (status = 404, description = "Session not found", body = PublicErrorResponse),
        (status = 409, description = "Session is not waiting for an OTP", body = PublicErrorResponse),
        (status = 410, description = "OTP window has passed", body = PublicErrorResponse),
        (status = 502, description = "ABDM rejected the OTP or failed", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "abha"
)]
#[instrument(skip_all)]
pub async fn verify_login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginVerifyRequest>,
) -> ApiResult<Json<AbhaVerifyResponse>> {
    let response = state.abha.verify_login(payload).await?;
    info!("ABHA {} verified in session {}", response.account.abha_number, response.session_id);
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/abha/accounts/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Linked ABHA", body = AbhaAccount),
        (status = 404, description = "No ABHA linked", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "abha"
)]
pub async fn get_abha_account(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<AbhaAccount>> {
    Ok(Json(state.abha.get_account(&patient_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/abha/accounts/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient id")),
    responses(
        (status = 204, description = "ABHA unlinked"),
        (status = 404, description = "No ABHA linked", body = PublicErrorResponse)
    ),
    security(("jwt_auth" = [])),
    tag = "abha"
)]
pub async fn unlink_abha_account(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.abha.unlink(&patient_id).await?;
    info!("Unlinked ABHA from patient {}", patient_id);
    Ok(StatusCode::NO_CONTENT)
}

//! Mapping of domain failures onto HTTP responses

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

use clinic_desk_domain::services::ServiceError;

use crate::entities::PublicErrorResponse;

/// Error half of every resource handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An unexpected error occurred",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => {
                let fields: Vec<&str> = message.split("; ").collect();
                let details = json!(fields);
                Self::new(StatusCode::BAD_REQUEST, "validation_error", message).with_details(details)
            }
            ServiceError::NotFound(message) => Self::not_found(message),
            ServiceError::Conflict(message) => Self::new(StatusCode::CONFLICT, "conflict", message),
            ServiceError::InvalidState(message) => Self::new(StatusCode::CONFLICT, "invalid_state", message),
            ServiceError::Expired(message) => Self::new(StatusCode::GONE, "expired", message),
            ServiceError::Unauthorized(message) => Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message),
            ServiceError::TooLarge(message) => Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message),
            ServiceError::UnsupportedMediaType(message) => {
                Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type", message)
            }
            ServiceError::Gateway(message) => {
                error!("Upstream failure: {}", message);
                Self::new(StatusCode::BAD_GATEWAY, "gateway_error", "ABDM request failed")
                    .with_details(json!({ "reason": message }))
            }
            ServiceError::Repository(message) | ServiceError::Internal(message) => {
                error!("Internal failure: {}", message);
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", err.body_text());
        }
        Self::bad_request(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, code = self.code, "{}", self.message);
        } else {
            warn!(status = %self.status, code = self.code, "{}", self.message);
        }

        let body = PublicErrorResponse {
            error: self.code.to_string(),
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_status_mapping() {
        let cases = [
            (ServiceError::Validation("name: required".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::InvalidState("x".into()), StatusCode::CONFLICT),
            (ServiceError::Expired("x".into()), StatusCode::GONE),
            (ServiceError::TooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (ServiceError::UnsupportedMediaType("x".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (ServiceError::Gateway("x".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Repository("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_validation_details_list_fields() {
        let err = ApiError::from(ServiceError::Validation("first_name: too long; phone: invalid".into()));
        assert_eq!(err.code, "validation_error");
        assert_eq!(err.details.unwrap(), json!(["first_name: too long", "phone: invalid"]));
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = ApiError::from(ServiceError::Repository("disk I/O error".into()));
        assert_eq!(err.message, "An unexpected error occurred");
    }
}

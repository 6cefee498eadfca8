// Domain services
// Business rules live here; repositories only store and fetch.

pub mod abha;
pub mod appointment;
pub mod clinic;
pub mod doctor;
pub mod insurance;
pub mod medical_record;
pub mod patient;
pub mod prescription;
pub mod queue;
pub mod referral;
pub mod template;
pub mod user;

use thiserror::Error;
use tracing::error;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use clinic_desk_data::repository::RepositoryError;

use crate::entities::conversions::ConversionError;

// Re-export service traits and their default implementations
pub use abha::{AbhaService, AbhaServiceTrait};
pub use appointment::{AppointmentService, AppointmentServiceTrait};
pub use clinic::{ClinicService, ClinicServiceTrait};
pub use doctor::{DoctorService, DoctorServiceTrait};
pub use insurance::{InsuranceService, InsuranceServiceTrait};
pub use medical_record::{MedicalRecordService, MedicalRecordServiceTrait, UploadSettings};
pub use patient::{PatientService, PatientServiceTrait};
pub use prescription::{PrescriptionService, PrescriptionServiceTrait};
pub use queue::{QueueService, QueueServiceTrait};
pub use referral::{ReferralService, ReferralServiceTrait};
pub use template::{TemplateService, TemplateServiceTrait};
pub use user::{UserService, UserServiceTrait};

/// Errors raised by domain services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate or double-booked
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transition not allowed from the entity's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Time-limited session has expired
    #[error("Expired: {0}")]
    Expired(String),

    /// Upstream ABDM call failed
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Bad credentials or inactive account
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Upload exceeds the size limit
    #[error("Payload too large: {0}")]
    TooLarge(String),

    /// Upload is not an accepted file type
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// Anything else that is our fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            RepositoryError::Validation(msg) => ServiceError::Validation(msg),
            RepositoryError::StaleState(msg) => ServiceError::InvalidState(msg),
            other => {
                error!("Repository failure: {}", other);
                ServiceError::Repository(other.to_string())
            }
        }
    }
}

impl From<ConversionError> for ServiceError {
    fn from(err: ConversionError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(validation_message(&errors))
    }
}

/// Flatten validator errors into `field: message; field: message`
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut parts = Vec::new();
    collect_messages(errors, "", &mut parts);
    parts.join("; ")
}

fn collect_messages(errors: &ValidationErrors, prefix: &str, parts: &mut Vec<String>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|err| match &err.message {
                        Some(msg) => msg.to_string(),
                        None => format!("Invalid {}", field),
                    })
                    .collect();
                parts.push(format!("{}: {}", path, messages.join(", ")));
            }
            ValidationErrorsKind::Struct(inner) => collect_messages(inner, &path, parts),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_messages(inner, &format!("{}[{}]", path, index), parts);
                }
            }
        }
    }
}

/// Run the derive validation of a request
pub fn validate_request<T: Validate>(request: &T) -> Result<(), ServiceError> {
    request.validate().map_err(ServiceError::from)
}

/// Validate every element of a list, reporting the first failing index
pub fn validate_each<T: Validate>(field: &str, items: &[T]) -> Result<(), ServiceError> {
    for (index, item) in items.iter().enumerate() {
        if let Err(errors) = item.validate() {
            return Err(ServiceError::Validation(format!(
                "{}[{}]: {}",
                field,
                index,
                validation_message(&errors)
            )));
        }
    }
    Ok(())
}

/// Clamp a requested page size to 1..=100, defaulting to 20
pub fn page_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(20).clamp(1, 100)
}

/// Today's date in the server's local time zone, `YYYY-MM-DD`
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::validators::validate_date;

/// One line of a prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Medicine {
    #[validate(length(min = 1, max = 200, message = "Medicine name must be between 1 and 200 characters"))]
    pub name: String,

    /// e.g. `500 mg`
    #[validate(length(min = 1, max = 100, message = "Dosage must be between 1 and 100 characters"))]
    pub dosage: String,

    /// e.g. `1-0-1`
    #[validate(length(min = 1, max = 100, message = "Frequency must be between 1 and 100 characters"))]
    pub frequency: String,

    #[validate(range(min = 1, max = 365, message = "Duration must be between 1 and 365 days"))]
    pub duration_days: u32,

    #[validate(length(max = 500, message = "Instructions cannot exceed 500 characters"))]
    pub instructions: Option<String>,
}

/// A prescription written for a patient
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Prescription {
    pub id: String,

    pub clinic_id: String,

    pub patient_id: String,

    pub doctor_id: String,

    /// Consultation the prescription was written in
    pub appointment_id: Option<String>,

    pub diagnosis: Option<String>,

    pub medicines: Vec<Medicine>,

    pub advice: Option<String>,

    /// `YYYY-MM-DD`
    pub follow_up_date: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

/// Request payload for writing a prescription.
///
/// When `template_id` names a prescription template, its medicines and advice
/// fill in whatever the request leaves out.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePrescriptionRequest {
    #[validate(length(min = 1, message = "Clinic id is required"))]
    pub clinic_id: String,

    #[validate(length(min = 1, message = "Patient id is required"))]
    pub patient_id: String,

    #[validate(length(min = 1, message = "Doctor id is required"))]
    pub doctor_id: String,

    pub appointment_id: Option<String>,

    pub template_id: Option<String>,

    #[validate(length(max = 1000, message = "Diagnosis cannot exceed 1000 characters"))]
    pub diagnosis: Option<String>,

    pub medicines: Option<Vec<Medicine>>,

    #[validate(length(max = 2000, message = "Advice cannot exceed 2000 characters"))]
    pub advice: Option<String>,

    #[validate(custom = "validate_date")]
    pub follow_up_date: Option<String>,
}

/// Request payload for amending a prescription
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePrescriptionRequest {
    #[validate(length(max = 1000, message = "Diagnosis cannot exceed 1000 characters"))]
    pub diagnosis: Option<String>,

    pub medicines: Option<Vec<Medicine>>,

    #[validate(length(max = 2000, message = "Advice cannot exceed 2000 characters"))]
    pub advice: Option<String>,

    #[validate(custom = "validate_date")]
    pub follow_up_date: Option<String>,
}

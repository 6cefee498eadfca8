use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validators::{validate_blood_group, validate_gender, validate_past_date, validate_phone};

/// A registered patient
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    /// Unique identifier
    pub id: String,

    /// Registering clinic
    pub clinic_id: String,

    /// Unique hospital id, e.g. `UH202603140007`
    pub uhid: String,

    pub first_name: String,

    pub last_name: String,

    /// `male`, `female` or `other`
    pub gender: String,

    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,

    pub phone: Option<String>,

    pub email: Option<String>,

    pub address: Option<String>,

    pub blood_group: Option<String>,

    /// Linked ABHA number, when the patient has one
    pub abha_number: Option<String>,

    /// Linked ABHA address, e.g. `name@abdm`
    pub abha_address: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

/// Request payload for registering a patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterPatientRequest {
    #[validate(length(min = 1, message = "Clinic id is required"))]
    pub clinic_id: String,

    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be between 1 and 100 characters"))]
    pub last_name: String,

    #[validate(custom = "validate_gender")]
    pub gender: String,

    #[validate(custom = "validate_past_date")]
    pub date_of_birth: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 500, message = "Address cannot exceed 500 characters"))]
    pub address: Option<String>,

    #[validate(custom = "validate_blood_group")]
    pub blood_group: Option<String>,
}

/// Request payload for updating a patient; omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePatientRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be between 1 and 100 characters"))]
    pub last_name: Option<String>,

    #[validate(custom = "validate_gender")]
    pub gender: Option<String>,

    #[validate(custom = "validate_past_date")]
    pub date_of_birth: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 500, message = "Address cannot exceed 500 characters"))]
    pub address: Option<String>,

    #[validate(custom = "validate_blood_group")]
    pub blood_group: Option<String>,
}

/// Query parameters for searching patients
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PatientSearchQuery {
    /// Only patients of this clinic
    pub clinic_id: Option<String>,

    /// Free text matched against name, phone and UHID
    pub q: Option<String>,

    /// Page size (default 20, max 100)
    pub limit: Option<usize>,

    /// Number of rows to skip
    pub offset: Option<usize>,
}

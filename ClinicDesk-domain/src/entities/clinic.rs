use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::validators::validate_phone;

/// A clinic (health facility)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Clinic {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Postal address
    pub address: Option<String>,

    /// Contact phone number
    pub phone: Option<String>,

    /// Contact email
    pub email: Option<String>,

    /// Health Facility Registry id under ABDM
    pub hfr_id: Option<String>,

    /// Creation timestamp (RFC 3339)
    pub created_at: String,

    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

/// Request payload for creating a clinic
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateClinicRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 500, message = "Address cannot exceed 500 characters"))]
    pub address: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    /// Health Facility Registry id, unique across clinics
    #[validate(length(min = 1, max = 50, message = "HFR id must be between 1 and 50 characters"))]
    pub hfr_id: Option<String>,
}

/// Request payload for updating a clinic; omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateClinicRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Address cannot exceed 500 characters"))]
    pub address: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 50, message = "HFR id must be between 1 and 50 characters"))]
    pub hfr_id: Option<String>,
}

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validators::{validate_date, validate_phone, validate_time};

/// A doctor practising at a clinic
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Doctor {
    /// Unique identifier
    pub id: String,

    /// Clinic the doctor belongs to
    pub clinic_id: String,

    /// Full name
    pub name: String,

    /// Speciality, e.g. "Paediatrics"
    pub specialization: Option<String>,

    /// Medical council registration number
    pub registration_number: Option<String>,

    pub phone: Option<String>,

    pub email: Option<String>,

    /// Consultation fee in rupees
    pub consultation_fee: Option<f64>,

    /// Inactive doctors are hidden from booking
    pub active: bool,

    pub created_at: String,

    pub updated_at: String,
}

/// Request payload for creating a doctor
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateDoctorRequest {
    #[validate(length(min = 1, message = "Clinic id is required"))]
    pub clinic_id: String,

    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Specialization cannot exceed 100 characters"))]
    pub specialization: Option<String>,

    #[validate(length(max = 50, message = "Registration number cannot exceed 50 characters"))]
    pub registration_number: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(range(min = 0.0, message = "Consultation fee cannot be negative"))]
    pub consultation_fee: Option<f64>,
}

/// Request payload for updating a doctor; omitted fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDoctorRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Specialization cannot exceed 100 characters"))]
    pub specialization: Option<String>,

    #[validate(length(max = 50, message = "Registration number cannot exceed 50 characters"))]
    pub registration_number: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(range(min = 0.0, message = "Consultation fee cannot be negative"))]
    pub consultation_fee: Option<f64>,

    pub active: Option<bool>,
}

/// Query parameters for listing doctors
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DoctorListQuery {
    /// Only doctors of this clinic
    pub clinic_id: Option<String>,

    /// Filter on the active flag
    pub active: Option<bool>,
}

/// A weekly consultation window
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimeSlot {
    pub id: String,

    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,

    /// `HH:MM`
    pub start_time: String,

    /// `HH:MM`
    pub end_time: String,

    /// Length of one appointment in minutes
    pub slot_minutes: u32,
}

/// One window in a time slot replacement request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TimeSlotInput {
    #[validate(range(max = 6, message = "Day of week must be between 0 (Monday) and 6 (Sunday)"))]
    pub day_of_week: u8,

    #[validate(custom = "validate_time")]
    pub start_time: String,

    #[validate(custom = "validate_time")]
    pub end_time: String,

    #[validate(range(min = 5, max = 240, message = "Slot length must be between 5 and 240 minutes"))]
    pub slot_minutes: u32,
}

/// Request payload replacing all of a doctor's time slots
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReplaceTimeSlotsRequest {
    pub slots: Vec<TimeSlotInput>,
}

/// Query parameters for the availability endpoint
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
pub struct AvailabilityQuery {
    /// Day to check, `YYYY-MM-DD`
    #[validate(custom = "validate_date")]
    pub date: String,
}

/// A bookable start time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AvailableSlot {
    pub start_time: String,

    pub end_time: String,

    /// False when a non-cancelled appointment already starts here
    pub available: bool,
}

/// Slots for one doctor on one day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DoctorAvailability {
    pub doctor_id: String,

    pub date: String,

    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,

    pub slots: Vec<AvailableSlot>,
}

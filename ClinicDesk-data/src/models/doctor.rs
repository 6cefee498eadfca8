use serde::{Deserialize, Serialize};

/// Storage model for a doctor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub id: String,
    pub clinic_id: String,
    pub name: String,
    pub specialization: Option<String>,
    pub registration_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub consultation_fee: Option<f64>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable doctor columns
#[derive(Debug, Clone)]
pub struct DoctorFields {
    pub clinic_id: String,
    pub name: String,
    pub specialization: Option<String>,
    pub registration_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub consultation_fee: Option<f64>,
    pub active: bool,
}

/// Filter for listing doctors
#[derive(Debug, Clone, Default)]
pub struct DoctorFilter {
    pub clinic_id: Option<String>,
    pub active: Option<bool>,
}

/// A weekly consultation window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlotRecord {
    pub id: String,
    pub doctor_id: String,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    pub slot_minutes: u32,
}

/// A time slot to be written for a doctor
#[derive(Debug, Clone)]
pub struct NewTimeSlot {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub slot_minutes: u32,
}

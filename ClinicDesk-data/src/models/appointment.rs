use serde::{Deserialize, Serialize};

/// Storage model for an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: String,
    pub clinic_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    /// `YYYY-MM-DD`
    pub appointment_date: String,
    /// `HH:MM`
    pub start_time: String,
    pub end_time: Option<String>,
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input data for booking an appointment
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub clinic_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Filter for listing appointments
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub clinic_id: Option<String>,
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

use serde::{Deserialize, Serialize};

/// Storage model for a prescription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub id: String,
    pub clinic_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_id: Option<String>,
    pub diagnosis: Option<String>,
    /// JSON array of medicines
    pub medicines: String,
    pub advice: Option<String>,
    pub follow_up_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable prescription columns
#[derive(Debug, Clone)]
pub struct PrescriptionFields {
    pub clinic_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_id: Option<String>,
    pub diagnosis: Option<String>,
    pub medicines: String,
    pub advice: Option<String>,
    pub follow_up_date: Option<String>,
}

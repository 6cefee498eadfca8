use serde::{Deserialize, Serialize};

/// Storage model for a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub clinic_id: String,
    /// Unique hospital id, assigned at registration
    pub uhid: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub abha_number: Option<String>,
    pub abha_address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable patient columns
#[derive(Debug, Clone)]
pub struct PatientFields {
    pub clinic_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
}

/// Filter for searching patients
#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    pub clinic_id: Option<String>,
    /// Matches name, phone or UHID
    pub query: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

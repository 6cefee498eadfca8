use serde::{Deserialize, Serialize};

/// Storage model for a clinic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicRecord {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Health Facility Registry id under ABDM
    pub hfr_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable clinic columns
#[derive(Debug, Clone)]
pub struct ClinicFields {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hfr_id: Option<String>,
}

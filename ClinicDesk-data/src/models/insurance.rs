use serde::{Deserialize, Serialize};

/// Storage model for a patient's insurance policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePolicyRecord {
    pub id: String,
    pub patient_id: String,
    pub provider_name: String,
    pub policy_number: String,
    pub valid_from: String,
    pub valid_until: String,
    pub coverage_amount: Option<f64>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable policy columns
#[derive(Debug, Clone)]
pub struct InsurancePolicyFields {
    pub patient_id: String,
    pub provider_name: String,
    pub policy_number: String,
    pub valid_from: String,
    pub valid_until: String,
    pub coverage_amount: Option<f64>,
    pub status: String,
}

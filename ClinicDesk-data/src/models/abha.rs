use serde::{Deserialize, Serialize};

/// Storage model for an ABHA OTP session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbhaSessionRecord {
    pub id: String,
    pub patient_id: Option<String>,
    /// `registration` or `login`
    pub flow: String,
    /// `aadhaar`, `abha_number` or `mobile`
    pub login_hint: String,
    /// Transaction id issued by ABDM when the OTP was sent
    pub txn_id: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub expires_at: String,
}

/// Input data for opening an ABHA session
#[derive(Debug, Clone)]
pub struct NewAbhaSession {
    pub patient_id: Option<String>,
    pub flow: String,
    pub login_hint: String,
    pub expires_at: String,
}

/// Storage model for an ABHA account linked to a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbhaAccountRecord {
    pub id: String,
    pub patient_id: Option<String>,
    pub abha_number: String,
    pub abha_address: Option<String>,
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile: Option<String>,
    pub kyc_verified: bool,
    pub linked_at: String,
    pub updated_at: String,
}

/// Account details returned by ABDM, keyed by ABHA number on upsert
#[derive(Debug, Clone)]
pub struct AbhaAccountFields {
    pub patient_id: Option<String>,
    pub abha_number: String,
    pub abha_address: Option<String>,
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile: Option<String>,
    pub kyc_verified: bool,
}

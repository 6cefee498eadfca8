use serde::{Deserialize, Serialize};

/// Storage model for an outgoing referral
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRecord {
    pub id: String,
    pub clinic_id: String,
    pub patient_id: String,
    pub referring_doctor_id: String,
    pub referred_to_name: String,
    pub referred_to_specialty: Option<String>,
    pub referred_to_facility: Option<String>,
    pub reason: String,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable referral columns
#[derive(Debug, Clone)]
pub struct ReferralFields {
    pub clinic_id: String,
    pub patient_id: String,
    pub referring_doctor_id: String,
    pub referred_to_name: String,
    pub referred_to_specialty: Option<String>,
    pub referred_to_facility: Option<String>,
    pub reason: String,
    pub status: String,
    pub notes: Option<String>,
}

/// Filter for listing referrals
#[derive(Debug, Clone, Default)]
pub struct ReferralFilter {
    pub clinic_id: Option<String>,
    pub patient_id: Option<String>,
    pub status: Option<String>,
}

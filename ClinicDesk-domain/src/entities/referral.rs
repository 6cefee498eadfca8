use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Accepted => "accepted",
            ReferralStatus::Declined => "declined",
            ReferralStatus::Completed => "completed",
        }
    }

    pub fn can_transition_to(&self, next: ReferralStatus) -> bool {
        use ReferralStatus::*;
        matches!((self, next), (Pending, Accepted) | (Pending, Declined) | (Accepted, Completed))
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReferralStatus::Pending),
            "accepted" => Ok(ReferralStatus::Accepted),
            "declined" => Ok(ReferralStatus::Declined),
            "completed" => Ok(ReferralStatus::Completed),
            other => Err(format!("Unknown referral status: {}", other)),
        }
    }
}

/// A patient referred to another practitioner or facility
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Referral {
    pub id: String,

    pub clinic_id: String,

    pub patient_id: String,

    pub referring_doctor_id: String,

    pub referred_to_name: String,

    pub referred_to_specialty: Option<String>,

    pub referred_to_facility: Option<String>,

    pub reason: String,

    pub status: ReferralStatus,

    pub notes: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReferralRequest {
    #[validate(length(min = 1, message = "Clinic id is required"))]
    pub clinic_id: String,

    #[validate(length(min = 1, message = "Patient id is required"))]
    pub patient_id: String,

    #[validate(length(min = 1, message = "Referring doctor id is required"))]
    pub referring_doctor_id: String,

    #[validate(length(min = 1, max = 200, message = "Referred-to name must be between 1 and 200 characters"))]
    pub referred_to_name: String,

    #[validate(length(max = 100, message = "Specialty cannot exceed 100 characters"))]
    pub referred_to_specialty: Option<String>,

    #[validate(length(max = 200, message = "Facility cannot exceed 200 characters"))]
    pub referred_to_facility: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Reason must be between 1 and 2000 characters"))]
    pub reason: String,

    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
}

/// Request payload for updating a referral; a status change must follow the referral workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateReferralRequest {
    #[validate(length(min = 1, max = 200, message = "Referred-to name must be between 1 and 200 characters"))]
    pub referred_to_name: Option<String>,

    #[validate(length(max = 100, message = "Specialty cannot exceed 100 characters"))]
    pub referred_to_specialty: Option<String>,

    #[validate(length(max = 200, message = "Facility cannot exceed 200 characters"))]
    pub referred_to_facility: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Reason must be between 1 and 2000 characters"))]
    pub reason: Option<String>,

    pub status: Option<ReferralStatus>,

    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ReferralListQuery {
    pub clinic_id: Option<String>,

    pub patient_id: Option<String>,

    pub status: Option<ReferralStatus>,
}

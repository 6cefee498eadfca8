use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validators::validate_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Active,
    Expired,
    Cancelled,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PolicyStatus::Active),
            "expired" => Ok(PolicyStatus::Expired),
            "cancelled" => Ok(PolicyStatus::Cancelled),
            other => Err(format!("Unknown policy status: {}", other)),
        }
    }
}

/// A patient's health insurance policy
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InsurancePolicy {
    pub id: String,

    pub patient_id: String,

    pub provider_name: String,

    pub policy_number: String,

    /// `YYYY-MM-DD`, inclusive
    pub valid_from: String,

    /// `YYYY-MM-DD`, inclusive
    pub valid_until: String,

    pub coverage_amount: Option<f64>,

    pub status: PolicyStatus,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInsurancePolicyRequest {
    #[validate(length(min = 1, max = 200, message = "Provider name must be between 1 and 200 characters"))]
    pub provider_name: String,

    #[validate(length(min = 1, max = 100, message = "Policy number must be between 1 and 100 characters"))]
    pub policy_number: String,

    #[validate(custom = "validate_date")]
    pub valid_from: String,

    #[validate(custom = "validate_date")]
    pub valid_until: String,

    #[validate(range(min = 0.0, message = "Coverage amount cannot be negative"))]
    pub coverage_amount: Option<f64>,

    /// Defaults to `active`
    pub status: Option<PolicyStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInsurancePolicyRequest {
    #[validate(length(min = 1, max = 200, message = "Provider name must be between 1 and 200 characters"))]
    pub provider_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Policy number must be between 1 and 100 characters"))]
    pub policy_number: Option<String>,

    #[validate(custom = "validate_date")]
    pub valid_from: Option<String>,

    #[validate(custom = "validate_date")]
    pub valid_until: Option<String>,

    #[validate(range(min = 0.0, message = "Coverage amount cannot be negative"))]
    pub coverage_amount: Option<f64>,

    pub status: Option<PolicyStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
pub struct InsuranceQuery {
    /// Only policies active and valid on this date
    #[validate(custom = "validate_date")]
    pub active_on: Option<String>,
}

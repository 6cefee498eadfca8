//! ABHA (Ayushman Bharat Health Account) sessions and linked accounts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::validators::{validate_aadhaar, validate_otp, validate_phone};

/// Which ABDM flow a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AbhaFlow {
    /// Create a new ABHA from Aadhaar
    Registration,
    /// Verify an existing ABHA
    Login,
}

impl AbhaFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbhaFlow::Registration => "registration",
            AbhaFlow::Login => "login",
        }
    }
}

impl FromStr for AbhaFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(AbhaFlow::Registration),
            "login" => Ok(AbhaFlow::Login),
            other => Err(format!("Unknown ABHA flow: {}", other)),
        }
    }
}

/// OTP session state.
///
/// `pending -> otp_sent -> verified`, with `failed` on a gateway error and
/// `expired` once the OTP window has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AbhaSessionStatus {
    Pending,
    OtpSent,
    Verified,
    Failed,
    Expired,
}

impl AbhaSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbhaSessionStatus::Pending => "pending",
            AbhaSessionStatus::OtpSent => "otp_sent",
            AbhaSessionStatus::Verified => "verified",
            AbhaSessionStatus::Failed => "failed",
            AbhaSessionStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for AbhaSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbhaSessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AbhaSessionStatus::Pending),
            "otp_sent" => Ok(AbhaSessionStatus::OtpSent),
            "verified" => Ok(AbhaSessionStatus::Verified),
            "failed" => Ok(AbhaSessionStatus::Failed),
            "expired" => Ok(AbhaSessionStatus::Expired),
            other => Err(format!("Unknown ABHA session status: {}", other)),
        }
    }
}

/// Identifier an existing ABHA holder logs in with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoginHint {
    AbhaNumber,
    Mobile,
}

impl LoginHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginHint::AbhaNumber => "abha_number",
            LoginHint::Mobile => "mobile",
        }
    }
}

/// Start ABHA creation for a patient by sending an OTP to the Aadhaar-linked mobile
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegistrationOtpRequest {
    #[validate(length(min = 1, message = "Patient id is required"))]
    pub patient_id: String,

    /// 12 digit Aadhaar number
    #[validate(custom = "validate_aadhaar")]
    pub aadhaar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegistrationVerifyRequest {
    #[validate(length(min = 1, message = "Session id is required"))]
    pub session_id: String,

    #[validate(custom = "validate_otp")]
    pub otp: String,

    /// Mobile number to record on the new ABHA
    #[validate(custom = "validate_phone")]
    pub mobile: Option<String>,
}

/// Start verification of an existing ABHA
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginOtpRequest {
    /// Patient to link the verified ABHA to
    pub patient_id: Option<String>,

    pub login_hint: LoginHint,

    /// ABHA number (`XX-XXXX-XXXX-XXXX` or 14 digits) or mobile number
    #[validate(length(min = 1, max = 20, message = "Login value must be between 1 and 20 characters"))]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginVerifyRequest {
    #[validate(length(min = 1, message = "Session id is required"))]
    pub session_id: String,

    #[validate(custom = "validate_otp")]
    pub otp: String,
}

/// Returned once ABDM has sent the OTP
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OtpSentResponse {
    pub session_id: String,

    pub status: AbhaSessionStatus,

    /// OTP must be verified before this instant (RFC 3339)
    pub expires_at: String,

    /// Message from ABDM, e.g. where the OTP was sent
    pub message: Option<String>,
}

/// An ABHA known to the clinic
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AbhaAccount {
    pub id: String,

    /// Linked patient, if any
    pub patient_id: Option<String>,

    /// 14 digit ABHA number, `XX-XXXX-XXXX-XXXX`
    pub abha_number: String,

    /// e.g. `name@abdm`
    pub abha_address: Option<String>,

    pub full_name: Option<String>,

    pub gender: Option<String>,

    pub date_of_birth: Option<String>,

    pub mobile: Option<String>,

    /// Whether identity was verified through Aadhaar e-KYC
    pub kyc_verified: bool,

    pub linked_at: String,

    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AbhaVerifyResponse {
    pub session_id: String,

    pub status: AbhaSessionStatus,

    pub account: AbhaAccount,
}

/// Normalise an ABHA number to `XX-XXXX-XXXX-XXXX`; `None` unless it has exactly 14 digits
pub fn normalize_abha_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();
    if digits.len() != 14 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}-{}", &digits[0..2], &digits[2..6], &digits[6..10], &digits[10..14]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_abha_number() {
        assert_eq!(normalize_abha_number("91123456789012").as_deref(), Some("91-1234-5678-9012"));
        assert_eq!(normalize_abha_number("91-1234-5678-9012").as_deref(), Some("91-1234-5678-9012"));
        assert_eq!(normalize_abha_number("91-1234-5678"), None);
        assert_eq!(normalize_abha_number("9a123456789012"), None);
    }

    #[test]
    fn test_session_status_round_trip() {
        for status in [
            AbhaSessionStatus::Pending,
            AbhaSessionStatus::OtpSent,
            AbhaSessionStatus::Verified,
            AbhaSessionStatus::Failed,
            AbhaSessionStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<AbhaSessionStatus>().unwrap(), status);
        }
    }
}

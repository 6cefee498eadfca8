//! Client side of the ABDM (Ayushman Bharat Digital Mission) ABHA APIs
//!
//! [`AbhaGateway`] is the seam the ABHA service talks to. [`AbdmClient`] is the
//! HTTP implementation; tests substitute `MockAbhaGateway`.

mod client;

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::abha::LoginHint;

pub use client::{AbdmClient, AbdmConfig};

/// Errors talking to ABDM
#[derive(Debug, Error)]
pub enum AbdmError {
    /// Missing or invalid ABDM settings
    #[error("ABDM configuration error: {0}")]
    Config(String),

    /// The request never got a response
    #[error("ABDM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// ABDM answered with an error status
    #[error("ABDM returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// ABDM answered 2xx but the body was not what we expected
    #[error("Unexpected ABDM response: {0}")]
    InvalidResponse(String),
}

/// An OTP has been sent; `txn_id` identifies the exchange in the follow-up call
#[derive(Debug, Clone, PartialEq)]
pub struct OtpChallenge {
    pub txn_id: String,
    pub message: Option<String>,
}

/// ABHA details returned once an OTP is verified
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbhaProfile {
    /// As sent by ABDM; normalised by the caller
    pub abha_number: String,
    pub abha_address: Option<String>,
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile: Option<String>,
    pub kyc_verified: bool,
}

/// Operations the clinic needs from ABDM
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait AbhaGateway: Send + Sync {
    /// Send an OTP to the mobile linked with an Aadhaar number
    async fn request_enrollment_otp(&self, aadhaar: &str) -> Result<OtpChallenge, AbdmError>;

    /// Create (or fetch) the ABHA for the Aadhaar holder who received the OTP
    async fn enrol_by_aadhaar(&self, txn_id: &str, otp: &str, mobile: Option<String>)
        -> Result<AbhaProfile, AbdmError>;

    /// Send a login OTP for an existing ABHA
    async fn request_login_otp(&self, hint: LoginHint, value: &str) -> Result<OtpChallenge, AbdmError>;

    async fn verify_login_otp(&self, txn_id: &str, otp: &str) -> Result<AbhaProfile, AbdmError>;
}

/// Stand-in used when ABDM credentials are not configured; every call fails with the reason
#[derive(Debug, Clone)]
pub struct DisabledGateway {
    reason: String,
}

impl DisabledGateway {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn error(&self) -> AbdmError {
        AbdmError::Config(self.reason.clone())
    }
}

#[async_trait]
impl AbhaGateway for DisabledGateway {
    async fn request_enrollment_otp(&self, _aadhaar: &str) -> Result<OtpChallenge, AbdmError> {
        Err(self.error())
    }

    async fn enrol_by_aadhaar(
        &self,
        _txn_id: &str,
        _otp: &str,
        _mobile: Option<String>,
    ) -> Result<AbhaProfile, AbdmError> {
        Err(self.error())
    }

    async fn request_login_otp(&self, _hint: LoginHint, _value: &str) -> Result<OtpChallenge, AbdmError> {
        Err(self.error())
    }

    async fn verify_login_otp(&self, _txn_id: &str, _otp: &str) -> Result<AbhaProfile, AbdmError> {
        Err(self.error())
    }
}

//! ABHA creation and verification through ABDM OTP sessions

use std::env;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::{error, info, warn};

use clinic_desk_data::models::abha::{AbhaAccountFields, AbhaSessionRecord, NewAbhaSession};
use clinic_desk_data::repository::{AbhaRepositoryTrait, PatientRepositoryTrait};

use super::{validate_request, ServiceError};
use crate::abdm::{AbdmError, AbhaGateway, AbhaProfile, OtpChallenge};
use crate::entities::abha::{
    normalize_abha_number, AbhaAccount, AbhaFlow, AbhaSessionStatus, AbhaVerifyResponse, LoginHint, LoginOtpRequest,
    LoginVerifyRequest, OtpSentResponse, RegistrationOtpRequest, RegistrationVerifyRequest,
};
use crate::entities::conversions::convert_to_domain_abha_account;
use crate::entities::validators::validate_phone;

pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;

#[async_trait]
pub trait AbhaServiceTrait: Send + Sync {
    async fn request_registration_otp(&self, request: RegistrationOtpRequest)
        -> Result<OtpSentResponse, ServiceError>;

    async fn verify_registration(&self, request: RegistrationVerifyRequest)
        -> Result<AbhaVerifyResponse, ServiceError>;

    async fn request_login_otp(&self, request: LoginOtpRequest) -> Result<OtpSentResponse, ServiceError>;

    async fn verify_login(&self, request: LoginVerifyRequest) -> Result<AbhaVerifyResponse, ServiceError>;

    /// ABHA linked to a patient
    async fn get_account(&self, patient_id: &str) -> Result<AbhaAccount, ServiceError>;

    async fn unlink(&self, patient_id: &str) -> Result<(), ServiceError>;
}

pub struct AbhaService<R: AbhaRepositoryTrait, P: PatientRepositoryTrait, G: AbhaGateway> {
    repository: R,
    patients: P,
    gateway: G,
    otp_ttl: Duration,
}

impl<R: AbhaRepositoryTrait, P: PatientRepositoryTrait, G: AbhaGateway> AbhaService<R, P, G> {
    /// OTP lifetime comes from `ABHA_OTP_TTL_MINUTES`
    pub fn new(repository: R, patients: P, gateway: G) -> Self {
        let minutes = env::var("ABHA_OTP_TTL_MINUTES")
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_OTP_TTL_MINUTES);

        Self {
            repository,
            patients,
            gateway,
            otp_ttl: Duration::minutes(minutes),
        }
    }

    pub fn with_otp_ttl(mut self, ttl: Duration) -> Self {
        self.otp_ttl = ttl;
        self
    }

    async fn ensure_patient(&self, patient_id: &str) -> Result<(), ServiceError> {
        match self.patients.get_by_id(patient_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!("Patient {} not found", patient_id))),
        }
    }

    /// Open a session, ask ABDM for the OTP, and record the transaction
    async fn start_session<F>(
        &self,
        patient_id: Option<String>,
        flow: AbhaFlow,
        login_hint: &str,
        send_otp: F,
    ) -> Result<OtpSentResponse, ServiceError>
    where
        F: std::future::Future<Output = Result<OtpChallenge, AbdmError>> + Send,
    {
        let expires_at = (Utc::now() + self.otp_ttl).to_rfc3339_opts(SecondsFormat::Millis, true);
        let session = self
            .repository
            .create_session(NewAbhaSession {
                patient_id,
                flow: flow.as_str().to_string(),
                login_hint: login_hint.to_string(),
                expires_at,
            })
            .await?;

        let challenge = match send_otp.await {
            Ok(challenge) => challenge,
            Err(e) => return Err(self.fail(&session.id, e).await),
        };

        let session = self.repository.mark_otp_sent(&session.id, &challenge.txn_id).await?;
        info!("ABHA {} OTP sent for session {}", flow.as_str(), session.id);

        let status = session_status(&session)?;
        Ok(OtpSentResponse {
            session_id: session.id,
            status,
            expires_at: session.expires_at,
            message: challenge.message,
        })
    }

    /// Load a session that is waiting for its OTP, expiring it when the window has passed
    async fn open_session(&self, session_id: &str, flow: AbhaFlow) -> Result<(AbhaSessionRecord, String), ServiceError> {
        let session = self
            .repository
            .get_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("ABHA session {} not found", session_id)))?;

        if session.flow != flow.as_str() {
            return Err(ServiceError::InvalidState(format!(
                "Session {} belongs to the {} flow",
                session.id, session.flow
            )));
        }

        let status = session_status(&session)?;
        if status != AbhaSessionStatus::OtpSent {
            return Err(ServiceError::InvalidState(format!(
                "Session {} is {}, expected otp_sent",
                session.id, status
            )));
        }

        let expires_at = DateTime::parse_from_rfc3339(&session.expires_at).map_err(|e| {
            error!("Session {} has unreadable expiry {}: {}", session.id, session.expires_at, e);
            ServiceError::Internal(format!("Invalid session expiry: {}", e))
        })?;
        if expires_at.with_timezone(&Utc) <= Utc::now() {
            self.repository
                .set_session_status(&session.id, AbhaSessionStatus::Expired.as_str(), Some("OTP expired".to_string()))
                .await?;
            warn!("ABHA session {} expired before verification", session.id);
            return Err(ServiceError::Expired(format!("ABHA session {} has expired", session.id)));
        }

        let txn_id = session
            .txn_id
            .clone()
            .ok_or_else(|| ServiceError::Internal(format!("Session {} has no transaction id", session.id)))?;
        Ok((session, txn_id))
    }

    /// Store the verified profile and link it to the session's patient
    async fn finish_session(
        &self,
        session: AbhaSessionRecord,
        profile: Result<AbhaProfile, AbdmError>,
    ) -> Result<AbhaVerifyResponse, ServiceError> {
        let profile = match profile {
            Ok(profile) => profile,
            Err(e) => return Err(self.fail(&session.id, e).await),
        };

        let abha_number = match normalize_abha_number(&profile.abha_number) {
            Some(number) => number,
            None => {
                let e = AbdmError::InvalidResponse(format!("Malformed ABHA number {:?}", profile.abha_number));
                return Err(self.fail(&session.id, e).await);
            }
        };

        let account = self
            .repository
            .complete_verification(
                &session.id,
                AbhaAccountFields {
                    patient_id: session.patient_id.clone(),
                    abha_number,
                    abha_address: profile.abha_address,
                    full_name: profile.full_name,
                    gender: profile.gender,
                    date_of_birth: profile.date_of_birth,
                    mobile: profile.mobile,
                    kyc_verified: profile.kyc_verified,
                },
            )
            .await?;
        info!("ABHA {} verified in session {}", account.abha_number, session.id);

        Ok(AbhaVerifyResponse {
            session_id: session.id,
            status: AbhaSessionStatus::Verified,
            account: convert_to_domain_abha_account(account),
        })
    }

    /// Mark the session failed and turn the gateway error into a service error
    async fn fail(&self, session_id: &str, err: AbdmError) -> ServiceError {
        error!("ABDM call failed for session {}: {}", session_id, err);
        if let Err(e) = self
            .repository
            .set_session_status(session_id, AbhaSessionStatus::Failed.as_str(), Some(err.to_string()))
            .await
        {
            error!("Could not mark session {} failed: {}", session_id, e);
        }
        ServiceError::Gateway(err.to_string())
    }
}

fn session_status(session: &AbhaSessionRecord) -> Result<AbhaSessionStatus, ServiceError> {
    AbhaSessionStatus::from_str(&session.status).map_err(ServiceError::Internal)
}

#[async_trait]
impl<R: AbhaRepositoryTrait, P: PatientRepositoryTrait, G: AbhaGateway> AbhaServiceTrait for AbhaService<R, P, G> {
    async fn request_registration_otp(
        &self,
        request: RegistrationOtpRequest,
    ) -> Result<OtpSentResponse, ServiceError> {
        validate_request(&request)?;
        self.ensure_patient(&request.patient_id).await?;

        let aadhaar = request.aadhaar.clone();
        self.start_session(
            Some(request.patient_id),
            AbhaFlow::Registration,
            "aadhaar",
            self.gateway.request_enrollment_otp(&aadhaar),
        )
        .await
    }

    async fn verify_registration(
        &self,
        request: RegistrationVerifyRequest,
    ) -> Result<AbhaVerifyResponse, ServiceError> {
        validate_request(&request)?;
        let (session, txn_id) = self.open_session(&request.session_id, AbhaFlow::Registration).await?;

        let profile = self.gateway.enrol_by_aadhaar(&txn_id, &request.otp, request.mobile).await;
        self.finish_session(session, profile).await
    }

    async fn request_login_otp(&self, request: LoginOtpRequest) -> Result<OtpSentResponse, ServiceError> {
        validate_request(&request)?;
        if let Some(patient_id) = &request.patient_id {
            self.ensure_patient(patient_id).await?;
        }

        let value = match request.login_hint {
            LoginHint::AbhaNumber => normalize_abha_number(&request.value).ok_or_else(|| {
                ServiceError::Validation("value: ABHA number must have 14 digits".to_string())
            })?,
            LoginHint::Mobile => {
                let mobile = request.value.trim().to_string();
                validate_phone(&mobile)
                    .map_err(|_| ServiceError::Validation("value: Invalid mobile number".to_string()))?;
                mobile
            }
        };

        self.start_session(
            request.patient_id,
            AbhaFlow::Login,
            request.login_hint.as_str(),
            self.gateway.request_login_otp(request.login_hint, &value),
        )
        .await
    }

    async fn verify_login(&self, request: LoginVerifyRequest) -> Result<AbhaVerifyResponse, ServiceError> {
        validate_request(&request)?;
        let (session, txn_id) = self.open_session(&request.session_id, AbhaFlow::Login).await?;

        let profile = self.gateway.verify_login_otp(&txn_id, &request.otp).await;
        self.finish_session(session, profile).await
    }

    async fn get_account(&self, patient_id: &str) -> Result<AbhaAccount, ServiceError> {
        let record = self
            .repository
            .get_account_by_patient(patient_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No ABHA linked to patient {}", patient_id)))?;
        Ok(convert_to_domain_abha_account(record))
    }

    async fn unlink(&self, patient_id: &str) -> Result<(), ServiceError> {
        if !self.repository.unlink(patient_id).await? {
            return Err(ServiceError::NotFound(format!("No ABHA linked to patient {}", patient_id)));
        }
        info!("Unlinked ABHA from patient {}", patient_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abdm::MockAbhaGateway;
    use crate::services::test_support::Fixture;
    use clinic_desk_data::repository::{AbhaRepository, PatientRepository};
    use mockall::predicate::eq;

    type Service = AbhaService<AbhaRepository, PatientRepository, MockAbhaGateway>;

    fn service(fixture: &Fixture, gateway: MockAbhaGateway) -> Service {
        AbhaService::new(
            AbhaRepository::new(fixture.pool.clone()),
            PatientRepository::new(fixture.pool.clone()),
            gateway,
        )
        .with_otp_ttl(Duration::minutes(10))
    }

    fn profile() -> AbhaProfile {
        AbhaProfile {
            abha_number: "91123456789012".to_string(),
            abha_address: Some("arjun.rao@sbx".to_string()),
            full_name: Some("Arjun Rao".to_string()),
            gender: Some("M".to_string()),
            date_of_birth: Some("01-05-1990".to_string()),
            mobile: Some("9876543210".to_string()),
            kyc_verified: true,
        }
    }

    fn challenge(txn_id: &str) -> OtpChallenge {
        OtpChallenge {
            txn_id: txn_id.to_string(),
            message: Some("OTP sent".to_string()),
        }
    }

    fn registration(fixture: &Fixture) -> RegistrationOtpRequest {
        RegistrationOtpRequest {
            patient_id: fixture.patient_id.clone(),
            aadhaar: "234567890123".to_string(),
        }
    }

    async fn session_of(fixture: &Fixture, id: &str) -> AbhaSessionRecord {
        AbhaRepository::new(fixture.pool.clone())
            .get_session(id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_registration_flow_links_patient() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway
            .expect_request_enrollment_otp()
            .with(eq("234567890123"))
            .times(1)
            .returning(|_| Ok(challenge("txn-1")));
        gateway
            .expect_enrol_by_aadhaar()
            .withf(|txn, otp, _| txn == "txn-1" && otp == "123456")
            .times(1)
            .returning(|_, _, _| Ok(profile()));
        let service = service(&fixture, gateway);

        let sent = service.request_registration_otp(registration(&fixture)).await.unwrap();
        assert_eq!(sent.status, AbhaSessionStatus::OtpSent);
        assert_eq!(sent.message.as_deref(), Some("OTP sent"));

        let verified = service
            .verify_registration(RegistrationVerifyRequest {
                session_id: sent.session_id.clone(),
                otp: "123456".to_string(),
                mobile: None,
            })
            .await
            .unwrap();
        assert_eq!(verified.status, AbhaSessionStatus::Verified);
        assert_eq!(verified.account.abha_number, "91-1234-5678-9012");
        assert_eq!(verified.account.patient_id.as_deref(), Some(fixture.patient_id.as_str()));

        let patient = PatientRepository::new(fixture.pool.clone())
            .get_by_id(&fixture.patient_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patient.abha_number.as_deref(), Some("91-1234-5678-9012"));

        let account = service.get_account(&fixture.patient_id).await.unwrap();
        assert_eq!(account.abha_address.as_deref(), Some("arjun.rao@sbx"));
    }

    #[tokio::test]
    async fn test_registration_for_unknown_patient() {
        let fixture = Fixture::new().await;
        let service = service(&fixture, MockAbhaGateway::new());

        let err = service
            .request_registration_otp(RegistrationOtpRequest {
                patient_id: "missing".to_string(),
                aadhaar: "234567890123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_gateway_failure_marks_session_failed() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway.expect_request_enrollment_otp().returning(|_| {
            Err(AbdmError::Upstream {
                status: 500,
                message: "Service unavailable".to_string(),
            })
        });
        let service = service(&fixture, gateway);

        let err = service.request_registration_otp(registration(&fixture)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Gateway(_)));

        let conn = fixture.pool.get().unwrap();
        let (status, error): (String, Option<String>) = conn
            .query_row("SELECT status, error FROM abha_sessions", [], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        assert_eq!(status, "failed");
        assert!(error.unwrap().contains("Service unavailable"));
    }

    #[tokio::test]
    async fn test_failed_enrolment_cannot_be_retried() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway
            .expect_request_enrollment_otp()
            .returning(|_| Ok(challenge("txn-2")));
        gateway.expect_enrol_by_aadhaar().times(1).returning(|_, _, _| {
            Err(AbdmError::Upstream {
                status: 400,
                message: "Invalid OTP value".to_string(),
            })
        });
        let service = service(&fixture, gateway);

        let sent = service.request_registration_otp(registration(&fixture)).await.unwrap();
        let verify = RegistrationVerifyRequest {
            session_id: sent.session_id.clone(),
            otp: "000000".to_string(),
            mobile: None,
        };

        let err = service.verify_registration(verify.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Gateway(_)));
        assert_eq!(session_of(&fixture, &sent.session_id).await.status, "failed");

        let err = service.verify_registration(verify).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_expired_session() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway
            .expect_request_enrollment_otp()
            .returning(|_| Ok(challenge("txn-3")));
        gateway.expect_enrol_by_aadhaar().never();
        let service = service(&fixture, gateway).with_otp_ttl(Duration::seconds(-1));

        let sent = service.request_registration_otp(registration(&fixture)).await.unwrap();
        let err = service
            .verify_registration(RegistrationVerifyRequest {
                session_id: sent.session_id.clone(),
                otp: "123456".to_string(),
                mobile: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Expired(_)));
        assert_eq!(session_of(&fixture, &sent.session_id).await.status, "expired");
    }

    #[tokio::test]
    async fn test_session_flow_must_match() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway
            .expect_request_enrollment_otp()
            .returning(|_| Ok(challenge("txn-4")));
        gateway.expect_verify_login_otp().never();
        let service = service(&fixture, gateway);

        let sent = service.request_registration_otp(registration(&fixture)).await.unwrap();
        let err = service
            .verify_login(LoginVerifyRequest {
                session_id: sent.session_id,
                otp: "123456".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_login_by_abha_number_normalises_value() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway
            .expect_request_login_otp()
            .withf(|hint, value| *hint == LoginHint::AbhaNumber && value == "91-1234-5678-9012")
            .times(1)
            .returning(|_, _| Ok(challenge("txn-login")));
        gateway
            .expect_verify_login_otp()
            .with(eq("txn-login"), eq("654321"))
            .returning(|_, _| Ok(profile()));
        let service = service(&fixture, gateway);

        let sent = service
            .request_login_otp(LoginOtpRequest {
                patient_id: None,
                login_hint: LoginHint::AbhaNumber,
                value: "91123456789012".to_string(),
            })
            .await
            .unwrap();

        let verified = service
            .verify_login(LoginVerifyRequest {
                session_id: sent.session_id,
                otp: "654321".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(verified.account.patient_id, None);
        assert!(verified.account.kyc_verified);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_values() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway.expect_request_login_otp().never();
        let service = service(&fixture, gateway);

        let err = service
            .request_login_otp(LoginOtpRequest {
                patient_id: None,
                login_hint: LoginHint::AbhaNumber,
                value: "91-1234".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .request_login_otp(LoginOtpRequest {
                patient_id: None,
                login_hint: LoginHint::Mobile,
                value: "12ab".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_malformed_abha_number_fails_session() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway
            .expect_request_login_otp()
            .returning(|_, _| Ok(challenge("txn-5")));
        gateway.expect_verify_login_otp().returning(|_, _| {
            Ok(AbhaProfile {
                abha_number: "12-34".to_string(),
                ..AbhaProfile::default()
            })
        });
        let service = service(&fixture, gateway);

        let sent = service
            .request_login_otp(LoginOtpRequest {
                patient_id: Some(fixture.patient_id.clone()),
                login_hint: LoginHint::Mobile,
                value: "9876543210".to_string(),
            })
            .await
            .unwrap();
        let err = service
            .verify_login(LoginVerifyRequest {
                session_id: sent.session_id.clone(),
                otp: "123456".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Gateway(_)));
        assert_eq!(session_of(&fixture, &sent.session_id).await.status, "failed");
    }

    #[tokio::test]
    async fn test_unlink() {
        let fixture = Fixture::new().await;
        let mut gateway = MockAbhaGateway::new();
        gateway
            .expect_request_enrollment_otp()
            .returning(|_| Ok(challenge("txn-6")));
        gateway.expect_enrol_by_aadhaar().returning(|_, _, _| Ok(profile()));
        let service = service(&fixture, gateway);

        assert!(matches!(
            service.unlink(&fixture.patient_id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));

        let sent = service.request_registration_otp(registration(&fixture)).await.unwrap();
        service
            .verify_registration(RegistrationVerifyRequest {
                session_id: sent.session_id,
                otp: "123456".to_string(),
                mobile: None,
            })
            .await
            .unwrap();

        service.unlink(&fixture.patient_id).await.unwrap();
        assert!(matches!(
            service.get_account(&fixture.patient_id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}

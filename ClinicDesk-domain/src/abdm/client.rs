use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{AbdmError, AbhaGateway, AbhaProfile, OtpChallenge};
use crate::entities::abha::LoginHint;

/// Refresh the gateway token this long before ABDM says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Connection settings for ABDM
#[derive(Debug, Clone)]
pub struct AbdmConfig {
    /// ABHA API root, e.g. `https://abhasbx.abdm.gov.in/abha/api`
    pub base_url: String,
    /// Gateway root used for session tokens, e.g. `https://dev.abdm.gov.in`
    pub gateway_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

impl AbdmConfig {
    /// Read `ABDM_BASE_URL`, `ABDM_GATEWAY_URL`, `ABDM_CLIENT_ID` and `ABDM_CLIENT_SECRET`
    pub fn from_env() -> Result<Self, AbdmError> {
        let required = |name: &str| {
            env::var(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AbdmError::Config(format!("{} must be set", name)))
        };

        Ok(Self {
            base_url: required("ABDM_BASE_URL")?.trim_end_matches('/').to_string(),
            gateway_url: required("ABDM_GATEWAY_URL")?.trim_end_matches('/').to_string(),
            client_id: required("ABDM_CLIENT_ID")?,
            client_secret: required("ABDM_CLIENT_SECRET")?,
            timeout: Duration::from_secs(30),
        })
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// HTTP client for the ABDM ABHA v3 APIs
pub struct AbdmClient {
    config: AbdmConfig,
    client: Client,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    access_token: String,
    /// Seconds
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpResponse {
    txn_id: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize, Default)]
struct EnrolProfile {
    #[serde(rename = "ABHANumber")]
    abha_number: Option<String>,
    #[serde(rename = "phrAddress", default)]
    phr_address: Vec<String>,
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "middleName")]
    middle_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    gender: Option<String>,
    dob: Option<String>,
    mobile: Option<String>,
}

#[derive(Deserialize)]
struct EnrolResponse {
    #[serde(rename = "ABHAProfile")]
    profile: Option<EnrolProfile>,
}

#[derive(Deserialize)]
struct LoginAccount {
    #[serde(rename = "ABHANumber")]
    abha_number: Option<String>,
    #[serde(rename = "preferredAbhaAddress")]
    preferred_abha_address: Option<String>,
    name: Option<String>,
    gender: Option<String>,
    dob: Option<String>,
    mobile: Option<String>,
    #[serde(rename = "kycVerified", default)]
    kyc_verified: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginVerifyResponse {
    auth_result: Option<String>,
    message: Option<String>,
    #[serde(default)]
    accounts: Vec<LoginAccount>,
}

impl AbdmClient {
    pub fn new(config: AbdmConfig) -> Result<Self, AbdmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
        })
    }

    pub fn from_env() -> Result<Self, AbdmError> {
        Self::new(AbdmConfig::from_env()?)
    }

    /// Gateway session token, fetched with client credentials and reused until shortly before expiry
    async fn access_token(&self) -> Result<String, AbdmError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cached = self.token.write().await;
        // Another request may have refreshed it while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.access_token.clone());
            }
        }

        let url = format!("{}/gateway/v0.5/sessions", self.config.gateway_url);
        debug!("Requesting ABDM session token from {}", url);
        let response = self
            .client
            .post(&url)
            .json(&SessionRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
            })
            .send()
            .await?;
        let session: SessionResponse = parse(response).await?;

        let lifetime = Duration::from_secs(session.expires_in.unwrap_or(600));
        *cached = Some(CachedToken {
            access_token: session.access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        info!("Obtained ABDM session token valid for {}s", lifetime.as_secs());
        Ok(session.access_token)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, AbdmError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.config.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("REQUEST-ID", Uuid::new_v4().to_string())
            .header("TIMESTAMP", chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .json(&body)
            .send()
            .await?;
        parse(response).await
    }
}

/// Turn an ABDM response into `T`, or into an `Upstream` error carrying ABDM's message
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, AbdmError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.pointer("/error/message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);
        warn!("ABDM returned {}: {}", status, message);
        return Err(AbdmError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<T>().await.map_err(|e| {
        error!("Failed to decode ABDM response: {}", e);
        AbdmError::InvalidResponse(e.to_string())
    })
}

fn challenge(response: OtpResponse) -> Result<OtpChallenge, AbdmError> {
    match response.txn_id {
        Some(txn_id) if !txn_id.is_empty() => Ok(OtpChallenge {
            txn_id,
            message: response.message,
        }),
        _ => Err(AbdmError::InvalidResponse("OTP response has no txnId".to_string())),
    }
}

fn join_name(parts: &[&Option<String>]) -> Option<String> {
    let name = parts
        .iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

#[async_trait]
impl AbhaGateway for AbdmClient {
    async fn request_enrollment_otp(&self, aadhaar: &str) -> Result<OtpChallenge, AbdmError> {
        let aadhaar: String = aadhaar.chars().filter(|c| !c.is_whitespace()).collect();
        let response: OtpResponse = self
            .post(
                "/v3/enrollment/request/otp",
                json!({
                    "scope": ["abha-enrol"],
                    "loginHint": "aadhaar",
                    "loginId": aadhaar,
                    "otpSystem": "aadhaar"
                }),
            )
            .await?;
        challenge(response)
    }

    async fn enrol_by_aadhaar(
        &self,
        txn_id: &str,
        otp: &str,
        mobile: Option<String>,
    ) -> Result<AbhaProfile, AbdmError> {
        let response: EnrolResponse = self
            .post(
                "/v3/enrollment/enrol/byAadhaar",
                json!({
                    "authData": {
                        "authMethods": ["otp"],
                        "otp": { "txnId": txn_id, "otpValue": otp, "mobile": mobile }
                    },
                    "consent": { "code": "abha-enrollment", "version": "1.4" }
                }),
            )
            .await?;

        let profile = response
            .profile
            .ok_or_else(|| AbdmError::InvalidResponse("Enrolment response has no ABHAProfile".to_string()))?;
        let abha_number = profile
            .abha_number
            .clone()
            .ok_or_else(|| AbdmError::InvalidResponse("Enrolment response has no ABHANumber".to_string()))?;

        Ok(AbhaProfile {
            abha_number,
            abha_address: profile.phr_address.first().cloned(),
            full_name: join_name(&[&profile.first_name, &profile.middle_name, &profile.last_name]),
            gender: profile.gender,
            date_of_birth: profile.dob,
            mobile: profile.mobile,
            // Aadhaar enrolment is e-KYC
            kyc_verified: true,
        })
    }

    async fn request_login_otp(&self, hint: LoginHint, value: &str) -> Result<OtpChallenge, AbdmError> {
        let (login_hint, scope, otp_system) = match hint {
            LoginHint::AbhaNumber => ("abha-number", "aadhaar-verify", "aadhaar"),
            LoginHint::Mobile => ("mobile", "mobile-verify", "abdm"),
        };
        let response: OtpResponse = self
            .post(
                "/v3/profile/login/request/otp",
                json!({
                    "scope": ["abha-login", scope],
                    "loginHint": login_hint,
                    "loginId": value,
                    "otpSystem": otp_system
                }),
            )
            .await?;
        challenge(response)
    }

    async fn verify_login_otp(&self, txn_id: &str, otp: &str) -> Result<AbhaProfile, AbdmError> {
        let response: LoginVerifyResponse = self
            .post(
                "/v3/profile/login/verify",
                json!({
                    "scope": ["abha-login"],
                    "authData": {
                        "authMethods": ["otp"],
                        "otp": { "txnId": txn_id, "otpValue": otp }
                    }
                }),
            )
            .await?;

        if response.auth_result.as_deref() != Some("success") {
            return Err(AbdmError::Upstream {
                status: 200,
                message: response.message.unwrap_or_else(|| "OTP verification failed".to_string()),
            });
        }

        let account = response
            .accounts
            .into_iter()
            .next()
            .ok_or_else(|| AbdmError::InvalidResponse("Login response lists no accounts".to_string()))?;
        let abha_number = account
            .abha_number
            .ok_or_else(|| AbdmError::InvalidResponse("Login account has no ABHANumber".to_string()))?;

        Ok(AbhaProfile {
            abha_number,
            abha_address: account.preferred_abha_address,
            full_name: account.name,
            gender: account.gender,
            date_of_birth: account.dob,
            mobile: account.mobile,
            kyc_verified: account.kyc_verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AbdmClient {
        AbdmClient::new(AbdmConfig {
            base_url: server.uri(),
            gateway_url: server.uri(),
            client_id: "SBX_CLINICDESK".to_string(),
            client_secret: "secret".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn mount_session(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/gateway/v0.5/sessions"))
            .and(body_partial_json(json!({ "clientId": "SBX_CLINICDESK" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "gateway-token",
                "expiresIn": 1200
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_enrollment_otp_reuses_session_token() {
        let server = MockServer::start().await;
        mount_session(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v3/enrollment/request/otp"))
            .and(header("authorization", "Bearer gateway-token"))
            .and(body_partial_json(json!({ "loginHint": "aadhaar", "loginId": "123456789012" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "txnId": "txn-1",
                "message": "OTP sent to Aadhaar registered mobile number ending with ******1234"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server);
        let first = client.request_enrollment_otp("1234 5678 9012").await.unwrap();
        assert_eq!(first.txn_id, "txn-1");
        assert!(first.message.unwrap().contains("1234"));

        client.request_enrollment_otp("123456789012").await.unwrap();
    }

    #[tokio::test]
    async fn test_enrol_maps_profile() {
        let server = MockServer::start().await;
        mount_session(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v3/enrollment/enrol/byAadhaar"))
            .and(body_partial_json(json!({ "authData": { "otp": { "txnId": "txn-1", "otpValue": "123456" } } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Account created successfully",
                "txnId": "txn-1",
                "ABHAProfile": {
                    "ABHANumber": "91-1234-5678-9012",
                    "phrAddress": ["asha.k@sbx"],
                    "firstName": "Asha",
                    "middleName": "",
                    "lastName": "Kulkarni",
                    "gender": "F",
                    "dob": "12-03-1992",
                    "mobile": "9876543210"
                },
                "isNew": true
            })))
            .mount(&server)
            .await;

        let profile = client(&server).enrol_by_aadhaar("txn-1", "123456", None).await.unwrap();
        assert_eq!(profile.abha_number, "91-1234-5678-9012");
        assert_eq!(profile.abha_address.as_deref(), Some("asha.k@sbx"));
        assert_eq!(profile.full_name.as_deref(), Some("Asha Kulkarni"));
        assert!(profile.kyc_verified);
    }

    #[tokio::test]
    async fn test_upstream_error_carries_message() {
        let server = MockServer::start().await;
        mount_session(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v3/enrollment/enrol/byAadhaar"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "ABDM-1204",
                "message": "Invalid OTP value"
            })))
            .mount(&server)
            .await;

        let err = client(&server).enrol_by_aadhaar("txn-1", "000000", None).await.unwrap_err();
        match err {
            AbdmError::Upstream { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid OTP value");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_flow() {
        let server = MockServer::start().await;
        mount_session(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v3/profile/login/request/otp"))
            .and(body_partial_json(json!({ "loginHint": "mobile", "loginId": "9876543210" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "txnId": "txn-login" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/profile/login/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authResult": "success",
                "accounts": [{
                    "ABHANumber": "91-1234-5678-9012",
                    "preferredAbhaAddress": "asha.k@sbx",
                    "name": "Asha Kulkarni",
                    "kycVerified": true
                }]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let otp = client.request_login_otp(LoginHint::Mobile, "9876543210").await.unwrap();
        assert_eq!(otp.txn_id, "txn-login");

        let profile = client.verify_login_otp(&otp.txn_id, "654321").await.unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Asha Kulkarni"));
        assert!(profile.kyc_verified);
    }

    #[tokio::test]
    async fn test_failed_login_verification() {
        let server = MockServer::start().await;
        mount_session(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v3/profile/login/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authResult": "failed",
                "message": "Entered OTP is incorrect"
            })))
            .mount(&server)
            .await;

        let err = client(&server).verify_login_otp("txn", "111111").await.unwrap_err();
        assert!(err.to_string().contains("Entered OTP is incorrect"));
    }

    #[tokio::test]
    async fn test_missing_txn_id_is_invalid_response() {
        let server = MockServer::start().await;
        mount_session(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v3/profile/login/request/otp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
            .mount(&server)
            .await;

        let err = client(&server)
            .request_login_otp(LoginHint::AbhaNumber, "91-1234-5678-9012")
            .await
            .unwrap_err();
        assert!(matches!(err, AbdmError::InvalidResponse(_)));
    }
}

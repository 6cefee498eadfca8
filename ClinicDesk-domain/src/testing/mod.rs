// Test doubles for crates that depend on the domain layer
// Only compiled with the "mock" feature

use std::collections::HashMap;

use async_trait::async_trait;

pub use crate::abdm::MockAbhaGateway;
use crate::abdm::{AbhaProfile, OtpChallenge};
use crate::health::{overall_status, ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth};

/// Health service with a fixed database status
#[derive(Debug, Clone)]
pub struct MockHealthService {
    database_status: ComponentStatus,
    components: HashMap<String, HealthComponent>,
}

impl Default for MockHealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthService {
    pub fn new() -> Self {
        Self {
            database_status: ComponentStatus::Healthy,
            components: HashMap::new(),
        }
    }

    pub fn with_degraded_database(mut self) -> Self {
        self.database_status = ComponentStatus::Degraded;
        self
    }

    pub fn with_unhealthy_database(mut self) -> Self {
        self.database_status = ComponentStatus::Unhealthy;
        self
    }

    /// Add a custom component with a specific status
    pub fn with_component(mut self, name: &str, status: ComponentStatus, details: Option<String>) -> Self {
        self.components
            .insert(name.to_string(), HealthComponent { status, details });
        self
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = self.components.clone();
        components.insert(
            "database".to_string(),
            HealthComponent {
                status: self.database_status,
                details: match self.database_status {
                    ComponentStatus::Healthy => None,
                    ComponentStatus::Degraded => Some("Database is experiencing high load".to_string()),
                    ComponentStatus::Unhealthy => Some("Database connection failed".to_string()),
                },
            },
        );

        SystemHealth {
            status: overall_status(components.values()),
            version: "test".to_string(),
            uptime_seconds: 0,
            components,
        }
    }
}

/// A gateway that sends every OTP successfully and verifies them all as the same ABHA
pub fn accepting_abha_gateway(abha_number: &str) -> MockAbhaGateway {
    let abha_number = abha_number.to_string();
    let profile = AbhaProfile {
        abha_number,
        abha_address: Some("test.patient@sbx".to_string()),
        full_name: Some("Test Patient".to_string()),
        gender: Some("F".to_string()),
        date_of_birth: None,
        mobile: None,
        kyc_verified: true,
    };

    let mut gateway = MockAbhaGateway::new();
    gateway.expect_request_enrollment_otp().returning(|_| {
        Ok(OtpChallenge {
            txn_id: "txn-enrol".to_string(),
            message: Some("OTP sent".to_string()),
        })
    });
    gateway.expect_request_login_otp().returning(|_, _| {
        Ok(OtpChallenge {
            txn_id: "txn-login".to_string(),
            message: None,
        })
    });
    let enrolled = profile.clone();
    gateway
        .expect_enrol_by_aadhaar()
        .returning(move |_, _, _| Ok(enrolled.clone()));
    gateway
        .expect_verify_login_otp()
        .returning(move |_, _| Ok(profile.clone()));
    gateway
}

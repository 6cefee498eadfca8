#![allow(dead_code)]

use std::sync::{Arc, Once};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use clinic_desk_api::api::{create_application, AppState};
use clinic_desk_data::database::DatabasePool;
use clinic_desk_domain::health::HealthServiceTrait;
use clinic_desk_domain::services::UploadSettings;
use clinic_desk_domain::testing::accepting_abha_gateway;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password-1";
pub const TEST_ABHA_NUMBER: &str = "91-1234-5678-9012";

static INIT: Once = Once::new();

fn initialize() {
    INIT.call_once(|| {
        std::env::set_var("JWT_SECRET", "api_test_secret_key");
        std::env::remove_var("JWT_ISSUER");
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Router over a private in-memory database with a bootstrapped admin
pub struct TestApp {
    router: Router,
    pub admin_token: String,
    pub uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_health_service(health: Arc<dyn HealthServiceTrait>) -> Self {
        Self::build(Some(health)).await
    }

    async fn build(health: Option<Arc<dyn HealthServiceTrait>>) -> Self {
        initialize();

        let uploads = tempfile::tempdir().unwrap();
        let settings = UploadSettings {
            upload_dir: uploads.path().to_path_buf(),
            max_upload_bytes: 256 * 1024,
            ..UploadSettings::default()
        };

        let pool = DatabasePool::in_memory().unwrap();
        let mut state = AppState::new(pool, settings, accepting_abha_gateway(TEST_ABHA_NUMBER));
        if let Some(health) = health {
            state = state.with_health_service(health);
        }
        assert!(state.users.ensure_admin(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap());

        let router = create_application(state, None);
        let mut app = Self {
            router,
            admin_token: String::new(),
            uploads,
        };
        app.admin_token = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        app
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(&self.admin_token), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(&self.admin_token), Some(body)).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Create a staff account through the admin API and log it in
    pub async fn staff_token(&self, username: &str, role: &str, doctor_id: Option<&str>) -> String {
        let (status, body) = self
            .post(
                "/api/v1/users",
                json!({
                    "username": username,
                    "password": "staff-password-1",
                    "full_name": format!("{} user", role),
                    "role": role,
                    "doctor_id": doctor_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {}", body);
        self.login(username, "staff-password-1").await
    }

    pub async fn create_clinic(&self, name: &str) -> String {
        let (status, body) = self.post("/api/v1/clinics", json!({ "name": name, "phone": "9820012345" })).await;
        assert_eq!(status, StatusCode::CREATED, "create clinic failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn create_doctor(&self, clinic_id: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/doctors",
                json!({ "clinic_id": clinic_id, "name": name, "specialization": "General Medicine" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create doctor failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn register_patient(&self, clinic_id: &str, first_name: &str, phone: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/patients",
                json!({
                    "clinic_id": clinic_id,
                    "first_name": first_name,
                    "last_name": "Sharma",
                    "gender": "female",
                    "date_of_birth": "1988-04-12",
                    "phone": phone,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register patient failed: {}", body);
        body
    }
}

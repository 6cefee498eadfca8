mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, TEST_ABHA_NUMBER};

// A Monday
const CLINIC_DAY: &str = "2030-01-07";

#[tokio::test]
async fn test_doctor_schedule_and_availability() {
    let app = TestApp::new().await;
    let clinic_id = app.create_clinic("Sunrise Clinic").await;
    let doctor_id = app.create_doctor(&clinic_id, "Dr. Rao").await;
    let patient = app.register_patient(&clinic_id, "Meera", "9820012345").await;

    let slots_uri = format!("/api/v1/doctors/{}/time-slots", doctor_id);
    let (status, body) = app
        .call(
            Method::PUT,
            &slots_uri,
            Some(&app.admin_token),
            Some(json!({ "slots": [
                { "day_of_week": 0, "start_time": "09:00", "end_time": "10:00", "slot_minutes": 15 },
                { "day_of_week": 2, "start_time": "17:00", "end_time": "19:00", "slot_minutes": 30 }
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Overlapping slots are rejected and the old schedule survives
    let (status, _) = app
        .call(
            Method::PUT,
            &slots_uri,
            Some(&app.admin_token),
            Some(json!({ "slots": [
                { "day_of_week": 0, "start_time": "09:00", "end_time": "10:00", "slot_minutes": 15 },
                { "day_of_week": 0, "start_time": "09:30", "end_time": "11:00", "slot_minutes": 15 }
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, slots) = app.get(&slots_uri).await;
    assert_eq!(slots.as_array().unwrap().len(), 2);

    let (status, booked) = app
        .post(
            "/api/v1/appointments",
            json!({
                "clinic_id": clinic_id,
                "patient_id": patient["id"],
                "doctor_id": doctor_id,
                "appointment_date": CLINIC_DAY,
                "start_time": "09:15",
                "reason": "Fever"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", booked);
    assert_eq!(booked["status"], "scheduled");

    let (status, availability) = app
        .get(&format!("/api/v1/doctors/{}/availability?date={}", doctor_id, CLINIC_DAY))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(availability["day_of_week"], 0);
    let slots = availability["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 4);
    let taken: Vec<&str> = slots
        .iter()
        .filter(|s| s["available"] == false)
        .map(|s| s["start_time"].as_str().unwrap())
        .collect();
    assert_eq!(taken, vec!["09:15"]);
}

#[tokio::test]
async fn test_patient_registration_and_search() {
    let app = TestApp::new().await;
    let clinic_id = app.create_clinic("Sunrise Clinic").await;

    let first = app.register_patient(&clinic_id, "Meera", "9820012345").await;
    let second = app.register_patient(&clinic_id, "Kavya", "9820054321").await;

    let uhid = first["uhid"].as_str().unwrap();
    assert!(uhid.starts_with("UH"));
    assert_eq!(uhid.len(), "UH".len() + 8 + 4);
    assert_ne!(first["uhid"], second["uhid"]);

    let (status, page) = app.get("/api/v1/patients?q=Kavya").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["id"], second["id"]);

    let (_, page) = app.get("/api/v1/patients?limit=1").await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["count"], 1);
    assert_eq!(page["limit"], 1);

    let (status, body) = app
        .post(
            "/api/v1/patients",
            json!({
                "clinic_id": clinic_id,
                "first_name": "Future",
                "last_name": "Child",
                "gender": "female",
                "date_of_birth": "2999-01-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/v1/patients/{}", first["id"].as_str().unwrap()),
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/v1/patients/{}", first["id"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_appointment_double_booking_and_status() {
    let app = TestApp::new().await;
    let clinic_id = app.create_clinic("Sunrise Clinic").await;
    let doctor_id = app.create_doctor(&clinic_id, "Dr. Rao").await;
    let meera = app.register_patient(&clinic_id, "Meera", "9820012345").await;
    let kavya = app.register_patient(&clinic_id, "Kavya", "9820054321").await;

    let booking = |patient_id: &serde_json::Value| {
        json!({
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": CLINIC_DAY,
            "start_time": "10:00"
        })
    };

    let (status, first) = app.post("/api/v1/appointments", booking(&meera["id"])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/v1/appointments", booking(&kavya["id"])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let id = first["id"].as_str().unwrap();
    let (status, cancelled) = app
        .post(&format!("/api/v1/appointments/{}/cancel", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    // A cancelled slot can be booked again
    let (status, _) = app.post("/api/v1/appointments", booking(&kavya["id"])).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/v1/appointments/{}/status", id),
            Some(&app.admin_token),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (_, page) = app
        .get(&format!("/api/v1/appointments?doctor_id={}&date={}", doctor_id, CLINIC_DAY))
        .await;
    assert_eq!(page["total"], 2);
}

#[tokio::test]
async fn test_queue_tokens_and_call_next() {
    let app = TestApp::new().await;
    let clinic_id = app.create_clinic("Sunrise Clinic").await;
    let doctor_id = app.create_doctor(&clinic_id, "Dr. Rao").await;
    let meera = app.register_patient(&clinic_id, "Meera", "9820012345").await;
    let kavya = app.register_patient(&clinic_id, "Kavya", "9820054321").await;
    let receptionist = app.staff_token("frontdesk", "receptionist", None).await;

    let check_in = |patient_id: &serde_json::Value| {
        json!({ "clinic_id": clinic_id, "doctor_id": doctor_id, "patient_id": patient_id })
    };

    let (status, first) = app
        .call(Method::POST, "/api/v1/queue/check-in", Some(&receptionist), Some(check_in(&meera["id"])))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["token_number"], 1);
    assert_eq!(first["status"], "waiting");

    let (status, _) = app
        .call(Method::POST, "/api/v1/queue/check-in", Some(&receptionist), Some(check_in(&meera["id"])))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, second) = app
        .call(Method::POST, "/api/v1/queue/check-in", Some(&receptionist), Some(check_in(&kavya["id"])))
        .await;
    assert_eq!(second["token_number"], 2);

    let call_next = json!({ "doctor_id": doctor_id });
    let (status, called) = app.post("/api/v1/queue/call-next", call_next.clone()).await;
    assert_eq!(status, StatusCode::OK, "{}", called);
    assert_eq!(called["token_number"], 1);
    assert_eq!(called["status"], "in_consultation");
    assert!(called["called_at"].is_string());

    let (status, summary) = app.get(&format!("/api/v1/queue/summary?doctor_id={}", doctor_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["current_token"], 1);
    assert_eq!(summary["next_token"], 2);

    // Calling the next patient completes the one in consultation
    let (_, called) = app.post("/api/v1/queue/call-next", call_next.clone()).await;
    assert_eq!(called["token_number"], 2);
    let (_, queue) = app.get(&format!("/api/v1/queue?doctor_id={}", doctor_id)).await;
    assert_eq!(queue[0]["status"], "completed");
    assert_eq!(queue[1]["status"], "in_consultation");

    let (status, body) = app.post("/api/v1/queue/call-next", call_next).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, done) = app
        .call(
            Method::PATCH,
            &format!("/api/v1/queue/{}/status", second["id"].as_str().unwrap()),
            Some(&receptionist),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(done["completed_at"].is_string());

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/v1/queue/{}/status", second["id"].as_str().unwrap()),
            Some(&receptionist),
            Some(json!({ "status": "waiting" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_abha_registration_flow() {
    let app = TestApp::new().await;
    let clinic_id = app.create_clinic("Sunrise Clinic").await;
    let patient = app.register_patient(&clinic_id, "Meera", "9820012345").await;
    let patient_id = patient["id"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/abha/registration/otp",
            json!({ "patient_id": patient_id, "aadhaar": "12345678901" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, sent) = app
        .post(
            "/api/v1/abha/registration/otp",
            json!({ "patient_id": patient_id, "aadhaar": "123456789012" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", sent);
    assert_eq!(sent["status"], "otp_sent");

    let (status, verified) = app
        .post(
            "/api/v1/abha/registration/verify",
            json!({ "session_id": sent["session_id"], "otp": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", verified);
    assert_eq!(verified["status"], "verified");
    assert_eq!(verified["account"]["abha_number"], TEST_ABHA_NUMBER);

    // A session is used once
    let (status, _) = app
        .post(
            "/api/v1/abha/registration/verify",
            json!({ "session_id": sent["session_id"], "otp": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, linked) = app.get(&format!("/api/v1/patients/{}", patient_id)).await;
    assert_eq!(linked["abha_number"], TEST_ABHA_NUMBER);

    let account_uri = format!("/api/v1/abha/accounts/{}", patient_id);
    let (status, account) = app.get(&account_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["kyc_verified"], true);

    let (status, _) = app.call(Method::DELETE, &account_uri, Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&account_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_abha_login_flow() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post("/api/v1/abha/login/otp", json!({ "login_hint": "abha_number", "value": "12-34" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, sent) = app
        .post(
            "/api/v1/abha/login/otp",
            json!({ "login_hint": "mobile", "value": "9820012345" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", sent);

    let (status, verified) = app
        .post(
            "/api/v1/abha/login/verify",
            json!({ "session_id": sent["session_id"], "otp": "654321" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", verified);
    assert_eq!(verified["account"]["abha_address"], "test.patient@sbx");
    assert!(verified["account"]["patient_id"].is_null());

    let (status, _) = app
        .post(
            "/api/v1/abha/login/verify",
            json!({ "session_id": "missing-session", "otp": "654321" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_templates_referrals_and_insurance() {
    let app = TestApp::new().await;
    let clinic_id = app.create_clinic("Sunrise Clinic").await;
    let doctor_id = app.create_doctor(&clinic_id, "Dr. Rao").await;
    let patient = app.register_patient(&clinic_id, "Meera", "9820012345").await;
    let patient_id = patient["id"].as_str().unwrap();

    let billing = json!({
        "clinic_id": clinic_id,
        "name": "Consultation",
        "template_type": "billing",
        "content": {
            "items": [{ "description": "Consultation", "amount": 100.0, "quantity": 2 }],
            "tax_percent": 10.0
        }
    });
    let (status, template) = app.post("/api/v1/templates", billing.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", template);
    assert_eq!(template["billing_total"], 220.0);

    let (status, _) = app.post("/api/v1/templates", billing).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/v1/templates",
            json!({
                "clinic_id": clinic_id,
                "name": "Broken advice",
                "template_type": "advice",
                "content": { "items": [] }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, referral) = app
        .post(
            "/api/v1/referrals",
            json!({
                "clinic_id": clinic_id,
                "patient_id": patient_id,
                "referring_doctor_id": doctor_id,
                "referred_to_name": "Dr. Iyer",
                "referred_to_specialty": "Cardiology",
                "reason": "Irregular ECG"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", referral);
    assert_eq!(referral["status"], "pending");

    let referral_uri = format!("/api/v1/referrals/{}", referral["id"].as_str().unwrap());
    let (status, _) = app
        .call(Method::PUT, &referral_uri, Some(&app.admin_token), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, accepted) = app
        .call(Method::PUT, &referral_uri, Some(&app.admin_token), Some(json!({ "status": "accepted" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let insurance_uri = format!("/api/v1/patients/{}/insurance", patient_id);
    let (status, body) = app
        .post(
            &insurance_uri,
            json!({
                "provider_name": "Star Health",
                "policy_number": "SH-1001",
                "valid_from": "2030-01-01",
                "valid_until": "2029-12-31"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, policy) = app
        .post(
            &insurance_uri,
            json!({
                "provider_name": "Star Health",
                "policy_number": "SH-1001",
                "valid_from": "2030-01-01",
                "valid_until": "2030-12-31",
                "coverage_amount": 500000.0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", policy);

    let (_, active) = app.get(&format!("{}?active_on=2030-06-01", insurance_uri)).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    let (_, lapsed) = app.get(&format!("{}?active_on=2031-06-01", insurance_uri)).await;
    assert!(lapsed.as_array().unwrap().is_empty());
}

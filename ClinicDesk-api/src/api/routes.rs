use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use clinic_desk_domain::auth::authorize::{require_any_role, require_role};
use clinic_desk_domain::auth::{auth_middleware, configure_auth, login, logout, me, refresh_token};

use crate::api::handlers::{
    abha, appointments, clinics, doctors, health, insurance, medical_records, patients, prescriptions, queue,
    referrals, templates, users,
};
use crate::api::state::AppState;
use crate::openapi::configure_swagger_routes;

// Multipart framing around the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the application router
pub fn create_app(state: AppState, cors_origin: Option<&str>) -> Router {
    debug!("Creating application router");

    // User management, clinic and doctor setup, patient deletion
    let admin_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id/active", patch(users::set_user_active))
        .route("/clinics", post(clinics::create_clinic))
        .route("/clinics/:id", put(clinics::update_clinic).delete(clinics::delete_clinic))
        .route("/doctors", post(doctors::create_doctor))
        .route("/doctors/:id", put(doctors::update_doctor).delete(doctors::deactivate_doctor))
        .route("/doctors/:id/time-slots", put(doctors::replace_time_slots))
        .route("/patients/:id", delete(patients::delete_patient))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_role::<AppState>("admin"),
        ));

    debug!("Admin routes configured");

    // Writes of clinical documents
    let clinical_routes = Router::new()
        .route("/prescriptions", post(prescriptions::create_prescription))
        .route(
            "/prescriptions/:id",
            put(prescriptions::update_prescription).delete(prescriptions::delete_prescription),
        )
        .route("/templates", post(templates::create_template))
        .route(
            "/templates/:id",
            put(templates::update_template).delete(templates::delete_template),
        )
        .route("/referrals", post(referrals::create_referral))
        .route(
            "/referrals/:id",
            put(referrals::update_referral).delete(referrals::delete_referral),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_any_role::<AppState>(&["doctor", "admin"]),
        ));

    debug!("Clinical routes configured");

    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES);

    // Front desk and everything readable by any signed-in user
    let staff_routes = Router::new()
        .route("/clinics", get(clinics::list_clinics))
        .route("/clinics/:id", get(clinics::get_clinic))
        .route("/doctors", get(doctors::list_doctors))
        .route("/doctors/:id", get(doctors::get_doctor))
        .route("/doctors/:id/time-slots", get(doctors::get_time_slots))
        .route("/doctors/:id/availability", get(doctors::get_availability))
        .route("/patients", get(patients::search_patients).post(patients::register_patient))
        .route("/patients/:id", get(patients::get_patient).put(patients::update_patient))
        .route("/patients/:id/prescriptions", get(prescriptions::list_patient_prescriptions))
        .route(
            "/patients/:id/insurance",
            get(insurance::list_policies).post(insurance::create_policy),
        )
        .route(
            "/patients/:id/records",
            post(medical_records::upload_record)
                .layer(upload_limit)
                .get(medical_records::list_records),
        )
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::book_appointment),
        )
        .route(
            "/appointments/:id",
            get(appointments::get_appointment).put(appointments::update_appointment),
        )
        .route("/appointments/:id/status", patch(appointments::update_appointment_status))
        .route("/appointments/:id/cancel", post(appointments::cancel_appointment))
        .route("/prescriptions/:id", get(prescriptions::get_prescription))
        .route("/templates", get(templates::list_templates))
        .route("/templates/:id", get(templates::get_template))
        .route("/referrals", get(referrals::list_referrals))
        .route("/referrals/:id", get(referrals::get_referral))
        .route(
            "/insurance/:id",
            get(insurance::get_policy)
                .put(insurance::update_policy)
                .delete(insurance::delete_policy),
        )
        .route(
            "/records/:id",
            get(medical_records::get_record).delete(medical_records::delete_record),
        )
        .route("/records/:id/download", get(medical_records::download_record))
        .route("/queue", get(queue::list_queue))
        .route("/queue/check-in", post(queue::check_in))
        .route("/queue/call-next", post(queue::call_next))
        .route("/queue/summary", get(queue::queue_summary))
        .route("/queue/:id/status", patch(queue::update_queue_status))
        .route("/abha/registration/otp", post(abha::request_registration_otp))
        .route("/abha/registration/verify", post(abha::verify_registration))
        .route("/abha/login/otp", post(abha::request_login_otp))
        .route("/abha/login/verify", post(abha::verify_login))
        .route(
            "/abha/accounts/:patient_id",
            get(abha::get_abha_account).delete(abha::unlink_abha_account),
        );

    debug!("Staff routes configured");

    // Authentication must run before the role checks above
    let api_routes = Router::new()
        .merge(admin_routes)
        .merge(clinical_routes)
        .merge(staff_routes)
        .layer(middleware::from_fn(auth_middleware));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token));

    let auth_routes = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .layer(middleware::from_fn(auth_middleware));

    debug!("Public and auth routes configured");

    let app = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .with_state(state)
        .merge(configure_swagger_routes());

    debug!("Swagger UI merged");

    let app = configure_auth(app, cors_origin);
    debug!("Security configuration applied");

    app.layer(TraceLayer::new_for_http())
}

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use clinic_desk_domain::entities::{
    abha, appointment, clinic, doctor, insurance, medical_record, patient, prescription, queue, referral, template,
    user,
};

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

/// Registers the bearer scheme the `jwt_auth` requirements point at
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "jwt_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::api::handlers::health::health_check,

        // Auth endpoints
        clinic_desk_domain::auth::login,
        clinic_desk_domain::auth::refresh_token,
        clinic_desk_domain::auth::logout,
        clinic_desk_domain::auth::me,

        // Users
        crate::api::handlers::users::create_user,
        crate::api::handlers::users::list_users,
        crate::api::handlers::users::set_user_active,

        // Clinics
        crate::api::handlers::clinics::create_clinic,
        crate::api::handlers::clinics::list_clinics,
        crate::api::handlers::clinics::get_clinic,
        crate::api::handlers::clinics::update_clinic,
        crate::api::handlers::clinics::delete_clinic,

        // Doctors
        crate::api::handlers::doctors::create_doctor,
        crate::api::handlers::doctors::list_doctors,
        crate::api::handlers::doctors::get_doctor,
        crate::api::handlers::doctors::update_doctor,
        crate::api::handlers::doctors::deactivate_doctor,
        crate::api::handlers::doctors::get_time_slots,
        crate::api::handlers::doctors::replace_time_slots,
        crate::api::handlers::doctors::get_availability,

        // Patients
        crate::api::handlers::patients::register_patient,
        crate::api::handlers::patients::search_patients,
        crate::api::handlers::patients::get_patient,
        crate::api::handlers::patients::update_patient,
        crate::api::handlers::patients::delete_patient,

        // Appointments
        crate::api::handlers::appointments::book_appointment,
        crate::api::handlers::appointments::list_appointments,
        crate::api::handlers::appointments::get_appointment,
        crate::api::handlers::appointments::update_appointment,
        crate::api::handlers::appointments::update_appointment_status,
        crate::api::handlers::appointments::cancel_appointment,

        // Prescriptions and templates
        crate::api::handlers::prescriptions::create_prescription,
        crate::api::handlers::prescriptions::list_patient_prescriptions,
        crate::api::handlers::prescriptions::get_prescription,
        crate::api::handlers::prescriptions::update_prescription,
        crate::api::handlers::prescriptions::delete_prescription,
        crate::api::handlers::templates::create_template,
        crate::api::handlers::templates::list_templates,
        crate::api::handlers::templates::get_template,
        crate::api::handlers::templates::update_template,
        crate::api::handlers::templates::delete_template,

        // Queue
        crate::api::handlers::queue::check_in,
        crate::api::handlers::queue::list_queue,
        crate::api::handlers::queue::call_next,
        crate::api::handlers::queue::update_queue_status,
        crate::api::handlers::queue::queue_summary,

        // ABHA
        crate::api::handlers::abha::request_registration_otp,
        crate::api::handlers::abha::verify_registration,
        crate::api::handlers::abha::request_login_otp,
        crate::api::handlers::abha::verify_login,
        crate::api::handlers::abha::get_abha_account,
        crate::api::handlers::abha::unlink_abha_account,

        // Referrals and insurance
        crate::api::handlers::referrals::create_referral,
        crate::api::handlers::referrals::list_referrals,
        crate::api::handlers::referrals::get_referral,
        crate::api::handlers::referrals::update_referral,
        crate::api::handlers::referrals::delete_referral,
        crate::api::handlers::insurance::create_policy,
        crate::api::handlers::insurance::list_policies,
        crate::api::handlers::insurance::get_policy,
        crate::api::handlers::insurance::update_policy,
        crate::api::handlers::insurance::delete_policy,

        // Medical records
        crate::api::handlers::medical_records::upload_record,
        crate::api::handlers::medical_records::list_records,
        crate::api::handlers::medical_records::get_record,
        crate::api::handlers::medical_records::download_record,
        crate::api::handlers::medical_records::delete_record
    ),
    components(
        schemas(
            // Common
            crate::entities::common::PublicErrorResponse,
            crate::entities::common::PatientPage,
            crate::entities::common::AppointmentPage,

            // Health
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentHealthStatus,

            // Auth and users
            clinic_desk_domain::auth::LoginRequest,
            clinic_desk_domain::auth::LoginResponse,
            clinic_desk_domain::auth::RefreshResponse,
            clinic_desk_domain::auth::LogoutRequest,
            clinic_desk_domain::auth::UserInfo,
            user::Role,
            user::User,
            user::CreateUserRequest,
            crate::api::handlers::users::SetUserActiveRequest,

            // Clinics and doctors
            clinic::Clinic,
            clinic::CreateClinicRequest,
            clinic::UpdateClinicRequest,
            doctor::Doctor,
            doctor::CreateDoctorRequest,
            doctor::UpdateDoctorRequest,
            doctor::TimeSlot,
            doctor::TimeSlotInput,
            doctor::ReplaceTimeSlotsRequest,
            doctor::AvailableSlot,
            doctor::DoctorAvailability,

            // Patients and appointments
            patient::Patient,
            patient::RegisterPatientRequest,
            patient::UpdatePatientRequest,
            appointment::AppointmentStatus,
            appointment::Appointment,
            appointment::BookAppointmentRequest,
            appointment::UpdateAppointmentRequest,
            appointment::UpdateAppointmentStatusRequest,

            // Prescriptions and templates
            prescription::Medicine,
            prescription::Prescription,
            prescription::CreatePrescriptionRequest,
            prescription::UpdatePrescriptionRequest,
            template::TemplateType,
            template::Template,
            template::CreateTemplateRequest,
            template::UpdateTemplateRequest,

            // Queue
            queue::QueueStatus,
            queue::QueueEntry,
            queue::CheckInRequest,
            queue::CallNextRequest,
            queue::UpdateQueueStatusRequest,
            queue::QueueStatusTally,
            queue::QueueSummary,

            // ABHA
            abha::AbhaFlow,
            abha::AbhaSessionStatus,
            abha::LoginHint,
            abha::RegistrationOtpRequest,
            abha::RegistrationVerifyRequest,
            abha::LoginOtpRequest,
            abha::LoginVerifyRequest,
            abha::OtpSentResponse,
            abha::AbhaAccount,
            abha::AbhaVerifyResponse,

            // Referrals, insurance, records
            referral::ReferralStatus,
            referral::Referral,
            referral::CreateReferralRequest,
            referral::UpdateReferralRequest,
            insurance::PolicyStatus,
            insurance::InsurancePolicy,
            insurance::CreateInsurancePolicyRequest,
            insurance::UpdateInsurancePolicyRequest,
            medical_record::MedicalRecord,
            crate::api::handlers::medical_records::UploadRecordForm
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "Authentication", description = "Authentication and authorization endpoints"),
        (name = "users", description = "Staff accounts"),
        (name = "clinics", description = "Clinic administration"),
        (name = "doctors", description = "Doctors, weekly time slots and availability"),
        (name = "patients", description = "Patient registration and search"),
        (name = "appointments", description = "Appointment booking and status"),
        (name = "prescriptions", description = "Prescriptions"),
        (name = "templates", description = "Prescription, advice and billing templates"),
        (name = "queue", description = "Walk-in queue and tokens"),
        (name = "abha", description = "ABHA creation and verification through ABDM"),
        (name = "referrals", description = "Outgoing referrals"),
        (name = "insurance", description = "Patient insurance policies"),
        (name = "records", description = "Uploaded reports and scans")
    ),
    info(
        title = "ClinicDesk API",
        version = "0.1.0",
        description = "Patient, appointment, queue and ABHA management for outpatient clinics",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "ClinicDesk API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        assert!(tags.iter().any(|tag| tag.name == "queue"));
        assert!(tags.iter().any(|tag| tag.name == "abha"));

        for path in [
            "/health",
            "/auth/login",
            "/api/v1/patients",
            "/api/v1/patients/{id}/records",
            "/api/v1/queue/call-next",
            "/api/v1/abha/registration/otp",
            "/api/v1/doctors/{id}/time-slots",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.unwrap();
        assert!(components.security_schemes.contains_key("jwt_auth"));
        assert!(components.schemas.contains_key("PatientPage"));
    }
}

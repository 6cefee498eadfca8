//! Shared application state handed to every handler

use std::sync::Arc;

use axum::extract::FromRef;

use clinic_desk_data::database::DatabasePool;
use clinic_desk_data::repository::{
    AbhaRepository, AppointmentRepository, ClinicRepository, DoctorRepository, InsuranceRepository,
    MedicalRecordRepository, PatientRepository, PrescriptionRepository, QueueRepository, ReferralRepository,
    TemplateRepository, UserRepository,
};
use clinic_desk_domain::abdm::AbhaGateway;
use clinic_desk_domain::auth::SharedUserService;
use clinic_desk_domain::health::{HealthService, HealthServiceTrait};
use clinic_desk_domain::services::{
    AbhaService, AbhaServiceTrait, AppointmentService, AppointmentServiceTrait, ClinicService, ClinicServiceTrait,
    DoctorService, DoctorServiceTrait, InsuranceService, InsuranceServiceTrait, MedicalRecordService,
    MedicalRecordServiceTrait, PatientService, PatientServiceTrait, PrescriptionService, PrescriptionServiceTrait,
    QueueService, QueueServiceTrait, ReferralService, ReferralServiceTrait, TemplateService, TemplateServiceTrait,
    UploadSettings, UserService,
};

/// Every service behind a trait object, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub users: SharedUserService,
    pub clinics: Arc<dyn ClinicServiceTrait>,
    pub doctors: Arc<dyn DoctorServiceTrait>,
    pub patients: Arc<dyn PatientServiceTrait>,
    pub appointments: Arc<dyn AppointmentServiceTrait>,
    pub prescriptions: Arc<dyn PrescriptionServiceTrait>,
    pub templates: Arc<dyn TemplateServiceTrait>,
    pub queue: Arc<dyn QueueServiceTrait>,
    pub abha: Arc<dyn AbhaServiceTrait>,
    pub referrals: Arc<dyn ReferralServiceTrait>,
    pub insurance: Arc<dyn InsuranceServiceTrait>,
    pub records: Arc<dyn MedicalRecordServiceTrait>,
    pub health: Arc<dyn HealthServiceTrait>,
    /// Largest accepted upload, used to size the body limit of the upload route
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire the SQLite-backed services over `pool`
    pub fn new<G>(pool: DatabasePool, uploads: UploadSettings, gateway: G) -> Self
    where
        G: AbhaGateway + 'static,
    {
        let max_upload_bytes = uploads.max_upload_bytes;

        Self {
            users: Arc::new(UserService::new(UserRepository::new(pool.clone()))),
            clinics: Arc::new(ClinicService::new(ClinicRepository::new(pool.clone()))),
            doctors: Arc::new(DoctorService::new(
                DoctorRepository::new(pool.clone()),
                AppointmentRepository::new(pool.clone()),
            )),
            patients: Arc::new(PatientService::new(PatientRepository::new(pool.clone()))),
            appointments: Arc::new(AppointmentService::new(
                AppointmentRepository::new(pool.clone()),
                DoctorRepository::new(pool.clone()),
            )),
            prescriptions: Arc::new(PrescriptionService::new(
                PrescriptionRepository::new(pool.clone()),
                TemplateRepository::new(pool.clone()),
            )),
            templates: Arc::new(TemplateService::new(TemplateRepository::new(pool.clone()))),
            queue: Arc::new(QueueService::new(QueueRepository::new(pool.clone()))),
            abha: Arc::new(AbhaService::new(
                AbhaRepository::new(pool.clone()),
                PatientRepository::new(pool.clone()),
                gateway,
            )),
            referrals: Arc::new(ReferralService::new(ReferralRepository::new(pool.clone()))),
            insurance: Arc::new(InsuranceService::new(InsuranceRepository::new(pool.clone()))),
            records: Arc::new(MedicalRecordService::new(
                MedicalRecordRepository::new(pool.clone()),
                PatientRepository::new(pool.clone()),
                uploads,
            )),
            health: Arc::new(HealthService::new(pool)),
            max_upload_bytes,
        }
    }

    /// Swap the health service, e.g. for a test double
    pub fn with_health_service(mut self, health: Arc<dyn HealthServiceTrait>) -> Self {
        self.health = health;
        self
    }
}

impl FromRef<AppState> for SharedUserService {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

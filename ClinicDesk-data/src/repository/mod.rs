// Repository module structure
pub mod errors;
mod sql;

mod abha;
mod appointment;
mod clinic;
mod doctor;
mod insurance;
mod medical_record;
mod patient;
mod prescription;
mod queue;
mod referral;
mod template;
mod user;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use sql::{new_id, now_rfc3339};

pub use abha::{AbhaRepository, AbhaRepositoryTrait};
pub use appointment::{AppointmentRepository, AppointmentRepositoryTrait};
pub use clinic::{ClinicRepository, ClinicRepositoryTrait};
pub use doctor::{DoctorRepository, DoctorRepositoryTrait};
pub use insurance::{InsuranceRepository, InsuranceRepositoryTrait};
pub use medical_record::{MedicalRecordRepository, MedicalRecordRepositoryTrait};
pub use patient::{PatientRepository, PatientRepositoryTrait};
pub use prescription::{PrescriptionRepository, PrescriptionRepositoryTrait};
pub use queue::{QueueRepository, QueueRepositoryTrait};
pub use referral::{ReferralRepository, ReferralRepositoryTrait};
pub use template::{TemplateRepository, TemplateRepositoryTrait};
pub use user::{UserRepository, UserRepositoryTrait};

/// Rows inserted straight into the schema for repository tests
#[cfg(test)]
pub(crate) mod fixtures {
    use rusqlite::params;

    use super::sql::{new_id, now_rfc3339};
    use crate::database::DatabasePool;

    pub fn seed_clinic(pool: &DatabasePool) -> String {
        let id = new_id();
        let now = now_rfc3339();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO clinics (id, name, created_at, updated_at) VALUES (?1, 'Test Clinic', ?2, ?2)",
                params![id, now],
            )
            .unwrap();
        id
    }

    pub fn seed_doctor(pool: &DatabasePool, clinic_id: &str) -> String {
        let id = new_id();
        let now = now_rfc3339();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO doctors (id, clinic_id, name, active, created_at, updated_at)
                 VALUES (?1, ?2, 'Dr. Test', 1, ?3, ?3)",
                params![id, clinic_id, now],
            )
            .unwrap();
        id
    }

    pub fn seed_patient(pool: &DatabasePool, clinic_id: &str) -> String {
        let id = new_id();
        let now = now_rfc3339();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO patients (id, clinic_id, uhid, first_name, last_name, gender, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'Test', 'Patient', 'other', ?4, ?4)",
                params![id, clinic_id, format!("T-{}", id), now],
            )
            .unwrap();
        id
    }

    pub fn seed_appointment(pool: &DatabasePool, seed: &Seeded, date: &str, start: &str) -> String {
        let id = new_id();
        let now = now_rfc3339();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO appointments (id, clinic_id, patient_id, doctor_id, appointment_date, start_time,
                                           status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'scheduled', ?7, ?7)",
                params![id, seed.clinic_id, seed.patient_id, seed.doctor_id, date, start, now],
            )
            .unwrap();
        id
    }

    pub fn appointment_status(pool: &DatabasePool, id: &str) -> String {
        pool.get()
            .unwrap()
            .query_row("SELECT status FROM appointments WHERE id = ?1", params![id], |row| row.get(0))
            .unwrap()
    }

    pub fn patient_abha_number(pool: &DatabasePool, id: &str) -> Option<String> {
        pool.get()
            .unwrap()
            .query_row("SELECT abha_number FROM patients WHERE id = ?1", params![id], |row| row.get(0))
            .unwrap()
    }

    /// A clinic with one doctor and one patient
    pub struct Seeded {
        pub clinic_id: String,
        pub doctor_id: String,
        pub patient_id: String,
    }

    impl Seeded {
        pub fn new(pool: &DatabasePool) -> Self {
            let clinic_id = seed_clinic(pool);
            let doctor_id = seed_doctor(pool, &clinic_id);
            let patient_id = seed_patient(pool, &clinic_id);
            Self {
                clinic_id,
                doctor_id,
                patient_id,
            }
        }
    }
}

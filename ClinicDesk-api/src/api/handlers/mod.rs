pub mod abha;
pub mod appointments;
pub mod clinics;
pub mod doctors;
pub mod health;
pub mod insurance;
pub mod medical_records;
pub mod patients;
pub mod prescriptions;
pub mod queue;
pub mod referrals;
pub mod templates;
pub mod users;

// Storage models: one struct per table row plus the inputs repositories accept

pub mod abha;
pub mod appointment;
pub mod clinic;
pub mod doctor;
pub mod insurance;
pub mod medical_record;
pub mod patient;
pub mod prescription;
pub mod queue;
pub mod referral;
pub mod template;
pub mod user;

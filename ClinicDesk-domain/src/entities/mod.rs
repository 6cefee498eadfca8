// Domain entities and value objects
pub mod abha;
pub mod appointment;
pub mod clinic;
pub mod conversions;
pub mod doctor;
pub mod insurance;
pub mod medical_record;
pub mod patient;
pub mod prescription;
pub mod queue;
pub mod referral;
pub mod template;
pub mod user;
pub mod validators;

// Re-export common types for easier imports
pub use appointment::{Appointment, AppointmentStatus};
pub use clinic::Clinic;
pub use doctor::{Doctor, TimeSlot};
pub use patient::Patient;
pub use prescription::{Medicine, Prescription};
pub use queue::{QueueEntry, QueueStatus};
pub use template::{Template, TemplateContent, TemplateType};
pub use user::{Role, User};

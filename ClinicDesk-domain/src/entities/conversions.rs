//! Conversion functions between storage records and domain entities.
//!
//! Functions follow the pattern `convert_to_[target_layer]_[model]`. Records
//! whose text columns hold enums (statuses, roles, template content) convert
//! fallibly: a value this crate did not write means the row is corrupt.

use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use clinic_desk_data::models::abha::AbhaAccountRecord;
use clinic_desk_data::models::appointment::AppointmentRecord;
use clinic_desk_data::models::clinic::ClinicRecord;
use clinic_desk_data::models::doctor::{DoctorRecord, TimeSlotRecord};
use clinic_desk_data::models::insurance::InsurancePolicyRecord;
use clinic_desk_data::models::medical_record::MedicalRecordEntry;
use clinic_desk_data::models::patient::PatientRecord;
use clinic_desk_data::models::prescription::PrescriptionRecord;
use clinic_desk_data::models::queue::QueueEntryRecord;
use clinic_desk_data::models::referral::ReferralRecord;
use clinic_desk_data::models::template::TemplateRecord;
use clinic_desk_data::models::user::UserRecord;

use super::abha::AbhaAccount;
use super::appointment::Appointment;
use super::clinic::Clinic;
use super::doctor::{Doctor, TimeSlot};
use super::insurance::InsurancePolicy;
use super::medical_record::MedicalRecord;
use super::patient::Patient;
use super::prescription::{Medicine, Prescription};
use super::queue::QueueEntry;
use super::referral::Referral;
use super::template::{Template, TemplateContent, TemplateType};
use super::user::User;

/// A stored row could not be turned into a domain entity
#[derive(Debug, Error)]
#[error("Corrupt {entity} {id}: {reason}")]
pub struct ConversionError {
    pub entity: &'static str,
    pub id: String,
    pub reason: String,
}

impl ConversionError {
    fn new(entity: &'static str, id: &str, reason: impl ToString) -> Self {
        let err = Self {
            entity,
            id: id.to_string(),
            reason: reason.to_string(),
        };
        error!("{}", err);
        err
    }
}

/// Parse a string id into a UUID, with a message fit for a validation error
pub fn parse_string_to_uuid(id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|_| format!("Invalid UUID format: {}", id))
}

pub fn convert_to_domain_user(record: UserRecord) -> Result<User, ConversionError> {
    let role = record
        .role
        .parse()
        .map_err(|e| ConversionError::new("user", &record.id, e))?;

    Ok(User {
        id: record.id,
        username: record.username,
        full_name: record.full_name,
        role,
        clinic_id: record.clinic_id,
        doctor_id: record.doctor_id,
        active: record.active,
        created_at: record.created_at,
    })
}

pub fn convert_to_domain_clinic(record: ClinicRecord) -> Clinic {
    Clinic {
        id: record.id,
        name: record.name,
        address: record.address,
        phone: record.phone,
        email: record.email,
        hfr_id: record.hfr_id,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub fn convert_to_domain_doctor(record: DoctorRecord) -> Doctor {
    Doctor {
        id: record.id,
        clinic_id: record.clinic_id,
        name: record.name,
        specialization: record.specialization,
        registration_number: record.registration_number,
        phone: record.phone,
        email: record.email,
        consultation_fee: record.consultation_fee,
        active: record.active,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub fn convert_to_domain_time_slot(record: TimeSlotRecord) -> TimeSlot {
    TimeSlot {
        id: record.id,
        day_of_week: record.day_of_week,
        start_time: record.start_time,
        end_time: record.end_time,
        slot_minutes: record.slot_minutes,
    }
}

pub fn convert_to_domain_patient(record: PatientRecord) -> Patient {
    Patient {
        id: record.id,
        clinic_id: record.clinic_id,
        uhid: record.uhid,
        first_name: record.first_name,
        last_name: record.last_name,
        gender: record.gender,
        date_of_birth: record.date_of_birth,
        phone: record.phone,
        email: record.email,
        address: record.address,
        blood_group: record.blood_group,
        abha_number: record.abha_number,
        abha_address: record.abha_address,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

pub fn convert_to_domain_appointment(record: AppointmentRecord) -> Result<Appointment, ConversionError> {
    let status = record
        .status
        .parse()
        .map_err(|e| ConversionError::new("appointment", &record.id, e))?;

    Ok(Appointment {
        id: record.id,
        clinic_id: record.clinic_id,
        patient_id: record.patient_id,
        doctor_id: record.doctor_id,
        appointment_date: record.appointment_date,
        start_time: record.start_time,
        end_time: record.end_time,
        status,
        reason: record.reason,
        notes: record.notes,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

pub fn convert_to_domain_prescription(record: PrescriptionRecord) -> Result<Prescription, ConversionError> {
    let medicines: Vec<Medicine> = serde_json::from_str(&record.medicines)
        .map_err(|e| ConversionError::new("prescription", &record.id, e))?;

    Ok(Prescription {
        id: record.id,
        clinic_id: record.clinic_id,
        patient_id: record.patient_id,
        doctor_id: record.doctor_id,
        appointment_id: record.appointment_id,
        diagnosis: record.diagnosis,
        medicines,
        advice: record.advice,
        follow_up_date: record.follow_up_date,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

pub fn convert_to_domain_template(record: TemplateRecord) -> Result<Template, ConversionError> {
    let template_type: TemplateType = record
        .template_type
        .parse()
        .map_err(|e| ConversionError::new("template", &record.id, e))?;
    let content = TemplateContent::from_json(template_type, &record.content)
        .map_err(|e| ConversionError::new("template", &record.id, format!("content: {}", e)))?;

    Ok(Template {
        id: record.id,
        clinic_id: record.clinic_id,
        doctor_id: record.doctor_id,
        name: record.name,
        template_type,
        billing_total: content.billing_total(),
        content,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

pub fn convert_to_domain_queue_entry(record: QueueEntryRecord) -> Result<QueueEntry, ConversionError> {
    let status = record
        .status
        .parse()
        .map_err(|e| ConversionError::new("queue entry", &record.id, e))?;

    Ok(QueueEntry {
        id: record.id,
        clinic_id: record.clinic_id,
        doctor_id: record.doctor_id,
        patient_id: record.patient_id,
        appointment_id: record.appointment_id,
        queue_date: record.queue_date,
        token_number: record.token_number,
        status,
        checked_in_at: record.checked_in_at,
        called_at: record.called_at,
        completed_at: record.completed_at,
    })
}

pub fn convert_to_domain_abha_account(record: AbhaAccountRecord) -> AbhaAccount {
    AbhaAccount {
        id: record.id,
        patient_id: record.patient_id,
        abha_number: record.abha_number,
        abha_address: record.abha_address,
        full_name: record.full_name,
        gender: record.gender,
        date_of_birth: record.date_of_birth,
        mobile: record.mobile,
        kyc_verified: record.kyc_verified,
        linked_at: record.linked_at,
        updated_at: record.updated_at,
    }
}

pub fn convert_to_domain_referral(record: ReferralRecord) -> Result<Referral, ConversionError> {
    let status = record
        .status
        .parse()
        .map_err(|e| ConversionError::new("referral", &record.id, e))?;

    Ok(Referral {
        id: record.id,
        clinic_id: record.clinic_id,
        patient_id: record.patient_id,
        referring_doctor_id: record.referring_doctor_id,
        referred_to_name: record.referred_to_name,
        referred_to_specialty: record.referred_to_specialty,
        referred_to_facility: record.referred_to_facility,
        reason: record.reason,
        status,
        notes: record.notes,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

pub fn convert_to_domain_insurance_policy(record: InsurancePolicyRecord) -> Result<InsurancePolicy, ConversionError> {
    let status = record
        .status
        .parse()
        .map_err(|e| ConversionError::new("insurance policy", &record.id, e))?;

    Ok(InsurancePolicy {
        id: record.id,
        patient_id: record.patient_id,
        provider_name: record.provider_name,
        policy_number: record.policy_number,
        valid_from: record.valid_from,
        valid_until: record.valid_until,
        coverage_amount: record.coverage_amount,
        status,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

pub fn convert_to_domain_medical_record(record: MedicalRecordEntry) -> MedicalRecord {
    MedicalRecord {
        id: record.id,
        patient_id: record.patient_id,
        record_type: record.record_type,
        title: record.title,
        file_name: record.file_name,
        content_type: record.content_type,
        size_bytes: record.size_bytes,
        uploaded_by: record.uploaded_by,
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::appointment::AppointmentStatus;

    fn template_record(template_type: &str, content: &str) -> TemplateRecord {
        TemplateRecord {
            id: "tpl-1".to_string(),
            clinic_id: "clinic-1".to_string(),
            doctor_id: None,
            name: "Fever".to_string(),
            template_type: template_type.to_string(),
            content: content.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_parse_string_to_uuid() {
        assert!(parse_string_to_uuid("8d3c3e8e-8d0b-4c43-9a8e-6a2b8f7c1d20").is_ok());
        assert!(parse_string_to_uuid("not-a-uuid").unwrap_err().contains("Invalid UUID"));
    }

    #[test]
    fn test_convert_appointment_status() {
        let record = AppointmentRecord {
            id: "appt-1".to_string(),
            clinic_id: "c".to_string(),
            patient_id: "p".to_string(),
            doctor_id: "d".to_string(),
            appointment_date: "2026-03-14".to_string(),
            start_time: "10:00".to_string(),
            end_time: None,
            status: "checked_in".to_string(),
            reason: None,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let appointment = convert_to_domain_appointment(record.clone()).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::CheckedIn);

        let corrupt = AppointmentRecord {
            status: "teleported".to_string(),
            ..record
        };
        let err = convert_to_domain_appointment(corrupt).unwrap_err();
        assert_eq!(err.entity, "appointment");
        assert_eq!(err.id, "appt-1");
    }

    #[test]
    fn test_convert_billing_template_computes_total() {
        let record = template_record(
            "billing",
            r#"{"items":[{"description":"Consultation","amount":400.0,"quantity":1}],"tax_percent":5.0}"#,
        );
        let template = convert_to_domain_template(record).unwrap();
        assert_eq!(template.template_type, TemplateType::Billing);
        assert_eq!(template.billing_total, Some(420.0));
    }

    #[test]
    fn test_convert_template_with_malformed_content() {
        let record = template_record("advice", r#"{"text": "#);
        let err = convert_to_domain_template(record).unwrap_err();
        assert!(err.reason.starts_with("content"));
    }
}

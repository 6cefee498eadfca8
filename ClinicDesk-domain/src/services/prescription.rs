use async_trait::async_trait;
use tracing::{info, warn};

use clinic_desk_data::models::prescription::PrescriptionFields;
use clinic_desk_data::repository::{PrescriptionRepositoryTrait, TemplateRepositoryTrait};

use super::{validate_each, validate_request, ServiceError};
use crate::entities::conversions::{convert_to_domain_prescription, convert_to_domain_template};
use crate::entities::prescription::{
    CreatePrescriptionRequest, Medicine, Prescription, UpdatePrescriptionRequest,
};
use crate::entities::template::{PrescriptionTemplateContent, TemplateContent};

/// Trait for writing and amending prescriptions
#[async_trait]
pub trait PrescriptionServiceTrait: Send + Sync {
    /// Medicines and advice missing from the request are taken from `template_id` when given
    async fn create_prescription(&self, request: CreatePrescriptionRequest) -> Result<Prescription, ServiceError>;
    async fn get_prescription(&self, id: &str) -> Result<Prescription, ServiceError>;
    /// Newest first
    async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Prescription>, ServiceError>;
    async fn update_prescription(
        &self,
        id: &str,
        request: UpdatePrescriptionRequest,
    ) -> Result<Prescription, ServiceError>;
    async fn delete_prescription(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct PrescriptionService<P: PrescriptionRepositoryTrait, T: TemplateRepositoryTrait> {
    prescriptions: P,
    templates: T,
}

impl<P: PrescriptionRepositoryTrait, T: TemplateRepositoryTrait> PrescriptionService<P, T> {
    pub fn new(prescriptions: P, templates: T) -> Self {
        Self {
            prescriptions,
            templates,
        }
    }

    async fn load_template(&self, template_id: &str, clinic_id: &str) -> Result<PrescriptionTemplateContent, ServiceError> {
        let record = self
            .templates
            .get_by_id(template_id)
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("template_id: Template {} does not exist", template_id)))?;

        if record.clinic_id != clinic_id {
            return Err(ServiceError::Validation(format!(
                "template_id: Template {} belongs to another clinic",
                template_id
            )));
        }

        match convert_to_domain_template(record)?.content {
            TemplateContent::Prescription(content) => Ok(content),
            _ => Err(ServiceError::Validation(format!(
                "template_id: Template {} is not a prescription template",
                template_id
            ))),
        }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Prescription with ID {} not found", id))
}

fn check_medicines(medicines: &[Medicine]) -> Result<String, ServiceError> {
    if medicines.is_empty() {
        return Err(ServiceError::Validation(
            "medicines: At least one medicine is required".to_string(),
        ));
    }
    validate_each("medicines", medicines)?;
    serde_json::to_string(medicines)
        .map_err(|e| ServiceError::Internal(format!("Failed to serialize medicines: {}", e)))
}

#[async_trait]
impl<P, T> PrescriptionServiceTrait for PrescriptionService<P, T>
where
    P: PrescriptionRepositoryTrait,
    T: TemplateRepositoryTrait,
{
    async fn create_prescription(&self, request: CreatePrescriptionRequest) -> Result<Prescription, ServiceError> {
        validate_request(&request)?;

        let (medicines, advice) = match request.template_id.as_deref() {
            Some(template_id) => {
                let template = self.load_template(template_id, &request.clinic_id).await?;
                (
                    request.medicines.unwrap_or(template.medicines),
                    request.advice.or(template.advice),
                )
            }
            None => (request.medicines.unwrap_or_default(), request.advice),
        };
        let medicines = check_medicines(&medicines)?;

        let record = self
            .prescriptions
            .create(PrescriptionFields {
                clinic_id: request.clinic_id,
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                appointment_id: request.appointment_id,
                diagnosis: request.diagnosis,
                medicines,
                advice,
                follow_up_date: request.follow_up_date,
            })
            .await
            .map_err(|e| {
                warn!("Prescription not created: {}", e);
                e
            })?;

        info!("Created prescription {} for patient {}", record.id, record.patient_id);
        Ok(convert_to_domain_prescription(record)?)
    }

    async fn get_prescription(&self, id: &str) -> Result<Prescription, ServiceError> {
        let record = self.prescriptions.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_prescription(record)?)
    }

    async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Prescription>, ServiceError> {
        let records = self.prescriptions.list_by_patient(patient_id).await?;
        Ok(records
            .into_iter()
            .map(convert_to_domain_prescription)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_prescription(
        &self,
        id: &str,
        request: UpdatePrescriptionRequest,
    ) -> Result<Prescription, ServiceError> {
        validate_request(&request)?;

        let current = self.prescriptions.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let medicines = match request.medicines {
            Some(medicines) => check_medicines(&medicines)?,
            None => current.medicines,
        };

        let record = self
            .prescriptions
            .update(
                id,
                PrescriptionFields {
                    clinic_id: current.clinic_id,
                    patient_id: current.patient_id,
                    doctor_id: current.doctor_id,
                    appointment_id: current.appointment_id,
                    diagnosis: request.diagnosis.or(current.diagnosis),
                    medicines,
                    advice: request.advice.or(current.advice),
                    follow_up_date: request.follow_up_date.or(current.follow_up_date),
                },
            )
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_prescription(record)?)
    }

    async fn delete_prescription(&self, id: &str) -> Result<(), ServiceError> {
        if !self.prescriptions.delete(id).await? {
            return Err(not_found(id));
        }
        info!("Deleted prescription {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::template::{CreateTemplateRequest, TemplateType};
    use crate::services::template::{TemplateService, TemplateServiceTrait};
    use crate::services::test_support::Fixture;
    use clinic_desk_data::repository::{PrescriptionRepository, TemplateRepository};
    use serde_json::json;

    fn service(fixture: &Fixture) -> PrescriptionService<PrescriptionRepository, TemplateRepository> {
        PrescriptionService::new(
            PrescriptionRepository::new(fixture.pool.clone()),
            TemplateRepository::new(fixture.pool.clone()),
        )
    }

    fn amoxicillin() -> Medicine {
        Medicine {
            name: "Amoxicillin".to_string(),
            dosage: "500 mg".to_string(),
            frequency: "1-0-1".to_string(),
            duration_days: 5,
            instructions: None,
        }
    }

    fn request(fixture: &Fixture) -> CreatePrescriptionRequest {
        CreatePrescriptionRequest {
            clinic_id: fixture.clinic_id.clone(),
            patient_id: fixture.patient_id.clone(),
            doctor_id: fixture.doctor_id.clone(),
            appointment_id: None,
            template_id: None,
            diagnosis: Some("Acute pharyngitis".to_string()),
            medicines: Some(vec![amoxicillin()]),
            advice: None,
            follow_up_date: Some("2026-04-20".to_string()),
        }
    }

    async fn create_template(fixture: &Fixture, template_type: TemplateType, content: serde_json::Value) -> String {
        TemplateService::new(TemplateRepository::new(fixture.pool.clone()))
            .create_template(CreateTemplateRequest {
                clinic_id: fixture.clinic_id.clone(),
                doctor_id: None,
                name: format!("{} template", template_type),
                template_type,
                content,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_requires_a_medicine() {
        let fixture = Fixture::new().await;
        let mut empty = request(&fixture);
        empty.medicines = Some(vec![]);
        assert!(matches!(
            service(&fixture).create_prescription(empty).await,
            Err(ServiceError::Validation(_))
        ));

        let mut invalid = request(&fixture);
        invalid.medicines = Some(vec![Medicine {
            duration_days: 0,
            ..amoxicillin()
        }]);
        let err = service(&fixture).create_prescription(invalid).await.unwrap_err();
        assert!(err.to_string().contains("medicines[0]: duration_days"));
    }

    #[tokio::test]
    async fn test_template_fills_missing_fields() {
        let fixture = Fixture::new().await;
        let template_id = create_template(
            &fixture,
            TemplateType::Prescription,
            json!({
                "medicines": [{ "name": "Cetirizine", "dosage": "10 mg", "frequency": "0-0-1", "duration_days": 7 }],
                "advice": "Avoid dust"
            }),
        )
        .await;

        let mut from_template = request(&fixture);
        from_template.template_id = Some(template_id.clone());
        from_template.medicines = None;
        let prescription = service(&fixture).create_prescription(from_template).await.unwrap();
        assert_eq!(prescription.medicines[0].name, "Cetirizine");
        assert_eq!(prescription.advice.as_deref(), Some("Avoid dust"));

        // Explicit medicines win over the template's
        let mut explicit = request(&fixture);
        explicit.template_id = Some(template_id);
        let prescription = service(&fixture).create_prescription(explicit).await.unwrap();
        assert_eq!(prescription.medicines, vec![amoxicillin()]);
        assert_eq!(prescription.advice.as_deref(), Some("Avoid dust"));
    }

    #[tokio::test]
    async fn test_non_prescription_template_rejected() {
        let fixture = Fixture::new().await;
        let template_id = create_template(&fixture, TemplateType::Advice, json!({ "text": "Sleep early" })).await;

        let mut req = request(&fixture);
        req.template_id = Some(template_id);
        let err = service(&fixture).create_prescription(req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m.contains("not a prescription template")));
    }

    #[tokio::test]
    async fn test_update_list_delete() {
        let fixture = Fixture::new().await;
        let service = service(&fixture);
        let created = service.create_prescription(request(&fixture)).await.unwrap();

        let updated = service
            .update_prescription(
                &created.id,
                UpdatePrescriptionRequest {
                    advice: Some("Warm saline gargles".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.medicines, created.medicines);
        assert_eq!(updated.advice.as_deref(), Some("Warm saline gargles"));

        assert_eq!(service.list_for_patient(&fixture.patient_id).await.unwrap().len(), 1);
        service.delete_prescription(&created.id).await.unwrap();
        assert!(service.list_for_patient(&fixture.patient_id).await.unwrap().is_empty());
        assert!(matches!(
            service.get_prescription(&created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}

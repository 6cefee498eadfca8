use async_trait::async_trait;
use tracing::info;

use clinic_desk_data::models::clinic::ClinicFields;
use clinic_desk_data::repository::ClinicRepositoryTrait;

use super::{validate_request, ServiceError};
use crate::entities::clinic::{Clinic, CreateClinicRequest, UpdateClinicRequest};
use crate::entities::conversions::convert_to_domain_clinic;

/// Trait for clinic administration
#[async_trait]
pub trait ClinicServiceTrait: Send + Sync {
    async fn create_clinic(&self, request: CreateClinicRequest) -> Result<Clinic, ServiceError>;
    async fn get_clinic(&self, id: &str) -> Result<Clinic, ServiceError>;
    async fn list_clinics(&self) -> Result<Vec<Clinic>, ServiceError>;
    async fn update_clinic(&self, id: &str, request: UpdateClinicRequest) -> Result<Clinic, ServiceError>;
    async fn delete_clinic(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct ClinicService<R: ClinicRepositoryTrait> {
    repository: R,
}

impl<R: ClinicRepositoryTrait> ClinicService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Clinic with ID {} not found", id))
}

#[async_trait]
impl<R: ClinicRepositoryTrait> ClinicServiceTrait for ClinicService<R> {
    async fn create_clinic(&self, request: CreateClinicRequest) -> Result<Clinic, ServiceError> {
        validate_request(&request)?;

        let record = self
            .repository
            .create(ClinicFields {
                name: request.name,
                address: request.address,
                phone: request.phone,
                email: request.email,
                hfr_id: request.hfr_id,
            })
            .await?;

        info!("Created clinic {} ({})", record.id, record.name);
        Ok(convert_to_domain_clinic(record))
    }

    async fn get_clinic(&self, id: &str) -> Result<Clinic, ServiceError> {
        let record = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_clinic(record))
    }

    async fn list_clinics(&self) -> Result<Vec<Clinic>, ServiceError> {
        let records = self.repository.list().await?;
        Ok(records.into_iter().map(convert_to_domain_clinic).collect())
    }

    async fn update_clinic(&self, id: &str, request: UpdateClinicRequest) -> Result<Clinic, ServiceError> {
        validate_request(&request)?;

        let current = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let fields = ClinicFields {
            name: request.name.unwrap_or(current.name),
            address: request.address.or(current.address),
            phone: request.phone.or(current.phone),
            email: request.email.or(current.email),
            hfr_id: request.hfr_id.or(current.hfr_id),
        };

        let record = self.repository.update(id, fields).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_clinic(record))
    }

    async fn delete_clinic(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }
        info!("Deleted clinic {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_desk_data::database::DatabasePool;
    use clinic_desk_data::repository::ClinicRepository;

    fn service() -> ClinicService<ClinicRepository> {
        ClinicService::new(ClinicRepository::new(DatabasePool::in_memory().unwrap()))
    }

    fn request(name: &str, hfr_id: Option<&str>) -> CreateClinicRequest {
        CreateClinicRequest {
            name: name.to_string(),
            address: Some("12 MG Road, Bengaluru".to_string()),
            phone: Some("+918041234567".to_string()),
            email: Some("desk@sunrise.example".to_string()),
            hfr_id: hfr_id.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_clinic_crud() {
        let service = service();
        let clinic = service.create_clinic(request("Sunrise Clinic", Some("IN2910000001"))).await.unwrap();

        let updated = service
            .update_clinic(
                &clinic.id,
                UpdateClinicRequest {
                    name: Some("Sunrise Family Clinic".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Sunrise Family Clinic");
        assert_eq!(updated.hfr_id.as_deref(), Some("IN2910000001"));

        assert_eq!(service.list_clinics().await.unwrap().len(), 1);

        service.delete_clinic(&clinic.id).await.unwrap();
        assert!(matches!(service.get_clinic(&clinic.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete_clinic(&clinic.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_hfr_id_conflicts() {
        let service = service();
        service.create_clinic(request("A", Some("IN2910000001"))).await.unwrap();
        assert!(matches!(
            service.create_clinic(request("B", Some("IN2910000001"))).await,
            Err(ServiceError::Conflict(_))
        ));
        // Clinics without an HFR id never collide
        service.create_clinic(request("C", None)).await.unwrap();
        service.create_clinic(request("D", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let service = service();
        let mut bad = request("A", None);
        bad.email = Some("not-an-email".to_string());
        let err = service.create_clinic(bad).await.unwrap_err();
        assert!(err.to_string().contains("Invalid email address"));
    }
}

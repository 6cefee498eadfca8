use async_trait::async_trait;
use tracing::info;

use clinic_desk_data::models::referral::{ReferralFields, ReferralFilter};
use clinic_desk_data::repository::ReferralRepositoryTrait;

use super::{validate_request, ServiceError};
use crate::entities::conversions::convert_to_domain_referral;
use crate::entities::referral::{
    CreateReferralRequest, Referral, ReferralListQuery, ReferralStatus, UpdateReferralRequest,
};

#[async_trait]
pub trait ReferralServiceTrait: Send + Sync {
    /// New referrals start out `pending`
    async fn create_referral(&self, request: CreateReferralRequest) -> Result<Referral, ServiceError>;
    async fn get_referral(&self, id: &str) -> Result<Referral, ServiceError>;
    async fn list_referrals(&self, query: ReferralListQuery) -> Result<Vec<Referral>, ServiceError>;
    async fn update_referral(&self, id: &str, request: UpdateReferralRequest) -> Result<Referral, ServiceError>;
    async fn delete_referral(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct ReferralService<R: ReferralRepositoryTrait> {
    repository: R,
}

impl<R: ReferralRepositoryTrait> ReferralService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Referral with ID {} not found", id))
}

#[async_trait]
impl<R: ReferralRepositoryTrait> ReferralServiceTrait for ReferralService<R> {
    async fn create_referral(&self, request: CreateReferralRequest) -> Result<Referral, ServiceError> {
        validate_request(&request)?;

        let record = self
            .repository
            .create(ReferralFields {
                clinic_id: request.clinic_id,
                patient_id: request.patient_id,
                referring_doctor_id: request.referring_doctor_id,
                referred_to_name: request.referred_to_name,
                referred_to_specialty: request.referred_to_specialty,
                referred_to_facility: request.referred_to_facility,
                reason: request.reason,
                status: ReferralStatus::Pending.as_str().to_string(),
                notes: request.notes,
            })
            .await?;

        info!("Patient {} referred to {} ({})", record.patient_id, record.referred_to_name, record.id);
        Ok(convert_to_domain_referral(record)?)
    }

    async fn get_referral(&self, id: &str) -> Result<Referral, ServiceError> {
        let record = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_referral(record)?)
    }

    async fn list_referrals(&self, query: ReferralListQuery) -> Result<Vec<Referral>, ServiceError> {
        let records = self
            .repository
            .list(ReferralFilter {
                clinic_id: query.clinic_id,
                patient_id: query.patient_id,
                status: query.status.map(|s| s.as_str().to_string()),
            })
            .await?;
        Ok(records
            .into_iter()
            .map(convert_to_domain_referral)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_referral(&self, id: &str, request: UpdateReferralRequest) -> Result<Referral, ServiceError> {
        validate_request(&request)?;

        let current = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let current = convert_to_domain_referral(current)?;

        let status = match request.status {
            Some(next) if next != current.status => {
                if !current.status.can_transition_to(next) {
                    return Err(ServiceError::InvalidState(format!(
                        "Cannot move referral from {} to {}",
                        current.status, next
                    )));
                }
                info!("Referral {}: {} -> {}", id, current.status, next);
                next
            }
            _ => current.status,
        };

        let record = self
            .repository
            .update(
                id,
                ReferralFields {
                    clinic_id: current.clinic_id,
                    patient_id: current.patient_id,
                    referring_doctor_id: current.referring_doctor_id,
                    referred_to_name: request.referred_to_name.unwrap_or(current.referred_to_name),
                    referred_to_specialty: request.referred_to_specialty.or(current.referred_to_specialty),
                    referred_to_facility: request.referred_to_facility.or(current.referred_to_facility),
                    reason: request.reason.unwrap_or(current.reason),
                    status: status.as_str().to_string(),
                    notes: request.notes.or(current.notes),
                },
            )
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_referral(record)?)
    }

    async fn delete_referral(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }
        Ok(())
    }
}

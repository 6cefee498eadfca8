use async_trait::async_trait;
use tracing::{info, warn};

use clinic_desk_data::models::template::{TemplateFields, TemplateFilter};
use clinic_desk_data::repository::TemplateRepositoryTrait;

use super::{validate_request, validation_message, ServiceError};
use crate::entities::conversions::convert_to_domain_template;
use crate::entities::template::{
    CreateTemplateRequest, Template, TemplateContent, TemplateListQuery, TemplateType, UpdateTemplateRequest,
};

/// Trait for managing clinic templates
#[async_trait]
pub trait TemplateServiceTrait: Send + Sync {
    async fn create_template(&self, request: CreateTemplateRequest) -> Result<Template, ServiceError>;
    async fn get_template(&self, id: &str) -> Result<Template, ServiceError>;
    async fn list_templates(&self, query: TemplateListQuery) -> Result<Vec<Template>, ServiceError>;
    async fn update_template(&self, id: &str, request: UpdateTemplateRequest) -> Result<Template, ServiceError>;
    async fn delete_template(&self, id: &str) -> Result<(), ServiceError>;
}

pub struct TemplateService<R: TemplateRepositoryTrait> {
    repository: R,
}

impl<R: TemplateRepositoryTrait> TemplateService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Template with ID {} not found", id))
}

/// Parse and validate request content, returning the text to store
pub fn parse_content(template_type: TemplateType, value: serde_json::Value) -> Result<String, ServiceError> {
    let content = TemplateContent::from_value(template_type, value).map_err(|e| {
        ServiceError::Validation(format!("content: not a valid {} template: {}", template_type, e))
    })?;
    content
        .validate_content()
        .map_err(|errors| ServiceError::Validation(format!("content: {}", validation_message(&errors))))?;
    content
        .to_json()
        .map_err(|e| ServiceError::Internal(format!("Failed to serialize template content: {}", e)))
}

#[async_trait]
impl<R: TemplateRepositoryTrait> TemplateServiceTrait for TemplateService<R> {
    async fn create_template(&self, request: CreateTemplateRequest) -> Result<Template, ServiceError> {
        validate_request(&request)?;
        let content = parse_content(request.template_type, request.content)?;

        let record = self
            .repository
            .create(TemplateFields {
                clinic_id: request.clinic_id,
                doctor_id: request.doctor_id,
                name: request.name.trim().to_string(),
                template_type: request.template_type.as_str().to_string(),
                content,
            })
            .await
            .map_err(|e| {
                warn!("Template not created: {}", e);
                e
            })?;

        info!("Created {} template {} ({})", record.template_type, record.id, record.name);
        Ok(convert_to_domain_template(record)?)
    }

    async fn get_template(&self, id: &str) -> Result<Template, ServiceError> {
        let record = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_template(record)?)
    }

    async fn list_templates(&self, query: TemplateListQuery) -> Result<Vec<Template>, ServiceError> {
        let records = self
            .repository
            .list(TemplateFilter {
                clinic_id: query.clinic_id,
                doctor_id: query.doctor_id,
                template_type: query.template_type.map(|t| t.as_str().to_string()),
            })
            .await?;

        Ok(records
            .into_iter()
            .map(convert_to_domain_template)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update_template(&self, id: &str, request: UpdateTemplateRequest) -> Result<Template, ServiceError> {
        validate_request(&request)?;

        let current = self.repository.get_by_id(id).await?.ok_or_else(|| not_found(id))?;
        let template_type: TemplateType = current.template_type.parse().map_err(|e: String| {
            tracing::error!("Template {} has a corrupt type: {}", id, e);
            ServiceError::Internal(e)
        })?;

        let content = match request.content {
            Some(value) => parse_content(template_type, value)?,
            None => current.content,
        };

        let record = self
            .repository
            .update(
                id,
                TemplateFields {
                    clinic_id: current.clinic_id,
                    doctor_id: current.doctor_id,
                    name: request.name.map(|n| n.trim().to_string()).unwrap_or(current.name),
                    template_type: current.template_type,
                    content,
                },
            )
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(convert_to_domain_template(record)?)
    }

    async fn delete_template(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }
        info!("Deleted template {}", id);
        Ok(())
    }
}

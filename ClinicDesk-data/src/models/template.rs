use serde::{Deserialize, Serialize};

/// Storage model for a clinic template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    pub clinic_id: String,
    pub doctor_id: Option<String>,
    pub name: String,
    /// `prescription`, `advice` or `billing`
    pub template_type: String,
    /// JSON document, shape depends on `template_type`
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Writable template columns
#[derive(Debug, Clone)]
pub struct TemplateFields {
    pub clinic_id: String,
    pub doctor_id: Option<String>,
    pub name: String,
    pub template_type: String,
    pub content: String,
}

/// Filter for listing templates
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub clinic_id: Option<String>,
    pub doctor_id: Option<String>,
    pub template_type: Option<String>,
}

//! Clinic templates
//!
//! A template's `content` is a JSON document whose shape depends on its type.
//! It is checked against the typed structs below on every write and parsed
//! back into them on every read.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::prescription::Medicine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Prescription,
    Advice,
    Billing,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Prescription => "prescription",
            TemplateType::Advice => "advice",
            TemplateType::Billing => "billing",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prescription" => Ok(TemplateType::Prescription),
            "advice" => Ok(TemplateType::Advice),
            "billing" => Ok(TemplateType::Billing),
            other => Err(format!("Unknown template type: {}", other)),
        }
    }
}

/// Content of a `prescription` template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionTemplateContent {
    #[validate(length(min = 1, message = "A prescription template needs at least one medicine"))]
    pub medicines: Vec<Medicine>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

/// Content of an `advice` template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AdviceTemplateContent {
    #[validate(length(min = 1, max = 5000, message = "Advice text must be between 1 and 5000 characters"))]
    pub text: String,
}

/// A billable line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BillingItem {
    #[validate(length(min = 1, max = 200, message = "Item description must be between 1 and 200 characters"))]
    pub description: String,

    #[validate(range(min = 0.0, message = "Amount cannot be negative"))]
    pub amount: f64,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

/// Content of a `billing` template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BillingTemplateContent {
    #[validate(length(min = 1, message = "A billing template needs at least one item"))]
    pub items: Vec<BillingItem>,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0, message = "Tax percent must be between 0 and 100"))]
    pub tax_percent: f64,
}

impl BillingTemplateContent {
    /// Sum of `amount * quantity`
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|item| item.amount * item.quantity as f64).sum()
    }

    /// Subtotal plus tax, rounded to paise
    pub fn total(&self) -> f64 {
        let total = self.subtotal() * (1.0 + self.tax_percent / 100.0);
        (total * 100.0).round() / 100.0
    }
}

/// Typed template content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateContent {
    Prescription(PrescriptionTemplateContent),
    Advice(AdviceTemplateContent),
    Billing(BillingTemplateContent),
}

impl TemplateContent {
    /// Interpret a JSON document as content of the given type
    pub fn from_value(template_type: TemplateType, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match template_type {
            TemplateType::Prescription => TemplateContent::Prescription(serde_json::from_value(value)?),
            TemplateType::Advice => TemplateContent::Advice(serde_json::from_value(value)?),
            TemplateType::Billing => TemplateContent::Billing(serde_json::from_value(value)?),
        })
    }

    /// Parse stored content text
    pub fn from_json(template_type: TemplateType, raw: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Self::from_value(template_type, value)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn validate_content(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            TemplateContent::Prescription(content) => {
                content.validate()?;
                for medicine in &content.medicines {
                    medicine.validate()?;
                }
                Ok(())
            }
            TemplateContent::Advice(content) => content.validate(),
            TemplateContent::Billing(content) => {
                content.validate()?;
                for item in &content.items {
                    item.validate()?;
                }
                Ok(())
            }
        }
    }

    pub fn billing_total(&self) -> Option<f64> {
        match self {
            TemplateContent::Billing(content) => Some(content.total()),
            _ => None,
        }
    }
}

/// A stored template
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Template {
    pub id: String,

    pub clinic_id: String,

    /// Owning doctor; clinic-wide when absent
    pub doctor_id: Option<String>,

    pub name: String,

    pub template_type: TemplateType,

    /// Type-specific JSON document
    #[schema(value_type = Object)]
    pub content: TemplateContent,

    /// Billing templates only: subtotal plus tax
    pub billing_total: Option<f64>,

    pub created_at: String,

    pub updated_at: String,
}

/// Request payload for creating a template
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, message = "Clinic id is required"))]
    pub clinic_id: String,

    pub doctor_id: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Template name must be between 1 and 100 characters"))]
    pub name: String,

    pub template_type: TemplateType,

    #[schema(value_type = Object)]
    pub content: serde_json::Value,
}

/// Request payload for updating a template; the type cannot change
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 100, message = "Template name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[schema(value_type = Option<Object>)]
    pub content: Option<serde_json::Value>,
}

/// Query parameters for listing templates
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TemplateListQuery {
    pub clinic_id: Option<String>,

    pub doctor_id: Option<String>,

    pub template_type: Option<TemplateType>,
}

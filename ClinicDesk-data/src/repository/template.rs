use async_trait::async_trait;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;

use super::errors::RepositoryError;
use super::sql::{new_id, now_rfc3339, Filters};
use crate::database::DatabasePool;
use crate::models::template::{TemplateFields, TemplateFilter, TemplateRecord};

const COLUMNS: &str = "id, clinic_id, doctor_id, name, template_type, content, created_at, updated_at";

/// Repository trait for clinic templates
#[async_trait]
pub trait TemplateRepositoryTrait: Send + Sync {
    async fn create(&self, fields: TemplateFields) -> Result<TemplateRecord, RepositoryError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<TemplateRecord>, RepositoryError>;
    async fn list(&self, filter: TemplateFilter) -> Result<Vec<TemplateRecord>, RepositoryError>;
    async fn update(&self, id: &str, fields: TemplateFields) -> Result<Option<TemplateRecord>, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite repository for templates
#[derive(Debug, Clone)]
pub struct TemplateRepository {
    pool: DatabasePool,
}

impl TemplateRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<TemplateRecord> {
    Ok(TemplateRecord {
        id: row.get("id")?,
        clinic_id: row.get("clinic_id")?,
        doctor_id: row.get("doctor_id")?,
        name: row.get("name")?,
        template_type: row.get("template_type")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl TemplateRepositoryTrait for TemplateRepository {
    async fn create(&self, fields: TemplateFields) -> Result<TemplateRecord, RepositoryError> {
        let now = now_rfc3339();
        let record = TemplateRecord {
            id: new_id(),
            clinic_id: fields.clinic_id,
            doctor_id: fields.doctor_id,
            name: fields.name,
            template_type: fields.template_type,
            content: fields.content,
            created_at: now.clone(),
            updated_at: now,
        };
        debug!("Creating {} template {:?}", record.template_type, record.name);

        let conn = self.pool.get()?;
        conn.execute(
            &format!("INSERT INTO templates ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", COLUMNS),
            params![
                record.id,
                record.clinic_id,
                record.doctor_id,
                record.name,
                record.template_type,
                record.content,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<TemplateRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let template = conn
            .query_row(&format!("SELECT {} FROM templates WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(template)
    }

    async fn list(&self, filter: TemplateFilter) -> Result<Vec<TemplateRecord>, RepositoryError> {
        let mut filters = Filters::new();
        filters
            .eq_text("clinic_id", filter.clinic_id.as_deref())
            .eq_text("doctor_id", filter.doctor_id.as_deref())
            .eq_text("template_type", filter.template_type.as_deref());

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM templates{} ORDER BY template_type, name",
            COLUMNS,
            filters.where_sql()
        ))?;
        let templates = stmt
            .query_map(params_from_iter(filters.values()), map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    async fn update(&self, id: &str, fields: TemplateFields) -> Result<Option<TemplateRecord>, RepositoryError> {
        debug!("Updating template: {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE templates SET clinic_id = ?1, doctor_id = ?2, name = ?3, template_type = ?4, content = ?5,
                    updated_at = ?6
             WHERE id = ?7",
            params![
                fields.clinic_id,
                fields.doctor_id,
                fields.name,
                fields.template_type,
                fields.content,
                now_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        let template = conn
            .query_row(&format!("SELECT {} FROM templates WHERE id = ?1", COLUMNS), params![id], map_row)
            .optional()?;
        Ok(template)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

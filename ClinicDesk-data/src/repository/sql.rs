// Helpers shared by the SQLite repositories

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value;
use uuid::Uuid;

/// Generate a fresh row id
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time as stored in timestamp columns
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `%text%` pattern for `LIKE ... ESCAPE '\'` with the wildcards in `text` escaped
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Builder for optional `WHERE` clauses with positional parameters
#[derive(Debug, Default)]
pub(crate) struct Filters {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `column = ?` when a value is present
    pub fn eq_text(&mut self, column: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.clauses.push(format!("{} = ?", column));
            self.values.push(Value::Text(value.to_string()));
        }
        self
    }

    /// Add `column = ?` for a boolean column
    pub fn eq_bool(&mut self, column: &str, value: Option<bool>) -> &mut Self {
        if let Some(value) = value {
            self.clauses.push(format!("{} = ?", column));
            self.values.push(Value::Integer(value as i64));
        }
        self
    }

    /// Add an arbitrary clause together with its parameters
    pub fn clause(&mut self, clause: &str, values: Vec<Value>) -> &mut Self {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
        self
    }

    /// The `WHERE ...` fragment, empty when no filter applies
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Parameters followed by `LIMIT ? OFFSET ?` values; a negative limit means no limit
    pub fn paged_values(&self, limit: Option<usize>, offset: Option<usize>) -> Vec<Value> {
        let mut values = self.values.clone();
        values.push(Value::Integer(limit.map(|l| l as i64).unwrap_or(-1)));
        values.push(Value::Integer(offset.unwrap_or(0) as i64));
        values
    }
}

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AppError;

/// A fully-qualified `database.schema.table` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableIdentifier {
    database: String,
    schema: String,
    name: String,
    raw: String,
}

impl TableIdentifier {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        let parts = trimmed.split('.').collect::<Vec<_>>();
        if parts.len() != 3 {
            return Err(AppError::input(format!(
                "Invalid table identifier '{}': expected database.schema.table",
                raw
            )));
        }
        if let Some(position) = parts.iter().position(|part| part.trim().is_empty()) {
            let segment = ["database", "schema", "table"][position];
            return Err(AppError::input(format!(
                "Invalid table identifier '{}': {} segment is empty",
                raw, segment
            )));
        }

        Ok(Self {
            database: parts[0].to_string(),
            schema: parts[1].to_string(),
            name: parts[2].to_string(),
            raw: trimmed.to_string(),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identifier as given by the user, passed verbatim into SQL.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl FromStr for TableIdentifier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

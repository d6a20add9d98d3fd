use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AppError, ErrorKind};

/// SQL variants with a bundled template set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    SqlServer,
    BigQuery,
}

impl Dialect {
    pub const ALL: &'static [Dialect] = &[Dialect::SqlServer, Dialect::BigQuery];

    /// Template directory name for this dialect.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::SqlServer => "sqlserver",
            Dialect::BigQuery => "bigquery",
        }
    }

    /// Whether this build ships a connection adapter for the dialect.
    pub fn has_adapter(self) -> bool {
        matches!(self, Dialect::SqlServer)
    }
}

impl FromStr for Dialect {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" | "tsql" => Ok(Dialect::SqlServer),
            "bigquery" | "bq" => Ok(Dialect::BigQuery),
            other => Err(AppError::new(
                ErrorKind::UnsupportedDialect,
                format!(
                    "Unknown dialect '{}' (known: {})",
                    other,
                    Dialect::ALL
                        .iter()
                        .map(|d| d.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::db::{ResultSet, Value};
use crate::error::AppError;

pub const RECORDS_FIELD: &str = "records";
const MISMATCHES_SUFFIX: &str = "__mismatches";

/// Per-column mismatch counts from the summary stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MismatchSummary {
    pub records: u64,
    pub columns: IndexMap<String, u64>,
}

impl MismatchSummary {
    /// Reduce the single summary row. `columns` fixes the display order.
    pub fn from_result(set: &ResultSet, columns: &[String]) -> Result<Self> {
        if set.rows.len() != 1 {
            return Err(AppError::internal(format!(
                "Summary query returned {} rows, expected exactly 1",
                set.rows.len()
            ))
            .into());
        }
        let row = set
            .rows()
            .next()
            .ok_or_else(|| AppError::internal("Summary query returned no rows"))?;

        let records = count_or_zero(row.require(RECORDS_FIELD)?, RECORDS_FIELD)?;
        let mut counts = IndexMap::with_capacity(columns.len());
        for column in columns {
            let field = format!("{}{}", column, MISMATCHES_SUFFIX);
            let count = count_or_zero(row.require(&field)?, &field)?;
            counts.insert(column.clone(), count);
        }

        Ok(Self {
            records,
            columns: counts,
        })
    }

    pub fn has_mismatches(&self) -> bool {
        self.columns.values().any(|count| *count > 0)
    }

    pub fn mismatched_columns(&self) -> impl Iterator<Item = (&str, u64)> {
        self.columns
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, count)| (name.as_str(), *count))
    }

    /// `name: count` lines, names right-aligned to the longest name plus two.
    pub fn render_lines(&self) -> Vec<String> {
        let width = 2 + self.columns.keys().map(|name| name.chars().count()).max().unwrap_or(0);
        self.columns
            .iter()
            .map(|(name, count)| format!("{:>width$}: {}", name, count, width = width))
            .collect()
    }
}

// SUM over an empty table is NULL.
fn count_or_zero(value: &Value, field: &str) -> Result<u64> {
    if value.is_null() {
        return Ok(0);
    }
    value.as_count().ok_or_else(|| {
        AppError::internal(format!(
            "Summary field '{}' is not a non-negative integer: {:?}",
            field, value
        ))
        .into()
    })
}

/// Row-level output of the detail stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MismatchDetail {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl MismatchDetail {
    pub fn from_result(set: ResultSet) -> Self {
        Self {
            headers: set.column_names(),
            rows: set.rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::db::{FromRow, Row};
use crate::error::AppError;

/// One column as reported by schema introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub ordinal_position: u64,
    pub data_type: String,
}

impl FromRow for Column {
    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            name: row.text("column_name")?,
            ordinal_position: row.count("ordinal_position")?,
            data_type: row.text("data_type")?,
        })
    }
}

/// Column name to column, in introspection order.
///
/// Equality ignores order: two schemas are equal when they hold the same
/// names with identical positions and types.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TableSchema {
    columns: IndexMap<String, Column>,
}

impl TableSchema {
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut map = IndexMap::with_capacity(columns.len());
        for column in columns {
            if map.contains_key(&column.name) {
                return Err(AppError::internal(format!(
                    "Schema introspection returned column '{}' twice",
                    column.name
                ))
                .into());
            }
            map.insert(column.name.clone(), column);
        }
        Ok(Self { columns: map })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Exact match first, then ASCII case-insensitive.
    pub fn find(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).or_else(|| {
            self.columns
                .values()
                .find(|column| column.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Name-level differences between `self` (table 1) and `other` (table 2).
    pub fn diff(&self, other: &TableSchema) -> SchemaDiff {
        let mut diff = SchemaDiff::default();
        for (name, left) in &self.columns {
            match other.columns.get(name) {
                Some(right) if right != left => diff.changed.push(ColumnChange {
                    name: name.clone(),
                    table_1: left.clone(),
                    table_2: right.clone(),
                }),
                Some(_) => {}
                None => diff.only_in_table_1.push(name.clone()),
            }
        }
        diff.only_in_table_2 = other
            .columns
            .keys()
            .filter(|name| !self.columns.contains_key(*name))
            .cloned()
            .collect();
        diff
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChange {
    pub name: String,
    pub table_1: Column,
    pub table_2: Column,
}

impl ColumnChange {
    /// `type int vs bigint, position 1 vs 2` style summary.
    pub fn differences(&self) -> String {
        let mut parts = Vec::new();
        if self.table_1.data_type != self.table_2.data_type {
            parts.push(format!(
                "type {} vs {}",
                self.table_1.data_type, self.table_2.data_type
            ));
        }
        if self.table_1.ordinal_position != self.table_2.ordinal_position {
            parts.push(format!(
                "position {} vs {}",
                self.table_1.ordinal_position, self.table_2.ordinal_position
            ));
        }
        parts.join(", ")
    }

    pub fn describe(&self) -> String {
        format!("{}: {}", self.name, self.differences())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiff {
    pub changed: Vec<ColumnChange>,
    pub only_in_table_1: Vec<String>,
    pub only_in_table_2: Vec<String>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.only_in_table_1.is_empty() && self.only_in_table_2.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, position: u64, data_type: &str) -> Column {
        Column {
            name: name.to_string(),
            ordinal_position: position,
            data_type: data_type.to_string(),
        }
    }

    fn schema(columns: &[(&str, u64, &str)]) -> TableSchema {
        TableSchema::from_columns(
            columns
                .iter()
                .map(|(name, position, data_type)| col(name, *position, data_type))
                .collect(),
        )
        .expect("schema")
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = schema(&[("id", 1, "int"), ("name", 2, "varchar")]);
        let b = schema(&[("name", 2, "varchar"), ("id", 1, "int")]);
        assert_eq!(a, b);
        assert!(a.diff(&b).is_empty());
        assert_eq!(a.names(), vec!["id", "name"]);
    }

    #[test]
    fn any_attribute_difference_breaks_equality() {
        let base = schema(&[("id", 1, "int"), ("name", 2, "varchar")]);
        let retyped = schema(&[("id", 1, "bigint"), ("name", 2, "varchar")]);
        let moved = schema(&[("id", 2, "int"), ("name", 1, "varchar")]);
        let renamed = schema(&[("id", 1, "int"), ("title", 2, "varchar")]);

        assert_ne!(base, retyped);
        assert_ne!(base, moved);
        assert_ne!(base, renamed);
    }

    #[test]
    fn diff_reports_changes_and_one_sided_columns() {
        let left = schema(&[("id", 1, "int"), ("name", 2, "varchar"), ("old", 3, "int")]);
        let right = schema(&[("id", 1, "bigint"), ("name", 2, "varchar"), ("new", 3, "int")]);
        let diff = left.diff(&right);

        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].describe(), "id: type int vs bigint");
        assert_eq!(diff.only_in_table_1, vec!["old"]);
        assert_eq!(diff.only_in_table_2, vec!["new"]);
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let result = TableSchema::from_columns(vec![col("id", 1, "int"), col("id", 2, "int")]);
        assert!(result.is_err());
    }

    #[test]
    fn find_falls_back_to_case_insensitive() {
        let s = schema(&[("CustomerId", 1, "int")]);
        assert_eq!(s.find("customerid").map(|c| c.name.as_str()), Some("CustomerId"));
        assert!(s.get("customerid").is_none());
    }
}

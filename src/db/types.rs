use anyhow::Result;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_csv(&self) -> String {
        match self {
            Value::Null => "".to_string(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Text(value) => value.clone(),
        }
    }

    /// Interpret the value as a non-negative count.
    ///
    /// Numeric types arrive as text from some drivers (DECIMAL sums), so
    /// integral text is accepted as well.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Value::Int(v) => (*v).try_into().ok(),
            Value::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Some(*v as u64),
            Value::Text(s) => {
                let s = s.trim();
                let s = s.strip_suffix(".0").unwrap_or(s);
                s.parse::<u64>().ok()
            }
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultColumn {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ResultColumn {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub columns: Vec<ResultColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    /// Case-insensitive lookup; warehouses disagree on identifier casing.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| col.name == name)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|col| col.name.eq_ignore_ascii_case(name))
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row { set: self, values })
    }

    /// Convert every row into `T`.
    pub fn decode<T: FromRow>(&self) -> Result<Vec<T>> {
        self.rows().map(|row| T::from_row(&row)).collect()
    }
}

/// A borrowed row with access to its values by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    set: &'a ResultSet,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.set
            .column_index(name)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn require(&self, name: &str) -> Result<&'a Value> {
        self.get(name).ok_or_else(|| {
            AppError::internal(format!("Result is missing expected column '{}'", name)).into()
        })
    }

    pub fn text(&self, name: &str) -> Result<String> {
        match self.require(name)? {
            Value::Text(value) => Ok(value.clone()),
            Value::Null => Err(AppError::internal(format!("Column '{}' is NULL", name)).into()),
            other => Ok(other.as_csv()),
        }
    }

    pub fn count(&self, name: &str) -> Result<u64> {
        let value = self.require(name)?;
        value.as_count().ok_or_else(|| {
            AppError::internal(format!(
                "Column '{}' is not a non-negative integer: {:?}",
                name, value
            ))
            .into()
        })
    }
}

/// Explicit conversion from a driver row into a typed record.
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> Result<Self>;
}

pub fn format_number(value: i64) -> String {
    let digits = value.abs().to_string().chars().rev().collect::<Vec<_>>();
    let mut out = String::new();
    for (idx, ch) in digits.iter().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(*ch);
    }
    let mut out: String = out.chars().rev().collect();
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

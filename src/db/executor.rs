use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use tiberius::{ColumnData, FromSql, QueryItem};

use crate::db::types::{ResultColumn, ResultSet, Value};
use crate::error::{AppError, ErrorKind};

pub type TdsClient = tiberius::Client<tokio_util::compat::Compat<tokio::net::TcpStream>>;

/// Run a (possibly multi-statement) batch and collect every result set it produced.
pub async fn run_query(query: tiberius::Query<'_>, client: &mut TdsClient) -> Result<Vec<ResultSet>> {
    let stream = query
        .query(client)
        .await
        .map_err(|err| AppError::new(ErrorKind::Query, err.to_string()))?;
    collect_result_sets(stream).await
}

/// Drain the stream, opening a new result set at every metadata token so
/// that a query returning no rows still reports its column names.
pub async fn collect_result_sets(mut stream: tiberius::QueryStream<'_>) -> Result<Vec<ResultSet>> {
    let mut output: Vec<ResultSet> = Vec::new();

    while let Some(item) = stream
        .try_next()
        .await
        .map_err(|err| AppError::new(ErrorKind::Query, err.to_string()))?
    {
        match item {
            QueryItem::Metadata(meta) => output.push(ResultSet {
                columns: meta
                    .columns()
                    .iter()
                    .map(|col| ResultColumn {
                        name: col.name().to_string(),
                        data_type: Some(format!("{:?}", col.column_type())),
                    })
                    .collect(),
                rows: Vec::new(),
            }),
            QueryItem::Row(row) => {
                let values = row.into_iter().map(|data| map_column_data(&data)).collect();
                match output.last_mut() {
                    Some(set) => set.rows.push(values),
                    None => {
                        return Err(AppError::internal("Row received before result metadata").into());
                    }
                }
            }
        }
    }

    Ok(output)
}

fn map_column_data(data: &ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(value) => value.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        ColumnData::I16(value) => value.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        ColumnData::I32(value) => value.map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        ColumnData::I64(value) => value.map(Value::Int).unwrap_or(Value::Null),
        ColumnData::F32(value) => value.map(|v| Value::Float(v as f64)).unwrap_or(Value::Null),
        ColumnData::F64(value) => value.map(Value::Float).unwrap_or(Value::Null),
        ColumnData::Bit(value) => value.map(Value::Bool).unwrap_or(Value::Null),
        ColumnData::String(value) => value
            .as_ref()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Guid(value) => value
            .as_ref()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Binary(value) => value
            .as_ref()
            .map(|v| Value::Text(hex(v)))
            .unwrap_or(Value::Null),
        ColumnData::Numeric(value) => value
            .as_ref()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Xml(value) => value
            .as_ref()
            .map(|v| Value::Text(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) => temporal::<NaiveDateTime>(data),
        #[cfg(feature = "tds73")]
        ColumnData::DateTime2(_) => temporal::<NaiveDateTime>(data),
        #[cfg(feature = "tds73")]
        ColumnData::Date(_) => temporal::<NaiveDate>(data),
        #[cfg(feature = "tds73")]
        ColumnData::Time(_) => temporal::<NaiveTime>(data),
        #[cfg(feature = "tds73")]
        ColumnData::DateTimeOffset(_) => temporal::<DateTime<FixedOffset>>(data),
    }
}

// Date/time values are compared as text in the report, chrono's Display is ISO-like.
fn temporal<T>(data: &ColumnData<'static>) -> Value
where
    T: for<'a> FromSql<'a> + ToString,
{
    match T::from_sql(data) {
        Ok(Some(value)) => Value::Text(value.to_string()),
        Ok(None) => Value::Null,
        Err(err) => {
            tracing::warn!("Failed to decode temporal value: {}", err);
            Value::Null
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes {
        out.push_str(&format!("{:02X}", byte));
    }
    out
}

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::db::{Connection, ResultSet};
use crate::dialect::Dialect;
use crate::diff::identifier::TableIdentifier;
use crate::diff::schema::{Column, SchemaDiff, TableSchema};
use crate::diff::summary::{MismatchDetail, MismatchSummary};
use crate::error::AppError;
use crate::output::csv::write_mismatch_report;
use crate::queries::{JoinPlan, QueryBuilder, QueryKind};

const ROW_COUNT_FIELD: &str = "row_count";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SchemaCheck,
    RowCountCheck,
    SummaryCheck,
    DetailCheck,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::SchemaCheck => "schema-check",
            Stage::RowCountCheck => "row-count-check",
            Stage::SummaryCheck => "summary-check",
            Stage::DetailCheck => "detail-check",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a single comparison run needs besides the connection.
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub table_1: TableIdentifier,
    pub table_2: TableIdentifier,
    pub primary_keys: Vec<String>,
    pub report_path: PathBuf,
}

impl ComparisonRequest {
    /// Primary keys are trimmed; the list must be non-empty, without blanks
    /// or (case-insensitive) duplicates.
    pub fn new(
        table_1: TableIdentifier,
        table_2: TableIdentifier,
        primary_keys: &[String],
        report_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            table_1,
            table_2,
            primary_keys: validate_primary_keys(primary_keys)?,
            report_path: report_path.into(),
        })
    }
}

fn validate_primary_keys(keys: &[String]) -> Result<Vec<String>> {
    if keys.is_empty() {
        return Err(AppError::input("At least one primary key column is required").into());
    }
    let mut validated: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::input("Primary key column names cannot be empty").into());
        }
        if validated.iter().any(|seen| seen.eq_ignore_ascii_case(key)) {
            return Err(
                AppError::input(format!("Primary key column '{}' is listed twice", key)).into(),
            );
        }
        validated.push(key.to_string());
    }
    Ok(validated)
}

/// Outcome of a completed comparison. Errors are reported separately.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Verdict {
    Match {
        row_count: u64,
        summary: MismatchSummary,
    },
    SchemaMismatch {
        table_1: TableSchema,
        table_2: TableSchema,
        diff: SchemaDiff,
    },
    RowCountMismatch {
        table_1: u64,
        table_2: u64,
    },
    ContentMismatch {
        row_count: u64,
        summary: MismatchSummary,
        report_path: PathBuf,
        mismatched_rows: usize,
    },
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match { .. })
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_match() { 0 } else { 1 }
    }
}

enum Step<T> {
    Continue(T),
    Stop(Verdict),
}

/// Drives the staged protocol over a borrowed connection.
///
/// Stages run strictly in order and each stops the run on the first
/// structural difference, so later (more expensive) queries only run when
/// every earlier check passed.
pub struct ComparisonContext<'a, C: Connection + ?Sized> {
    queries: &'a QueryBuilder,
    connection: &'a mut C,
}

impl<'a, C: Connection + ?Sized> ComparisonContext<'a, C> {
    pub fn new(queries: &'a QueryBuilder, connection: &'a mut C) -> Self {
        Self {
            queries,
            connection,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.queries.dialect()
    }

    pub fn run(&mut self, request: &ComparisonRequest) -> Result<Verdict> {
        tracing::info!(
            dialect = %self.dialect(),
            table_1 = %request.table_1,
            table_2 = %request.table_2,
            "starting comparison"
        );

        let (schema, primary_keys) = match self.schema_check(request)? {
            Step::Continue(value) => value,
            Step::Stop(verdict) => return Ok(verdict),
        };
        let row_count = match self.row_count_check(request)? {
            Step::Continue(count) => count,
            Step::Stop(verdict) => return Ok(verdict),
        };

        let columns = schema.names();
        let plan = JoinPlan {
            table_1: &request.table_1,
            table_2: &request.table_2,
            primary_keys: &primary_keys,
            columns: &columns,
        };

        let summary = self.summary_check(&plan)?;
        if !summary.has_mismatches() {
            return Ok(Verdict::Match { row_count, summary });
        }

        let mismatched_rows = self.detail_check(&plan, request)?;
        Ok(Verdict::ContentMismatch {
            row_count,
            summary,
            report_path: request.report_path.clone(),
            mismatched_rows,
        })
    }

    fn schema_check(
        &mut self,
        request: &ComparisonRequest,
    ) -> Result<Step<(TableSchema, Vec<String>)>> {
        let started = Instant::now();
        let schema_1 = self.fetch_schema(&request.table_1)?;
        let schema_2 = self.fetch_schema(&request.table_2)?;

        if schema_1 != schema_2 {
            let diff = schema_1.diff(&schema_2);
            tracing::info!(
                stage = %Stage::SchemaCheck,
                elapsed_ms = started.elapsed().as_millis() as u64,
                changed = diff.changed.len(),
                only_in_table_1 = diff.only_in_table_1.len(),
                only_in_table_2 = diff.only_in_table_2.len(),
                "schemas differ"
            );
            return Ok(Step::Stop(Verdict::SchemaMismatch {
                table_1: schema_1,
                table_2: schema_2,
                diff,
            }));
        }

        let primary_keys = resolve_primary_keys(&schema_1, &request.primary_keys, &request.table_1)?;
        tracing::info!(
            stage = %Stage::SchemaCheck,
            elapsed_ms = started.elapsed().as_millis() as u64,
            columns = schema_1.len(),
            "schemas match"
        );
        Ok(Step::Continue((schema_1, primary_keys)))
    }

    fn fetch_schema(&mut self, table: &TableIdentifier) -> Result<TableSchema> {
        let sql = self.queries.get_columns(table)?;
        let set = self.execute(Stage::SchemaCheck, QueryKind::GetColumns, &sql)?;
        let mut columns = set.decode::<Column>()?;
        if columns.is_empty() {
            return Err(AppError::input(format!(
                "Table '{}' was not found or has no columns",
                table
            ))
            .into());
        }
        columns.sort_by_key(|column| column.ordinal_position);
        TableSchema::from_columns(columns)
    }

    fn row_count_check(&mut self, request: &ComparisonRequest) -> Result<Step<u64>> {
        let started = Instant::now();
        let count_1 = self.fetch_row_count(&request.table_1)?;
        let count_2 = self.fetch_row_count(&request.table_2)?;
        tracing::info!(
            stage = %Stage::RowCountCheck,
            elapsed_ms = started.elapsed().as_millis() as u64,
            table_1 = count_1,
            table_2 = count_2,
            "row counts fetched"
        );

        if count_1 != count_2 {
            return Ok(Step::Stop(Verdict::RowCountMismatch {
                table_1: count_1,
                table_2: count_2,
            }));
        }
        Ok(Step::Continue(count_1))
    }

    fn fetch_row_count(&mut self, table: &TableIdentifier) -> Result<u64> {
        let sql = self.queries.get_row_count(table)?;
        let set = self.execute(Stage::RowCountCheck, QueryKind::GetRowCount, &sql)?;
        if set.rows.len() != 1 {
            return Err(AppError::internal(format!(
                "Row count query for '{}' returned {} rows, expected exactly 1",
                table,
                set.rows.len()
            ))
            .into());
        }
        let row = set
            .rows()
            .next()
            .ok_or_else(|| AppError::internal("Row count query returned no rows"))?;
        row.count(ROW_COUNT_FIELD)
    }

    fn summary_check(&mut self, plan: &JoinPlan<'_>) -> Result<MismatchSummary> {
        let started = Instant::now();
        let sql = self.queries.summary_batch(plan)?;
        let set = self.execute(Stage::SummaryCheck, QueryKind::CompareSummary, &sql)?;
        let summary = MismatchSummary::from_result(&set, plan.columns)?;
        tracing::info!(
            stage = %Stage::SummaryCheck,
            elapsed_ms = started.elapsed().as_millis() as u64,
            records = summary.records,
            mismatched_columns = summary.mismatched_columns().count(),
            "summary computed"
        );
        Ok(summary)
    }

    fn detail_check(&mut self, plan: &JoinPlan<'_>, request: &ComparisonRequest) -> Result<usize> {
        let started = Instant::now();
        let sql = self.queries.detail_batch(plan)?;
        let set = self.execute(Stage::DetailCheck, QueryKind::CompareDetail, &sql)?;
        let detail = MismatchDetail::from_result(set);
        write_mismatch_report(&request.report_path, &detail)?;
        tracing::info!(
            stage = %Stage::DetailCheck,
            elapsed_ms = started.elapsed().as_millis() as u64,
            rows = detail.len(),
            report = %request.report_path.display(),
            "mismatch report written"
        );
        Ok(detail.len())
    }

    fn execute(&mut self, stage: Stage, kind: QueryKind, sql: &str) -> Result<ResultSet> {
        tracing::debug!(stage = %stage, query = %kind, "executing");
        self.connection
            .execute(sql)
            .with_context(|| format!("{} query failed during {}", kind, stage))
    }
}

/// Map requested keys onto the schema's own spelling of each column.
fn resolve_primary_keys(
    schema: &TableSchema,
    requested: &[String],
    table: &TableIdentifier,
) -> Result<Vec<String>> {
    requested
        .iter()
        .map(|key| {
            schema
                .find(key)
                .map(|column| column.name.clone())
                .ok_or_else(|| {
                    AppError::input(format!(
                        "Primary key column '{}' does not exist in '{}' (columns: {})",
                        key,
                        table,
                        schema.names().join(", ")
                    ))
                    .into()
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, classify_error};

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn id(raw: &str) -> TableIdentifier {
        TableIdentifier::parse(raw).expect("identifier")
    }

    #[test]
    fn request_trims_primary_keys() {
        let request =
            ComparisonRequest::new(id("a.b.c"), id("a.b.d"), &keys(&[" id ", "region"]), "out.csv")
                .expect("request");
        assert_eq!(request.primary_keys, vec!["id", "region"]);
    }

    #[test]
    fn request_rejects_bad_primary_keys() {
        for bad in [keys(&[]), keys(&["id", " "]), keys(&["id", "ID"])] {
            let err = ComparisonRequest::new(id("a.b.c"), id("a.b.d"), &bad, "out.csv")
                .expect_err("invalid keys");
            assert_eq!(classify_error(&err), ErrorKind::Input);
        }
    }

    #[test]
    fn primary_keys_take_schema_spelling() {
        let schema = TableSchema::from_columns(vec![Column {
            name: "CustomerId".to_string(),
            ordinal_position: 1,
            data_type: "int".to_string(),
        }])
        .expect("schema");
        let resolved =
            resolve_primary_keys(&schema, &keys(&["customerid"]), &id("a.b.c")).expect("keys");
        assert_eq!(resolved, vec!["CustomerId"]);

        let err = resolve_primary_keys(&schema, &keys(&["missing"]), &id("a.b.c"))
            .expect_err("missing key");
        assert_eq!(classify_error(&err), ErrorKind::Input);
        assert!(err.to_string().contains("columns: CustomerId"));
    }

    #[test]
    fn verdict_exit_codes() {
        let matched = Verdict::Match {
            row_count: 0,
            summary: MismatchSummary {
                records: 0,
                columns: Default::default(),
            },
        };
        assert_eq!(matched.exit_code(), 0);
        let counts = Verdict::RowCountMismatch {
            table_1: 1,
            table_2: 2,
        };
        assert_eq!(counts.exit_code(), 1);
        let value = serde_json::to_value(&counts).expect("json");
        assert_eq!(value["status"], "rowCountMismatch");
        assert_eq!(value["table1"], 1);
    }
}

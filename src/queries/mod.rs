mod dump;
mod templates;

use std::fmt;

use anyhow::Result;
use serde::Serialize;

use crate::dialect::Dialect;
use crate::diff::TableIdentifier;

pub use dump::SqlDump;
pub use templates::{
    DEFAULT_TEMPLATE_DIR, TemplateOrigin, TemplateSource, TemplateStore, render_template,
};

/// Separates the temp-table statement from the comparison query in a batch.
pub const STATEMENT_SEPARATOR: &str = ";\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    GetColumns,
    GetRowCount,
    CreateTempTable,
    CompareSummary,
    CompareDetail,
}

impl QueryKind {
    pub const ALL: &'static [QueryKind] = &[
        QueryKind::GetColumns,
        QueryKind::GetRowCount,
        QueryKind::CreateTempTable,
        QueryKind::CompareSummary,
        QueryKind::CompareDetail,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::GetColumns => "get-columns",
            QueryKind::GetRowCount => "get-row-count",
            QueryKind::CreateTempTable => "create-temp-table",
            QueryKind::CompareSummary => "compare-summary",
            QueryKind::CompareDetail => "compare-detail",
        }
    }

    /// Template file name, also used for the generated SQL dump.
    pub fn file_name(self) -> &'static str {
        match self {
            QueryKind::GetColumns => "get-columns.sql",
            QueryKind::GetRowCount => "get-row-count.sql",
            QueryKind::CreateTempTable => "create-temp-table.sql",
            QueryKind::CompareSummary => "compare-summary.sql",
            QueryKind::CompareDetail => "compare-detail.sql",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two tables joined into the temp comparison table.
#[derive(Debug, Clone, Copy)]
pub struct JoinPlan<'a> {
    pub table_1: &'a TableIdentifier,
    pub table_2: &'a TableIdentifier,
    pub primary_keys: &'a [String],
    pub columns: &'a [String],
}

#[derive(Serialize)]
struct GetColumnsParams<'a> {
    database: &'a str,
    schema: &'a str,
    table: &'a str,
}

#[derive(Serialize)]
struct GetRowCountParams<'a> {
    identifier: &'a str,
}

#[derive(Serialize)]
struct CreateTempTableParams<'a> {
    identifier_1: &'a str,
    identifier_2: &'a str,
    primary_keys: &'a [String],
    columns: &'a [String],
}

#[derive(Serialize)]
struct CompareSummaryParams<'a> {
    primary_keys: &'a [String],
    columns: &'a [String],
}

#[derive(Serialize)]
struct CompareDetailParams<'a> {
    primary_keys: &'a [String],
    columns: &'a [String],
}

/// Renders the comparison queries for one dialect.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    store: TemplateStore,
    dump: Option<SqlDump>,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect, store: TemplateStore) -> Self {
        Self {
            dialect,
            store,
            dump: None,
        }
    }

    pub fn with_dump(mut self, dump: Option<SqlDump>) -> Self {
        self.dump = dump;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn get_columns(&self, table: &TableIdentifier) -> Result<String> {
        self.build(
            QueryKind::GetColumns,
            &GetColumnsParams {
                database: table.database(),
                schema: table.schema(),
                table: table.name(),
            },
        )
    }

    pub fn get_row_count(&self, table: &TableIdentifier) -> Result<String> {
        self.build(
            QueryKind::GetRowCount,
            &GetRowCountParams {
                identifier: table.raw(),
            },
        )
    }

    pub fn create_temp_table(&self, plan: &JoinPlan<'_>) -> Result<String> {
        self.build(
            QueryKind::CreateTempTable,
            &CreateTempTableParams {
                identifier_1: plan.table_1.raw(),
                identifier_2: plan.table_2.raw(),
                primary_keys: plan.primary_keys,
                columns: plan.columns,
            },
        )
    }

    /// `records` counts only key-matched pairs, so the summary needs the keys too.
    pub fn compare_summary(&self, primary_keys: &[String], columns: &[String]) -> Result<String> {
        self.build(
            QueryKind::CompareSummary,
            &CompareSummaryParams {
                primary_keys,
                columns,
            },
        )
    }

    pub fn compare_detail(&self, primary_keys: &[String], columns: &[String]) -> Result<String> {
        self.build(
            QueryKind::CompareDetail,
            &CompareDetailParams {
                primary_keys,
                columns,
            },
        )
    }

    /// Temp table construction followed by the summary aggregation, as one batch.
    pub fn summary_batch(&self, plan: &JoinPlan<'_>) -> Result<String> {
        Ok(join_batch(
            &self.create_temp_table(plan)?,
            &self.compare_summary(plan.primary_keys, plan.columns)?,
        ))
    }

    /// Temp table construction followed by the row-level extraction, as one batch.
    pub fn detail_batch(&self, plan: &JoinPlan<'_>) -> Result<String> {
        Ok(join_batch(
            &self.create_temp_table(plan)?,
            &self.compare_detail(plan.primary_keys, plan.columns)?,
        ))
    }

    fn build<P: Serialize>(&self, kind: QueryKind, params: &P) -> Result<String> {
        let source = self.store.resolve(self.dialect.as_str(), kind.file_name())?;
        let sql = render_template(&source, params)?;
        tracing::debug!(query = %kind, template = %source, "rendered query:\n{}", sql);
        if let Some(dump) = &self.dump {
            dump.record(kind, &sql);
        }
        Ok(sql)
    }
}

fn join_batch(setup: &str, query: &str) -> String {
    let setup = setup.trim_end().trim_end_matches(';');
    format!("{}{}{}", setup, STATEMENT_SEPARATOR, query)
}

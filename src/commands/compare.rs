use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

use crate::cli::{CliArgs, CompareArgs};
use crate::commands::common;
use crate::config::{OutputFormat, ResolvedConfig};
use crate::db::{self, format_number};
use crate::dialect::Dialect;
use crate::diff::{ComparisonContext, ComparisonRequest, MismatchSummary, TableIdentifier, Verdict};
use crate::error::{AppError, ErrorKind};
use crate::output::{TableOptions, json as json_out, table};
use crate::queries::{QueryBuilder, SqlDump, TemplateStore};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareReport<'a> {
    dialect: Dialect,
    tables: [&'a str; 2],
    primary_keys: &'a [String],
    #[serde(flatten)]
    verdict: &'a Verdict,
}

/// Execute the `compare` command and return the process exit code.
///
/// Argument problems are reported before any connection is opened.
pub fn run(args: &CliArgs, cmd: &CompareArgs) -> Result<i32> {
    let (table_1, table_2) = parse_tables(&cmd.tables)?;
    if cmd.primary_keys.is_empty() {
        return Err(AppError::input("At least one --primary-key is required").into());
    }

    let mut overrides = common::overrides_from_args(args);
    overrides.dialect = cmd.dialect.clone();
    overrides.report_path = cmd.report_path.clone();
    overrides.compiled_dir = cmd.compiled_dir.clone();
    overrides.templates_dir = cmd.templates_dir.clone();
    if cmd.no_dump {
        overrides.dump_sql = Some(false);
    }
    let resolved = common::load_config_with(&overrides)?;
    let compare = &resolved.settings.compare;

    let dialect: Dialect = compare.dialect.parse()?;
    if !dialect.has_adapter() {
        return Err(AppError::new(
            ErrorKind::UnsupportedDialect,
            format!(
                "Dialect '{}' has query templates but no connection adapter in this build",
                dialect
            ),
        )
        .into());
    }

    let request = ComparisonRequest::new(
        table_1,
        table_2,
        &cmd.primary_keys,
        compare.report_path.clone(),
    )?;
    let dump = compare
        .dump_sql
        .then(|| SqlDump::new(compare.compiled_dir.clone()));
    let queries = QueryBuilder::new(dialect, TemplateStore::from_dir(compare.templates_dir.clone()))
        .with_dump(dump);

    let mut connection = db::open(dialect, &resolved.connection)?;
    let verdict = ComparisonContext::new(&queries, &mut connection).run(&request)?;
    drop(connection);

    if !args.quiet {
        render(args, &resolved, dialect, &request, &verdict)?;
    }
    Ok(verdict.exit_code())
}

fn parse_tables(raw: &[String]) -> Result<(TableIdentifier, TableIdentifier)> {
    match raw {
        [first, second] => Ok((TableIdentifier::parse(first)?, TableIdentifier::parse(second)?)),
        _ => Err(AppError::input(format!(
            "Exactly two --table values are required (got {})",
            raw.len()
        ))
        .into()),
    }
}

fn render(
    args: &CliArgs,
    resolved: &ResolvedConfig,
    dialect: Dialect,
    request: &ComparisonRequest,
    verdict: &Verdict,
) -> Result<()> {
    let format = common::output_format(args, resolved);
    if matches!(format, OutputFormat::Json) {
        let report = CompareReport {
            dialect,
            tables: [request.table_1.raw(), request.table_2.raw()],
            primary_keys: &request.primary_keys,
            verdict,
        };
        let body = json_out::emit_json(&report, common::json_pretty(resolved))?;
        writeln!(io::stdout(), "{}", body)?;
        return Ok(());
    }

    let rendered = render_text(request, verdict, format);
    writeln!(io::stdout(), "{}", rendered)?;
    Ok(())
}

fn render_text(request: &ComparisonRequest, verdict: &Verdict, format: OutputFormat) -> String {
    let options = TableOptions::default();
    let mut lines = Vec::new();
    match verdict {
        Verdict::SchemaMismatch {
            table_1,
            table_2,
            diff,
        } => {
            lines.push("Column schemas do not match.".to_string());
            lines.push(String::new());
            lines.push(table::render_schema_table(
                request.table_1.raw(),
                table_1,
                format,
                &options,
            ));
            lines.push(String::new());
            lines.push(table::render_schema_table(
                request.table_2.raw(),
                table_2,
                format,
                &options,
            ));
            lines.push(String::new());
            lines.push(table::render_schema_diff(diff, format, &options));
        }
        Verdict::RowCountMismatch { table_1, table_2 } => {
            lines.push("Row counts do not match.".to_string());
            lines.push(format!("Table 1 row count: {}", display_count(*table_1)));
            lines.push(format!("Table 2 row count: {}", display_count(*table_2)));
        }
        Verdict::Match { row_count, summary } => {
            push_summary(&mut lines, *row_count, summary);
            lines.push(String::new());
            lines.push("Tables match.".to_string());
        }
        Verdict::ContentMismatch {
            row_count,
            summary,
            report_path,
            mismatched_rows,
        } => {
            push_summary(&mut lines, *row_count, summary);
            lines.push(String::new());
            lines.push(format!(
                "{} mismatched row(s) written to {}",
                display_count(*mismatched_rows as u64),
                report_path.display()
            ));
        }
    }
    lines.join("\n")
}

fn push_summary(lines: &mut Vec<String>, row_count: u64, summary: &MismatchSummary) {
    lines.push(format!("Row count: {}", display_count(row_count)));
    lines.push(String::new());
    lines.push("Mismatch summary:".to_string());
    lines.extend(summary.render_lines());
}

fn display_count(count: u64) -> String {
    format_number(i64::try_from(count).unwrap_or(i64::MAX))
}

use comfy_table::{ContentArrangement, Table, presets};

use crate::config::OutputFormat;
use crate::diff::{SchemaDiff, TableSchema};

const ELLIPSIS: &str = "…";
const DEFAULT_MAX_CELL_WIDTH: usize = 140;
const DEFAULT_MAX_OUTPUT_CHARS: usize = 25_000;

#[derive(Debug, Clone)]
pub struct TableOptions {
    pub max_cell_width: usize,
    pub max_output_chars: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            max_cell_width: DEFAULT_MAX_CELL_WIDTH,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }
}

fn new_table(format: OutputFormat) -> Table {
    let mut table = Table::new();
    match format {
        OutputFormat::Markdown => {
            table.load_preset(presets::ASCII_MARKDOWN);
        }
        _ => {
            table.load_preset(presets::UTF8_FULL);
        }
    }
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn render_key_value_table(
    title: &str,
    rows: &[(String, String)],
    format: OutputFormat,
    options: &TableOptions,
) -> String {
    let mut table = new_table(format);
    table.set_header(vec![title.to_string(), "Value".to_string()]);

    for (key, value) in rows {
        let key = truncate_string(key, options.max_cell_width);
        let value = truncate_string(value, options.max_cell_width);
        table.add_row(vec![key, value]);
    }

    truncate_output(table.to_string(), options.max_output_chars)
}

/// One table's column mapping, in introspection order.
pub fn render_schema_table(
    title: &str,
    schema: &TableSchema,
    format: OutputFormat,
    options: &TableOptions,
) -> String {
    let mut table = new_table(format);
    table.set_header(vec![
        title.to_string(),
        "Position".to_string(),
        "Type".to_string(),
    ]);
    for column in schema.columns() {
        table.add_row(vec![
            truncate_string(&column.name, options.max_cell_width),
            column.ordinal_position.to_string(),
            truncate_string(&column.data_type, options.max_cell_width),
        ]);
    }
    truncate_output(table.to_string(), options.max_output_chars)
}

/// Column-level differences, one row per affected column.
pub fn render_schema_diff(diff: &SchemaDiff, format: OutputFormat, options: &TableOptions) -> String {
    let mut table = new_table(format);
    table.set_header(vec!["Column".to_string(), "Difference".to_string()]);
    for change in &diff.changed {
        table.add_row(vec![change.name.clone(), change.differences()]);
    }
    for name in &diff.only_in_table_1 {
        table.add_row(vec![name.clone(), "only in table 1".to_string()]);
    }
    for name in &diff.only_in_table_2 {
        table.add_row(vec![name.clone(), "only in table 2".to_string()]);
    }
    truncate_output(table.to_string(), options.max_output_chars)
}

fn truncate_string(input: &str, max_len: usize) -> String {
    let len = input.chars().count();
    if len <= max_len {
        return input.to_string();
    }
    if max_len <= 1 {
        return ELLIPSIS.to_string();
    }
    let truncated: String = input.chars().take(max_len - 1).collect();
    format!("{}{}", truncated, ELLIPSIS)
}

fn truncate_output(output: String, max_len: usize) -> String {
    if output.len() <= max_len {
        return output;
    }
    let mut truncated = output.chars().take(max_len).collect::<String>();
    truncated.push_str("\n[output truncated]");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Column;

    fn schema(columns: &[(&str, u64, &str)]) -> TableSchema {
        TableSchema::from_columns(
            columns
                .iter()
                .map(|(name, position, data_type)| Column {
                    name: name.to_string(),
                    ordinal_position: *position,
                    data_type: data_type.to_string(),
                })
                .collect(),
        )
        .expect("schema")
    }

    #[test]
    fn truncates_cells() {
        assert_eq!(truncate_string("abcdefghijklmnopqrstuvwxyz", 8), "abcdefg…");
        assert_eq!(truncate_string("abc", 8), "abc");
    }

    #[test]
    fn renders_schema_columns_in_order() {
        let s = schema(&[("id", 1, "int"), ("name", 2, "varchar")]);
        let out = render_schema_table("db.dbo.a", &s, OutputFormat::Markdown, &TableOptions::default());
        assert!(out.contains("db.dbo.a"));
        let id_at = out.find("| id").expect("id row");
        let name_at = out.find("| name").expect("name row");
        assert!(id_at < name_at);
        assert!(out.contains("varchar"));
    }

    #[test]
    fn renders_diff_rows() {
        let left = schema(&[("id", 1, "int"), ("old", 2, "int")]);
        let right = schema(&[("id", 1, "bigint"), ("new", 2, "int")]);
        let out = render_schema_diff(&left.diff(&right), OutputFormat::Pretty, &TableOptions::default());
        assert!(out.contains("type int vs bigint"));
        assert!(out.contains("only in table 1"));
        assert!(out.contains("only in table 2"));
    }

    #[test]
    fn truncates_output_when_too_long() {
        let rows = vec![("key".to_string(), "x".repeat(200))];
        let options = TableOptions {
            max_output_chars: 50,
            ..TableOptions::default()
        };
        let out = render_key_value_table("Config", &rows, OutputFormat::Pretty, &options);
        assert!(out.contains("[output truncated]"));
    }
}

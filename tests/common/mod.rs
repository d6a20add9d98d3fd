#![allow(dead_code)]

use std::collections::VecDeque;
use std::env;
use std::ffi::OsStr;

use assert_cmd::cargo::cargo_bin_cmd;
use data_diff::db::{Connection, ResultColumn, ResultSet, Value};
use data_diff::error::{AppError, ErrorKind};
use serde_json::Value as Json;

/// SQL fragments identifying each rendered SQL Server query.
pub const GET_COLUMNS: &str = "INFORMATION_SCHEMA.COLUMNS";
pub const GET_ROW_COUNT: &str = "AS row_count";
pub const SUMMARY_BATCH: &str = "__mismatches]";
pub const DETAIL_BATCH: &str = "__mismatch] = 1";

pub fn integration_enabled() -> bool {
    env::var("DATA_DIFF_INTEGRATION_TESTS")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn run_json<I, S>(args: I) -> Json
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = cargo_bin_cmd!("data-diff");
    cmd.args(args);
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("json")
}

/// In-memory connection that answers queries from a fixed script.
///
/// Each step names a fragment the next SQL must contain; executing past the
/// end of the script is an error, so tests also prove later stages never ran.
#[derive(Default)]
pub struct ScriptedConnection {
    steps: VecDeque<(&'static str, Result<ResultSet, String>)>,
    pub executed: Vec<String>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, fragment: &'static str, set: ResultSet) -> Self {
        self.steps.push_back((fragment, Ok(set)));
        self
    }

    pub fn fail(mut self, fragment: &'static str, message: &str) -> Self {
        self.steps.push_back((fragment, Err(message.to_string())));
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Connection for ScriptedConnection {
    fn execute(&mut self, sql: &str) -> anyhow::Result<ResultSet> {
        self.executed.push(sql.to_string());
        let (fragment, response) = self
            .steps
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unscripted query:\n{}", sql))?;
        assert!(
            sql.contains(fragment),
            "expected query containing {:?}, got:\n{}",
            fragment,
            sql
        );
        response.map_err(|message| AppError::new(ErrorKind::Query, message).into())
    }
}

pub fn result_set(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
    ResultSet {
        columns: columns.iter().map(|name| ResultColumn::named(*name)).collect(),
        rows,
    }
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn columns_set(columns: &[(&str, i64, &str)]) -> ResultSet {
    result_set(
        &["column_name", "ordinal_position", "data_type"],
        columns
            .iter()
            .map(|(name, position, data_type)| {
                vec![text(name), Value::Int(*position), text(data_type)]
            })
            .collect(),
    )
}

pub fn count_set(count: i64) -> ResultSet {
    result_set(&["row_count"], vec![vec![Value::Int(count)]])
}

pub fn summary_set(records: i64, counts: &[(&str, i64)]) -> ResultSet {
    let mut names = vec!["records".to_string()];
    let mut row = vec![Value::Int(records)];
    for (column, count) in counts {
        names.push(format!("{}__mismatches", column));
        row.push(Value::Int(*count));
    }
    ResultSet {
        columns: names.into_iter().map(ResultColumn::named).collect(),
        rows: vec![row],
    }
}

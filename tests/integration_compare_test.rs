//! Live comparisons against a SQL Server instance.
//!
//! Enabled with `DATA_DIFF_INTEGRATION_TESTS=1`; connection settings come from
//! the usual `SQL_*` environment variables. Tables are created in tempdb.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use tempfile::TempDir;

use common::{integration_enabled, run_json};
use data_diff::config::{CliOverrides, load_from_system};
use data_diff::db::{self, Connection};
use data_diff::dialect::Dialect;

const SETUP: &str = "
DROP TABLE IF EXISTS dbo.data_diff_left;
DROP TABLE IF EXISTS dbo.data_diff_right;
CREATE TABLE dbo.data_diff_left (id INT NOT NULL, name VARCHAR(20) NULL);
CREATE TABLE dbo.data_diff_right (id INT NOT NULL, name VARCHAR(20) NULL);
INSERT INTO dbo.data_diff_left VALUES (1, 'a'), (2, 'b'), (3, NULL);
INSERT INTO dbo.data_diff_right VALUES (1, 'a'), (2, 'B'), (3, NULL);
SELECT 1 AS ready";

fn prepare_tables() {
    let overrides = CliOverrides {
        database: Some("tempdb".to_string()),
        ..CliOverrides::default()
    };
    let resolved = load_from_system(&overrides).expect("config");
    let mut conn = db::open(Dialect::SqlServer, &resolved.connection).expect("connect");
    conn.execute(SETUP).expect("setup");
}

#[test]
fn compares_live_tables() {
    if !integration_enabled() {
        return;
    }
    prepare_tables();

    let dir = TempDir::new().expect("temp dir");
    let report = dir.path().join("mismatches.csv");

    let mut cmd = cargo_bin_cmd!("data-diff");
    cmd.args([
        "--database",
        "tempdb",
        "compare",
        "--table",
        "tempdb.dbo.data_diff_left",
        "--table",
        "tempdb.dbo.data_diff_right",
        "--primary-key",
        "id",
        "--no-dump",
        "--output",
    ])
    .arg(&report)
    .assert()
    .code(1);

    let contents = fs::read_to_string(&report).expect("report");
    assert_eq!(contents, "id,id__1,id__2,name__1,name__2\n2,2,2,b,B\n");
}

#[test]
fn self_comparison_matches() {
    if !integration_enabled() {
        return;
    }
    prepare_tables();

    let value = run_json([
        "--database",
        "tempdb",
        "--json",
        "compare",
        "--no-dump",
        "--table",
        "tempdb.dbo.data_diff_left",
        "--table",
        "tempdb.dbo.data_diff_left",
        "-k",
        "id",
    ]);
    assert_eq!(value["status"], "match");
    assert_eq!(value["rowCount"], 3);
    assert_eq!(value["summary"]["columns"]["name"], 0);
}

#[test]
fn empty_result_keeps_column_names() {
    if !integration_enabled() {
        return;
    }
    let resolved = load_from_system(&CliOverrides::default()).expect("config");
    let mut conn = db::open(Dialect::SqlServer, &resolved.connection).expect("connect");
    let set = conn
        .execute("SELECT 1 AS id, 'x' AS name WHERE 1 = 0")
        .expect("query");
    assert!(set.rows.is_empty());
    assert_eq!(set.column_names(), vec!["id", "name"]);
}

const PADDED_SETUP: &str = "
DROP TABLE IF EXISTS dbo.data_diff_padded_left;
DROP TABLE IF EXISTS dbo.data_diff_padded_right;
CREATE TABLE dbo.data_diff_padded_left (id INT NOT NULL, name VARCHAR(20) NULL);
CREATE TABLE dbo.data_diff_padded_right (id INT NOT NULL, name VARCHAR(20) NULL);
INSERT INTO dbo.data_diff_padded_left VALUES (1, 'a'), (2, 'same');
INSERT INTO dbo.data_diff_padded_right VALUES (1, 'a  '), (2, 'same');
SELECT 1 AS ready";

#[test]
fn trailing_spaces_are_a_mismatch() {
    if !integration_enabled() {
        return;
    }
    let overrides = CliOverrides {
        database: Some("tempdb".to_string()),
        ..CliOverrides::default()
    };
    let resolved = load_from_system(&overrides).expect("config");
    let mut conn = db::open(Dialect::SqlServer, &resolved.connection).expect("connect");
    conn.execute(PADDED_SETUP).expect("setup");
    drop(conn);

    let dir = TempDir::new().expect("temp dir");
    let report = dir.path().join("mismatches.csv");
    let mut cmd = cargo_bin_cmd!("data-diff");
    let output = cmd
        .args([
            "--database",
            "tempdb",
            "--json",
            "compare",
            "--no-dump",
            "-t",
            "tempdb.dbo.data_diff_padded_left",
            "-t",
            "tempdb.dbo.data_diff_padded_right",
            "-k",
            "id",
            "--output",
        ])
        .arg(&report)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("json");
    assert_eq!(value["status"], "contentMismatch");
    assert_eq!(value["summary"]["records"], 2);
    assert_eq!(value["summary"]["columns"]["name"], 1);
    assert_eq!(value["mismatchedRows"], 1);
}

#[test]
fn column_length_difference_is_a_schema_mismatch() {
    if !integration_enabled() {
        return;
    }
    let overrides = CliOverrides {
        database: Some("tempdb".to_string()),
        ..CliOverrides::default()
    };
    let resolved = load_from_system(&overrides).expect("config");
    let mut conn = db::open(Dialect::SqlServer, &resolved.connection).expect("connect");
    conn.execute(
        "DROP TABLE IF EXISTS dbo.data_diff_short;
DROP TABLE IF EXISTS dbo.data_diff_long;
CREATE TABLE dbo.data_diff_short (id INT NOT NULL, name VARCHAR(10) NULL);
CREATE TABLE dbo.data_diff_long (id INT NOT NULL, name VARCHAR(50) NULL);
SELECT 1 AS ready",
    )
    .expect("setup");
    drop(conn);

    let mut cmd = cargo_bin_cmd!("data-diff");
    let output = cmd
        .args([
            "--database",
            "tempdb",
            "--json",
            "compare",
            "--no-dump",
            "-t",
            "tempdb.dbo.data_diff_short",
            "-t",
            "tempdb.dbo.data_diff_long",
            "-k",
            "id",
        ])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("json");
    assert_eq!(value["status"], "schemaMismatch");
    assert_eq!(value["table1"]["name"]["dataType"], "varchar(10)");
    assert_eq!(value["table2"]["name"]["dataType"], "varchar(50)");
}

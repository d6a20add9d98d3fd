use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn compare_in(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("data-diff");
    cmd.current_dir(dir.path())
        .env_remove("DATA_DIFF_DIALECT")
        .env_remove("DATA_DIFF_CONFIG")
        .arg("compare");
    cmd
}

#[test]
fn requires_exactly_two_tables() {
    let dir = TempDir::new().expect("temp dir");
    compare_in(&dir)
        .args(["--table", "db.dbo.a", "--primary-key", "id"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Exactly two --table values"));
}

#[test]
fn requires_a_primary_key() {
    let dir = TempDir::new().expect("temp dir");
    compare_in(&dir)
        .args(["--table", "db.dbo.a", "--table", "db.dbo.b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--primary-key"));
}

#[test]
fn rejects_malformed_identifiers() {
    let dir = TempDir::new().expect("temp dir");
    compare_in(&dir)
        .args(["--table", "db.a", "--table", "db.dbo.b", "-k", "id"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected database.schema.table"));

    compare_in(&dir)
        .args(["--table", "db..a", "--table", "db.dbo.b", "-k", "id"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("schema segment is empty"));
}

#[test]
fn dialect_without_adapter_fails_before_connecting() {
    let dir = TempDir::new().expect("temp dir");
    compare_in(&dir)
        .args([
            "--table",
            "proj.ds.a",
            "--table",
            "proj.ds.b",
            "-k",
            "id",
            "--source",
            "bigquery",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no connection adapter"));
    assert!(!dir.path().join(".compiled").exists());
}

#[test]
fn unknown_dialect_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    compare_in(&dir)
        .args([
            "--table",
            "db.dbo.a",
            "--table",
            "db.dbo.b",
            "-k",
            "id",
            "--dialect",
            "oracle",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown dialect 'oracle'"));
}

#[test]
fn json_errors_carry_their_kind() {
    let dir = TempDir::new().expect("temp dir");
    let output = compare_in(&dir)
        .args(["--json", "--table", "db.dbo.a", "-k", "id"])
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("json error");
    assert_eq!(value["error"]["kind"], "Input");
}

#[test]
fn unreachable_server_is_a_connection_error() {
    let dir = TempDir::new().expect("temp dir");
    compare_in(&dir)
        .args([
            "--server",
            "127.0.0.1",
            "--port",
            "1",
            "--timeout",
            "2000",
            "--table",
            "db.dbo.a",
            "--table",
            "db.dbo.b",
            "-k",
            "id",
        ])
        .assert()
        .code(4);
    assert!(!dir.path().join("mismatches.csv").exists());
}

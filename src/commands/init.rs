use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::{CliArgs, InitArgs};
use crate::commands::common;
use crate::config::{DEFAULT_COMPILED_DIR, DEFAULT_DIALECT, DEFAULT_REPORT_PATH, OutputFormat};
use crate::error::AppError;
use crate::output::json as json_out;

const CONFIG_DIR: &str = ".data-diff";
const CONFIG_FILE: &str = "config.yaml";

pub fn run(args: &CliArgs, cmd: &InitArgs) -> Result<()> {
    let resolved = common::load_config(args)?;
    let format = common::output_format(args, &resolved);

    let profile_name = cmd.profile.as_deref().unwrap_or("default");
    let target = resolve_target_path(cmd.path.as_deref());

    if target.exists() && !cmd.force {
        return Err(AppError::input(format!(
            "Config already exists: {} (use --force to overwrite)",
            target.display()
        ))
        .into());
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(&target, render_config_template(profile_name))
        .with_context(|| format!("Failed to write {}", target.display()))?;

    if args.quiet {
        return Ok(());
    }

    if matches!(format, OutputFormat::Json) {
        let payload = json!({
            "path": target.display().to_string(),
            "created": true,
            "overwritten": cmd.force,
        });
        let body = json_out::emit_json_value(&payload, common::json_pretty(&resolved))?;
        println!("{}", body);
    } else {
        println!("Wrote config to {}", target.display());
    }

    Ok(())
}

fn resolve_target_path(path: Option<&Path>) -> PathBuf {
    match path {
        Some(path)
            if path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json")) =>
        {
            path.to_path_buf()
        }
        Some(dir) => dir.join(CONFIG_DIR).join(CONFIG_FILE),
        None => Path::new(CONFIG_DIR).join(CONFIG_FILE),
    }
}

fn render_config_template(profile: &str) -> String {
    format!(
        r#"# data-diff configuration

defaultProfile: {profile}
settings:
  output:
    # Values: pretty | markdown | json
    defaultFormat: pretty
    json:
      pretty: true
  compare:
    # Template set used to render queries: sqlserver | bigquery
    dialect: {dialect}
    # Row-level mismatches are written here when values differ.
    reportPath: {report}
    # Every rendered query is saved under compiledDir for inspection.
    dumpSql: true
    compiledDir: {compiled}
    # Directory with <dialect>/<name>.sql and _default/<name>.sql overrides.
    # templatesDir: ./templates

profiles:
  {profile}:
    server: localhost
    port: 1433
    database: master
    user: sa
    passwordEnv: SQL_PASSWORD
    encrypt: true
    trustCert: true
    timeout: 30000
"#,
        profile = profile,
        dialect = DEFAULT_DIALECT,
        report = DEFAULT_REPORT_PATH,
        compiled = DEFAULT_COMPILED_DIR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    #[test]
    fn template_parses_as_config() {
        let parsed: ConfigFile =
            serde_yaml::from_str(&render_config_template("dev")).expect("yaml");
        assert_eq!(parsed.default_profile.as_deref(), Some("dev"));
        let compare = parsed
            .settings
            .and_then(|s| s.compare)
            .expect("compare settings");
        assert_eq!(compare.dialect.as_deref(), Some("sqlserver"));
        assert_eq!(compare.dump_sql, Some(true));
        assert!(parsed.profiles.contains_key("dev"));
    }

    #[test]
    fn target_path_rules() {
        assert_eq!(
            resolve_target_path(None),
            PathBuf::from(".data-diff/config.yaml")
        );
        assert_eq!(
            resolve_target_path(Some(Path::new("custom.yml"))),
            PathBuf::from("custom.yml")
        );
        assert_eq!(
            resolve_target_path(Some(Path::new("proj"))),
            PathBuf::from("proj/.data-diff/config.yaml")
        );
    }
}

use std::io::{self, Write};

use anyhow::Result;

use crate::cli::CliArgs;
use crate::commands::common;
use crate::config::{OutputFormat, ResolvedConfig};
use crate::output::{TableOptions, json, table};

pub fn run(args: &CliArgs) -> Result<()> {
    let resolved = common::load_config(args)?;
    let format = common::output_format(args, &resolved);

    if args.quiet {
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let payload = json::config_to_json(&resolved);
            let body = json::emit_json_value(&payload, common::json_pretty(&resolved))?;
            writeln!(io::stdout(), "{}", body)?;
        }
        _ => {
            let rows = config_rows(&resolved);
            let rendered =
                table::render_key_value_table("Config", &rows, format, &TableOptions::default());
            writeln!(io::stdout(), "{}", rendered)?;
        }
    }

    Ok(())
}

fn config_rows(resolved: &ResolvedConfig) -> Vec<(String, String)> {
    let connection = &resolved.connection;
    let compare = &resolved.settings.compare;
    let mut rows = vec![
        (
            "configPath".to_string(),
            resolved
                .config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string()),
        ),
        ("profileName".to_string(), resolved.profile_name.clone()),
        ("server".to_string(), connection.server.clone()),
        ("port".to_string(), connection.port.to_string()),
        ("database".to_string(), connection.database.clone()),
    ];
    if let Some(user) = &connection.user {
        rows.push(("user".to_string(), user.clone()));
    }
    if connection.password.is_some() {
        rows.push(("password".to_string(), "(set)".to_string()));
    }
    rows.extend([
        ("encrypt".to_string(), connection.encrypt.to_string()),
        ("trustCert".to_string(), connection.trust_cert.to_string()),
        ("timeoutMs".to_string(), connection.timeout_ms.to_string()),
        ("dialect".to_string(), compare.dialect.clone()),
        ("reportPath".to_string(), compare.report_path.display().to_string()),
        ("dumpSql".to_string(), compare.dump_sql.to_string()),
        ("compiledDir".to_string(), compare.compiled_dir.display().to_string()),
        (
            "templatesDir".to_string(),
            compare
                .templates_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(bundled)".to_string()),
        ),
    ]);
    rows
}

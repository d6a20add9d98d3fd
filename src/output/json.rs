use serde::Serialize;
use serde_json::json;

use crate::config::ResolvedConfig;

const MASKED_PASSWORD: &str = "********";

pub fn emit_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

pub fn emit_json_value(value: &serde_json::Value, pretty: bool) -> anyhow::Result<String> {
    emit_json(value, pretty)
}

pub fn error_json(message: &str, kind: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "kind": kind,
        }
    })
}

pub fn config_to_json(resolved: &ResolvedConfig) -> serde_json::Value {
    let compare = &resolved.settings.compare;
    json!({
        "configPath": resolved.config_path.as_ref().map(|p| p.display().to_string()),
        "profileName": resolved.profile_name,
        "connection": {
            "server": resolved.connection.server,
            "port": resolved.connection.port,
            "database": resolved.connection.database,
            "user": resolved.connection.user,
            "password": resolved.connection.password.as_ref().map(|_| MASKED_PASSWORD),
            "encrypt": resolved.connection.encrypt,
            "trustCert": resolved.connection.trust_cert,
            "timeoutMs": resolved.connection.timeout_ms,
        },
        "settings": {
            "output": {
                "defaultFormat": resolved.settings.output.default_format.as_str(),
                "json": {
                    "pretty": resolved.settings.output.json.pretty,
                },
            },
            "compare": {
                "dialect": compare.dialect,
                "reportPath": compare.report_path.display().to_string(),
                "dumpSql": compare.dump_sql,
                "compiledDir": compare.compiled_dir.display().to_string(),
                "templatesDir": compare.templates_dir.as_ref().map(|p| p.display().to_string()),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionSettings, SettingsResolved};

    fn resolved(password: Option<&str>) -> ResolvedConfig {
        ResolvedConfig {
            config_path: None,
            profile_name: "default".to_string(),
            connection: ConnectionSettings {
                password: password.map(str::to_string),
                ..ConnectionSettings::default()
            },
            settings: SettingsResolved::default(),
        }
    }

    #[test]
    fn emits_error_json() {
        let value = error_json("boom", "Internal");
        assert_eq!(value["error"]["message"], "boom");
        assert_eq!(value["error"]["kind"], "Internal");
    }

    #[test]
    fn config_json_includes_compare_defaults() {
        let value = config_to_json(&resolved(None));
        assert_eq!(value["profileName"], "default");
        assert_eq!(value["settings"]["output"]["defaultFormat"], "pretty");
        assert_eq!(value["settings"]["compare"]["dialect"], "sqlserver");
        assert_eq!(value["settings"]["compare"]["reportPath"], "mismatches.csv");
        assert_eq!(value["settings"]["compare"]["dumpSql"], true);
        assert!(value["connection"]["password"].is_null());
    }

    #[test]
    fn config_json_masks_password() {
        let value = config_to_json(&resolved(Some("hunter2")));
        assert_eq!(value["connection"]["password"], MASKED_PASSWORD);
        assert!(!value.to_string().contains("hunter2"));
    }

    #[test]
    fn compact_and_pretty_output() {
        let value = json!({"a": 1});
        assert_eq!(emit_json_value(&value, false).expect("json"), "{\"a\":1}");
        assert!(emit_json_value(&value, true).expect("json").contains('\n'));
    }
}

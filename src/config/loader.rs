use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::env::{parse_bool, Env};
use super::schema::{CompareSettings, ConfigFile, OutputFormat, OutputSettings, Profile, Settings};

pub const DEFAULT_DIALECT: &str = "sqlserver";
pub const DEFAULT_REPORT_PATH: &str = "mismatches.csv";
pub const DEFAULT_COMPILED_DIR: &str = ".compiled";

const LOCAL_CANDIDATES: &[&str] = &[
    ".data-diff/config.yaml",
    ".data-diff/config.yml",
    ".data-diff/config.json",
];

const GLOBAL_CANDIDATES: &[&str] = &[
    "data-diff/config.yaml",
    "data-diff/config.yml",
    "data-diff/config.json",
];

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub profile: Option<String>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: Option<u64>,
    pub encrypt: Option<bool>,
    pub trust_cert: Option<bool>,
    pub dialect: Option<String>,
    pub report_path: Option<PathBuf>,
    pub dump_sql: Option<bool>,
    pub compiled_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub cli: CliOverrides,
    pub cwd: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub xdg_config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub profile_name: String,
    pub connection: ConnectionSettings,
    pub settings: SettingsResolved,
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub encrypt: bool,
    pub trust_cert: bool,
    pub timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 1433,
            database: "master".to_string(),
            user: None,
            password: None,
            encrypt: true,
            trust_cert: true,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsResolved {
    pub output: OutputSettingsResolved,
    pub compare: CompareSettingsResolved,
}

#[derive(Debug, Clone)]
pub struct OutputSettingsResolved {
    pub default_format: OutputFormat,
    pub json: JsonSettingsResolved,
}

#[derive(Debug, Clone)]
pub struct JsonSettingsResolved {
    pub pretty: bool,
}

#[derive(Debug, Clone)]
pub struct CompareSettingsResolved {
    pub dialect: String,
    pub report_path: PathBuf,
    pub dump_sql: bool,
    pub compiled_dir: PathBuf,
    pub templates_dir: Option<PathBuf>,
}

impl Default for SettingsResolved {
    fn default() -> Self {
        Self {
            output: OutputSettingsResolved {
                default_format: OutputFormat::Pretty,
                json: JsonSettingsResolved { pretty: true },
            },
            compare: CompareSettingsResolved {
                dialect: DEFAULT_DIALECT.to_string(),
                report_path: PathBuf::from(DEFAULT_REPORT_PATH),
                dump_sql: true,
                compiled_dir: PathBuf::from(DEFAULT_COMPILED_DIR),
                templates_dir: None,
            },
        }
    }
}

pub fn load_config(options: &LoadOptions, env: &Env) -> Result<ResolvedConfig> {
    let config_path = resolve_config_path(options, env)?;
    let config_file = match &config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    let profile_name = resolve_profile_name(options, env, config_file.default_profile.as_deref());

    let mut connection = ConnectionSettings::default();
    let mut settings = SettingsResolved::default();

    if let Some(settings_cfg) = &config_file.settings {
        apply_settings(&mut settings, settings_cfg);
    }

    if let Some(profile) = config_file.profiles.get(&profile_name) {
        apply_profile(&mut connection, &mut settings, profile, env);
    } else if config_path.is_some() && options.cli.profile.is_some() {
        return Err(anyhow!("Profile '{}' not found in config", profile_name));
    }

    apply_env_overrides(&mut connection, &mut settings, env);
    apply_cli_overrides(&mut connection, &mut settings, &options.cli);

    tracing::debug!(
        config = ?config_path,
        profile = %profile_name,
        dialect = %settings.compare.dialect,
        "resolved configuration"
    );

    Ok(ResolvedConfig {
        config_path,
        profile_name,
        connection,
        settings,
    })
}

fn resolve_profile_name(options: &LoadOptions, env: &Env, default_profile: Option<&str>) -> String {
    if let Some(profile) = options.cli.profile.as_deref() {
        return profile.to_string();
    }
    if let Some(profile) = env.get("DATA_DIFF_PROFILE") {
        return profile;
    }
    if let Some(profile) = default_profile {
        return profile.to_string();
    }
    "default".to_string()
}

fn resolve_config_path(options: &LoadOptions, env: &Env) -> Result<Option<PathBuf>> {
    if let Some(path) = &options.cli.config_path {
        if !path.exists() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }
        return Ok(Some(path.clone()));
    }

    if let Some(path) = env.get("DATA_DIFF_CONFIG") {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }
        return Ok(Some(path));
    }

    if let Some(path) = find_local_config(&options.cwd, options.home_dir.as_deref()) {
        return Ok(Some(path));
    }

    Ok(find_global_config(options.xdg_config_dir.as_deref()))
}

fn find_local_config(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if let Some(path) = first_existing(dir, LOCAL_CANDIDATES) {
            return Some(path);
        }
        if home == Some(dir) {
            break;
        }
    }
    None
}

fn find_global_config(xdg_config: Option<&Path>) -> Option<PathBuf> {
    first_existing(xdg_config?, GLOBAL_CANDIDATES)
}

fn first_existing(base: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|candidate| base.join(candidate))
        .find(|path| path.is_file())
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")
        }
        Some("json") => serde_json::from_str(&content).context("Failed to parse JSON config"),
        _ => Err(anyhow!("Unsupported config file extension")),
    }
}

fn apply_profile(
    connection: &mut ConnectionSettings,
    settings: &mut SettingsResolved,
    profile: &Profile,
    env: &Env,
) {
    if let Some(server) = &profile.server {
        connection.server = server.clone();
    }
    if let Some(port) = profile.port {
        connection.port = port;
    }
    if let Some(database) = &profile.database {
        connection.database = database.clone();
    }
    if let Some(user) = &profile.user {
        connection.user = Some(user.clone());
    }
    if let Some(password) = &profile.password {
        connection.password = Some(password.clone());
    } else if let Some(value) = profile.password_env.as_deref().and_then(|key| env.get(key)) {
        connection.password = Some(value);
    }
    if let Some(encrypt) = profile.encrypt {
        connection.encrypt = encrypt;
    }
    if let Some(trust_cert) = profile.trust_cert {
        connection.trust_cert = trust_cert;
    }
    if let Some(timeout) = profile.timeout {
        connection.timeout_ms = timeout;
    }

    if let Some(settings_profile) = &profile.settings {
        apply_settings(settings, settings_profile);
    }
}

fn apply_settings(settings: &mut SettingsResolved, overrides: &Settings) {
    if let Some(output) = &overrides.output {
        apply_output_settings(&mut settings.output, output);
    }
    if let Some(compare) = &overrides.compare {
        apply_compare_settings(&mut settings.compare, compare);
    }
}

fn apply_output_settings(settings: &mut OutputSettingsResolved, overrides: &OutputSettings) {
    if let Some(default_format) = overrides.default_format {
        settings.default_format = default_format;
    }
    if let Some(pretty) = overrides.json.as_ref().and_then(|json| json.pretty) {
        settings.json.pretty = pretty;
    }
}

fn apply_compare_settings(settings: &mut CompareSettingsResolved, overrides: &CompareSettings) {
    if let Some(dialect) = &overrides.dialect {
        settings.dialect = dialect.clone();
    }
    if let Some(report_path) = &overrides.report_path {
        settings.report_path = report_path.clone();
    }
    if let Some(dump_sql) = overrides.dump_sql {
        settings.dump_sql = dump_sql;
    }
    if let Some(compiled_dir) = &overrides.compiled_dir {
        settings.compiled_dir = compiled_dir.clone();
    }
    if let Some(templates_dir) = &overrides.templates_dir {
        settings.templates_dir = Some(templates_dir.clone());
    }
}

fn apply_env_overrides(
    connection: &mut ConnectionSettings,
    settings: &mut SettingsResolved,
    env: &Env,
) {
    if let Some(url) = env.get_any(&["DATABASE_URL", "DB_URL", "SQLSERVER_URL"]) {
        match parse_connection_url(&url) {
            Ok(parsed) => {
                if let Some(server) = parsed.server {
                    connection.server = server;
                }
                if let Some(port) = parsed.port {
                    connection.port = port;
                }
                if let Some(database) = parsed.database {
                    connection.database = database;
                }
                if let Some(user) = parsed.user {
                    connection.user = Some(user);
                }
                if let Some(password) = parsed.password {
                    connection.password = Some(password);
                }
            }
            Err(err) => tracing::warn!("Ignoring connection URL from environment: {}", err),
        }
    }

    if let Some(server) = env.get_any(&["SQL_SERVER", "SQLSERVER_HOST", "DB_HOST"]) {
        connection.server = server;
    }
    if let Some(port) = env
        .get_any(&["SQL_PORT", "SQLSERVER_PORT", "DB_PORT"])
        .and_then(|port| port.parse::<u16>().ok())
    {
        connection.port = port;
    }
    if let Some(database) = env.get_any(&["SQL_DATABASE", "SQLSERVER_DB", "DB_NAME"]) {
        connection.database = database;
    }
    if let Some(user) = env.get_any(&["SQL_USER", "SQLSERVER_USER", "DB_USER"]) {
        connection.user = Some(user);
    }
    if let Some(password) = env.get_any(&["SQL_PASSWORD", "SQLSERVER_PASSWORD", "DB_PASSWORD"]) {
        connection.password = Some(password);
    }
    if let Some(encrypt) = env.get("SQL_ENCRYPT").and_then(|v| parse_bool(&v)) {
        connection.encrypt = encrypt;
    }
    if let Some(trust_cert) = env
        .get("SQL_TRUST_SERVER_CERTIFICATE")
        .and_then(|v| parse_bool(&v))
    {
        connection.trust_cert = trust_cert;
    }
    if let Some(timeout) = env
        .get_any(&["SQL_CONNECT_TIMEOUT", "DB_CONNECT_TIMEOUT"])
        .and_then(|timeout| timeout.parse::<u64>().ok())
    {
        connection.timeout_ms = timeout;
    }

    if let Some(dialect) = env.get("DATA_DIFF_DIALECT") {
        settings.compare.dialect = dialect;
    }
}

fn apply_cli_overrides(
    connection: &mut ConnectionSettings,
    settings: &mut SettingsResolved,
    cli: &CliOverrides,
) {
    if let Some(server) = &cli.server {
        connection.server = server.clone();
    }
    if let Some(port) = cli.port {
        connection.port = port;
    }
    if let Some(database) = &cli.database {
        connection.database = database.clone();
    }
    if let Some(user) = &cli.user {
        connection.user = Some(user.clone());
    }
    if let Some(password) = &cli.password {
        connection.password = Some(password.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        connection.timeout_ms = timeout_ms;
    }
    if let Some(encrypt) = cli.encrypt {
        connection.encrypt = encrypt;
    }
    if let Some(trust_cert) = cli.trust_cert {
        connection.trust_cert = trust_cert;
    }

    apply_compare_settings(
        &mut settings.compare,
        &CompareSettings {
            dialect: cli.dialect.clone(),
            report_path: cli.report_path.clone(),
            dump_sql: cli.dump_sql,
            compiled_dir: cli.compiled_dir.clone(),
            templates_dir: cli.templates_dir.clone(),
        },
    );
}

#[derive(Debug, Default)]
struct ParsedUrl {
    server: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

fn parse_connection_url(input: &str) -> Result<ParsedUrl> {
    let mut remaining = input.trim();
    if let Some(idx) = remaining.find("://") {
        remaining = &remaining[idx + 3..];
    }

    let (auth_part, host_part) = match remaining.rsplit_once('@') {
        Some((auth, host)) => (Some(auth), host),
        None => (None, remaining),
    };
    let (host_port, path_part) = match host_part.split_once('/') {
        Some((host, path)) => (host, Some(path)),
        None => (host_part, None),
    };

    let mut parsed = ParsedUrl::default();

    if let Some(auth) = auth_part {
        let (user, pass) = auth.split_once(':').unwrap_or((auth, ""));
        if !user.is_empty() {
            parsed.user = Some(user.to_string());
        }
        if !pass.is_empty() {
            parsed.password = Some(pass.to_string());
        }
    }

    if !host_port.is_empty() {
        let (host, port) = host_port.split_once(':').unwrap_or((host_port, ""));
        if !host.is_empty() {
            parsed.server = Some(host.to_string());
        }
        parsed.port = port.parse::<u16>().ok();
    }

    if let Some(db) = path_part.and_then(|path| path.split('?').next()) {
        if !db.is_empty() {
            parsed.database = Some(db.to_string());
        }
    }

    if parsed.server.is_none() && parsed.database.is_none() && parsed.user.is_none() {
        return Err(anyhow!("Invalid connection URL"));
    }

    Ok(parsed)
}

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};

#[derive(Debug, Clone)]
pub struct OutputFlags {
    pub json: bool,
    pub markdown: bool,
    pub pretty: bool,
}

#[derive(Debug, Clone)]
pub struct CliArgs {
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
    pub output: OutputFlags,
    pub verbose: u8,
    pub quiet: bool,
    pub command: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Help { all: bool, command: Option<String> },
    Compare(CompareArgs),
    Init(InitArgs),
    Config(ConfigArgs),
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompareArgs {
    pub tables: Vec<String>,
    pub primary_keys: Vec<String>,
    pub dialect: Option<String>,
    pub report_path: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub compiled_dir: Option<PathBuf>,
    pub no_dump: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    pub force: bool,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigArgs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionsArgs {
    pub shell: Option<String>,
}

pub fn build_cli(show_all: bool) -> Command {
    let mut cmd = Command::new("data-diff")
        .about("Compare two tables for schema, row count and content equality")
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .disable_help_subcommand(true)
        .subcommand_value_name("COMMAND");

    cmd = add_global_args(cmd);

    cmd = cmd.subcommand(command_help());
    cmd = cmd.subcommand(command_compare(show_all));
    cmd = cmd.subcommand(command_init(show_all));
    cmd = cmd.subcommand(command_config(show_all));
    cmd = cmd.subcommand(command_completions(show_all));

    cmd
}

pub fn parse_args() -> CliArgs {
    let matches = build_cli(false).get_matches();
    parse_matches(&matches)
}

pub fn try_parse_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_cli(false).try_get_matches_from(args)?;
    Ok(parse_matches(&matches))
}

fn add_global_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("config")
            .long("config")
            .value_name("PATH")
            .value_hint(ValueHint::FilePath)
            .global(true)
            .help("Override config file location"),
    )
    .arg(
        Arg::new("env-file")
            .long("env-file")
            .value_name("PATH")
            .value_hint(ValueHint::FilePath)
            .global(true)
            .help("Load environment variables from file (default: .env)"),
    )
    .arg(
        Arg::new("profile")
            .long("profile")
            .value_name("NAME")
            .global(true)
            .help("Select connection profile"),
    )
    .arg(
        Arg::new("server")
            .long("server")
            .value_name("HOST")
            .global(true)
            .help("Database server hostname"),
    )
    .arg(
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .value_parser(clap::value_parser!(u16))
            .global(true)
            .help("Database server port (default: 1433)"),
    )
    .arg(
        Arg::new("database")
            .long("database")
            .value_name("NAME")
            .global(true)
            .help("Database to connect to (default: master)"),
    )
    .arg(
        Arg::new("user")
            .long("user")
            .value_name("USER")
            .global(true)
            .help("Login user"),
    )
    .arg(
        Arg::new("password")
            .long("password")
            .value_name("PASS")
            .global(true)
            .help("Login password"),
    )
    .arg(
        Arg::new("timeout")
            .long("timeout")
            .value_name("MS")
            .value_parser(clap::value_parser!(u64))
            .global(true)
            .help("Connect and login timeout in milliseconds"),
    )
    .arg(
        Arg::new("encrypt")
            .long("encrypt")
            .value_parser(clap::value_parser!(bool))
            .global(true)
            .help("Enable connection encryption"),
    )
    .arg(
        Arg::new("trust-cert")
            .long("trust-cert")
            .value_parser(clap::value_parser!(bool))
            .global(true)
            .help("Trust server certificate"),
    )
    .arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Output as JSON"),
    )
    .arg(
        Arg::new("markdown")
            .long("markdown")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Force markdown table output"),
    )
    .arg(
        Arg::new("pretty")
            .long("pretty")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Force pretty-printed table output"),
    )
    .arg(
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true)
            .help("Increase log verbosity (-v stages, -vv rendered SQL)"),
    )
    .arg(
        Arg::new("quiet")
            .short('q')
            .long("quiet")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Suppress non-error output"),
    )
}

fn command_help() -> Command {
    Command::new("help")
        .about("Show help for commands")
        .arg(
            Arg::new("all")
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Show all commands, including advanced ones"),
        )
        .arg(Arg::new("command").value_name("COMMAND"))
}

fn command_core(
    name: &'static str,
    about: &'static str,
    aliases: &'static [&'static str],
    _show_all: bool,
) -> Command {
    let mut cmd = Command::new(name).about(about);
    for alias in aliases {
        cmd = cmd.visible_alias(*alias);
    }
    cmd
}

fn command_advanced(
    name: &'static str,
    about: &'static str,
    aliases: &'static [&'static str],
    show_all: bool,
) -> Command {
    let mut cmd = Command::new(name).about(about);
    for alias in aliases {
        cmd = cmd.visible_alias(*alias);
    }
    if !show_all {
        cmd = cmd.hide(true);
    }
    cmd
}

fn command_compare(show_all: bool) -> Command {
    command_core(
        "compare",
        "Compare two tables: schema, then row count, then values",
        &["diff"],
        show_all,
    )
    .arg(
        Arg::new("table")
            .short('t')
            .long("table")
            .value_name("DB.SCHEMA.TABLE")
            .action(ArgAction::Append)
            .help("Table to compare; pass exactly twice"),
    )
    .arg(
        Arg::new("primary-key")
            .short('k')
            .long("primary-key")
            .value_name("COLUMN")
            .action(ArgAction::Append)
            .help("Primary key column used to pair rows; repeat for composite keys"),
    )
    .arg(
        Arg::new("dialect")
            .long("dialect")
            .visible_alias("source")
            .value_name("NAME")
            .help("SQL dialect (default: sqlserver)"),
    )
    .arg(
        Arg::new("output")
            .short('o')
            .long("output")
            .value_name("PATH")
            .value_hint(ValueHint::FilePath)
            .help("Mismatch report path (default: mismatches.csv)"),
    )
    .arg(
        Arg::new("templates-dir")
            .long("templates-dir")
            .value_name("PATH")
            .value_hint(ValueHint::DirPath)
            .help("Load query templates from this directory instead of the bundled set"),
    )
    .arg(
        Arg::new("compiled-dir")
            .long("compiled-dir")
            .value_name("PATH")
            .value_hint(ValueHint::DirPath)
            .help("Directory for rendered SQL (default: .compiled)"),
    )
    .arg(
        Arg::new("no-dump")
            .long("no-dump")
            .action(ArgAction::SetTrue)
            .help("Do not write rendered SQL to disk"),
    )
}

fn command_init(show_all: bool) -> Command {
    command_core("init", "Create config file", &[], show_all)
        .arg(
            Arg::new("path")
                .long("path")
                .value_name("path")
                .value_hint(ValueHint::FilePath),
        )
        .arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
        .arg(Arg::new("profile").long("profile").value_name("name"))
}

fn command_config(show_all: bool) -> Command {
    command_core("config", "Display resolved config", &[], show_all)
}

fn command_completions(show_all: bool) -> Command {
    command_advanced("completions", "Generate shell completions", &[], show_all).arg(
        Arg::new("shell")
            .long("shell")
            .value_name("name")
            .value_parser(["bash", "zsh", "fish", "powershell", "elvish"]),
    )
}

fn parse_matches(matches: &ArgMatches) -> CliArgs {
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let env_file = matches.get_one::<String>("env-file").map(PathBuf::from);
    let profile = matches.get_one::<String>("profile").cloned();
    let server = matches.get_one::<String>("server").cloned();
    let port = matches.get_one::<u16>("port").copied();
    let database = matches.get_one::<String>("database").cloned();
    let user = matches.get_one::<String>("user").cloned();
    let password = matches.get_one::<String>("password").cloned();
    let timeout_ms = matches.get_one::<u64>("timeout").copied();
    let encrypt = matches.get_one::<bool>("encrypt").copied();
    let trust_cert = matches.get_one::<bool>("trust-cert").copied();
    let output = OutputFlags {
        json: matches.get_flag("json"),
        markdown: matches.get_flag("markdown"),
        pretty: matches.get_flag("pretty"),
    };
    let verbose = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");

    let command = match matches.subcommand() {
        Some(("help", sub_m)) => CommandKind::Help {
            all: sub_m.get_flag("all"),
            command: sub_m.get_one::<String>("command").cloned(),
        },
        Some(("compare", sub_m)) => CommandKind::Compare(CompareArgs {
            tables: strings(sub_m, "table"),
            primary_keys: strings(sub_m, "primary-key"),
            dialect: sub_m.get_one::<String>("dialect").cloned(),
            report_path: sub_m.get_one::<String>("output").map(PathBuf::from),
            templates_dir: sub_m.get_one::<String>("templates-dir").map(PathBuf::from),
            compiled_dir: sub_m.get_one::<String>("compiled-dir").map(PathBuf::from),
            no_dump: sub_m.get_flag("no-dump"),
        }),
        Some(("init", sub_m)) => CommandKind::Init(InitArgs {
            path: sub_m.get_one::<String>("path").map(PathBuf::from),
            force: sub_m.get_flag("force"),
            profile: sub_m.get_one::<String>("profile").cloned(),
        }),
        Some(("config", _)) => CommandKind::Config(ConfigArgs),
        Some(("completions", sub_m)) => CommandKind::Completions(CompletionsArgs {
            shell: sub_m.get_one::<String>("shell").cloned(),
        }),
        _ => CommandKind::Help {
            all: false,
            command: None,
        },
    };

    CliArgs {
        config_path,
        env_file,
        profile,
        server,
        port,
        database,
        user,
        password,
        timeout_ms,
        encrypt,
        trust_cert,
        output,
        verbose,
        quiet,
        command,
    }
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

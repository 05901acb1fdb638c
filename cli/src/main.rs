use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use schema_guard_config::{BackendConfig, Settings};
use schema_guard_core::{MetadataProbe, ProbeStatus, SchemaGuard};
use schema_guard_rest::RestProbe;
use schema_guard_sqlite::{Migration, SqliteProbe};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_API_KEY_ENV: &str = "SCHEMA_GUARD_API_KEY";

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "schema-guard")]
#[command(about = "Detect schema drift between the LMS admin dashboard and its backend")]
struct Cli {
    /// Log probe and cache activity to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check once that all required tables and columns exist.
    Check(CheckArgs),
    /// Re-check on a fixed interval through one cached guard.
    Watch(WatchArgs),
    /// Create, drop, or inspect the LMS tables in a local SQLite database.
    Migrate(MigrateArgs),
    /// Write a default settings file.
    InitConfig(InitConfigArgs),
}

#[derive(Debug, Args)]
struct BackendArgs {
    /// Settings YAML file (guard + backend).
    #[arg(long, env = "SCHEMA_GUARD_CONFIG")]
    config: Option<PathBuf>,
    /// SQLite database to probe (overrides the configured backend).
    #[arg(long, conflicts_with = "url")]
    db: Option<PathBuf>,
    /// Table prefix for the SQLite backend.
    #[arg(long, requires = "db")]
    prefix: Option<String>,
    /// PostgREST project URL to probe (overrides the configured backend).
    #[arg(long)]
    url: Option<String>,
    /// Environment variable holding the REST API key.
    #[arg(long, default_value = DEFAULT_API_KEY_ENV)]
    api_key_env: String,
    /// Exposed schema for the REST backend.
    #[arg(long, requires = "url")]
    schema: Option<String>,
    /// Comma-separated required tables (overrides the configured list).
    #[arg(long)]
    tables: Option<String>,
    /// Required column as `table.column`; repeatable.
    #[arg(long = "column")]
    columns: Vec<String>,
    /// Probe tables concurrently.
    #[arg(long)]
    parallel: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    backend: BackendArgs,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,
    /// Include every probe result, not just issues.
    #[arg(long)]
    detailed: bool,
    /// Exit with an error when any issue is found.
    #[arg(long)]
    fail_on_issues: bool,
}

#[derive(Debug, Args)]
struct WatchArgs {
    #[command(flatten)]
    backend: BackendArgs,
    /// Seconds between checks.
    #[arg(long, default_value_t = 30)]
    interval_secs: u64,
    /// Stop after this many checks (runs forever when omitted).
    #[arg(long)]
    iterations: Option<u64>,
    /// Override the cache TTL in milliseconds.
    #[arg(long)]
    cache_ttl_ms: Option<u64>,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create the LMS tables.
    Up(MigrateDbArgs),
    /// Drop the LMS tables.
    Down(MigrateDbArgs),
    /// Drop one LMS table to reproduce drift.
    DropTable(MigrateDropTableArgs),
    /// Show which LMS tables exist and their row counts.
    Status(MigrateDbArgs),
}

#[derive(Debug, Args)]
struct MigrateDbArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table prefix.
    #[arg(long, default_value = "")]
    prefix: String,
}

#[derive(Debug, Args)]
struct MigrateDropTableArgs {
    #[command(flatten)]
    db: MigrateDbArgs,
    /// Unprefixed table name.
    #[arg(long)]
    table: String,
}

#[derive(Debug, Args)]
struct InitConfigArgs {
    /// Output YAML path.
    #[arg(long)]
    output: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Watch(args) => run_watch(args),
        Command::Migrate(args) => run_migrate(args),
        Command::InitConfig(args) => run_init_config(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "error" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// check / watch
// ---------------------------------------------------------------------------

fn run_check(args: CheckArgs) -> Result<(), String> {
    let guard = build_guard(&args.backend, None)?;
    let report = guard.scan();

    match (args.format, args.detailed) {
        (OutputFormat::Json, true) => print_json(&report)?,
        (OutputFormat::Json, false) => print_json(&report.issues)?,
        (OutputFormat::Text, detailed) => {
            if detailed {
                for result in &report.results {
                    println!("{:<13} {}", status_label(result.status), result.target);
                }
            }
            if report.is_healthy() {
                println!(
                    "Schema OK ({} tables checked)",
                    guard.config().required_tables.len()
                );
            } else {
                for issue in &report.issues {
                    println!("{issue}");
                }
            }
        }
    }

    if args.fail_on_issues && !report.is_healthy() {
        return Err(format!(
            "schema drift detected: {} issue(s)",
            report.issues.len()
        ));
    }
    Ok(())
}

fn run_watch(args: WatchArgs) -> Result<(), String> {
    let guard = build_guard(&args.backend, args.cache_ttl_ms)?;
    let interval = Duration::from_secs(args.interval_secs);

    let mut previous: Option<Vec<String>> = None;
    let mut count = 0u64;
    loop {
        count += 1;
        let issues: Vec<String> = guard
            .check_schema()
            .iter()
            .map(ToString::to_string)
            .collect();

        if previous.as_ref() != Some(&issues) {
            if issues.is_empty() {
                println!("[check {count}] Schema OK");
            } else {
                println!("[check {count}] {} issue(s):", issues.len());
                for issue in &issues {
                    println!("  {issue}");
                }
            }
        } else {
            println!("[check {count}] unchanged");
        }
        previous = Some(issues);

        if args.iterations.is_some_and(|n| count >= n) {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}

fn status_label(status: ProbeStatus) -> &'static str {
    match status {
        ProbeStatus::Present => "present",
        ProbeStatus::Missing => "missing",
        ProbeStatus::Indeterminate => "indeterminate",
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

/// Resolves settings, applies command-line overrides, and builds a guard.
fn build_guard(
    args: &BackendArgs,
    cache_ttl_ms: Option<u64>,
) -> Result<SchemaGuard<Box<dyn MetadataProbe>>, String> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)
            .map_err(|e| format!("Failed to load settings '{}': {e}", path.display()))?,
        None => Settings::default(),
    };

    let backend = if let Some(db) = &args.db {
        BackendConfig::Sqlite {
            path: db.clone(),
            prefix: args.prefix.clone(),
        }
    } else if let Some(url) = &args.url {
        BackendConfig::Rest {
            url: url.clone(),
            api_key_env: args.api_key_env.clone(),
            schema: args.schema.clone(),
        }
    } else if args.config.is_some() {
        settings.backend.clone()
    } else {
        return Err("Specify a backend: --config, --db, or --url".to_string());
    };

    let mut guard_config = settings.guard;
    if let Some(tables) = &args.tables {
        guard_config.required_tables = parse_csv_list(tables);
    }
    for entry in &args.columns {
        let (table, column) = entry
            .split_once('.')
            .ok_or_else(|| format!("--column expects table.column, got '{entry}'"))?;
        guard_config = guard_config.with_required_column(table, column);
    }
    if args.parallel {
        guard_config.parallel = true;
    }
    if let Some(ttl) = cache_ttl_ms {
        guard_config.cache_ttl_ms = ttl;
    }

    let problems = guard_config.validate();
    if !problems.is_empty() {
        let messages: Vec<String> = problems.iter().map(ToString::to_string).collect();
        return Err(format!("Invalid guard configuration: {}", messages.join("; ")));
    }

    debug!(?backend, tables = guard_config.required_tables.len(), "Building guard");
    let probe = open_probe(&backend)?;
    Ok(SchemaGuard::new(probe, guard_config))
}

fn open_probe(backend: &BackendConfig) -> Result<Box<dyn MetadataProbe>, String> {
    match backend {
        BackendConfig::Sqlite { path, prefix } => {
            if !path.exists() {
                return Err(format!("Database '{}' does not exist", path.display()));
            }
            let probe = SqliteProbe::open(path, prefix.clone().unwrap_or_default())
                .map_err(|e| format!("Failed to open database '{}': {e}", path.display()))?;
            Ok(Box::new(probe))
        }
        BackendConfig::Rest { url, schema, .. } => {
            let key = backend
                .api_key()
                .map_err(|e| e.to_string())?
                .unwrap_or_default();
            let mut probe =
                RestProbe::new(url, key).map_err(|e| format!("Failed to create REST probe: {e}"))?;
            if let Some(schema) = schema {
                probe = probe.with_schema(schema.clone());
            }
            Ok(Box::new(probe))
        }
    }
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(args: MigrateArgs) -> Result<(), String> {
    match args.operation {
        MigrateOperation::Up(a) => run_migrate_up(a),
        MigrateOperation::Down(a) => run_migrate_down(a),
        MigrateOperation::DropTable(a) => run_migrate_drop_table(a),
        MigrateOperation::Status(a) => run_migrate_status(a),
    }
}

fn open_migration(args: &MigrateDbArgs) -> Result<Migration, String> {
    let conn = rusqlite::Connection::open(&args.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.db.display()))?;
    Migration::new(conn, &args.prefix).map_err(|e| format!("Failed to initialize migration: {e}"))
}

fn run_migrate_up(args: MigrateDbArgs) -> Result<(), String> {
    let mut migration = open_migration(&args)?;
    migration
        .up()
        .map_err(|e| format!("Migration up failed: {e}"))?;
    println!(
        "Migration up complete. LMS tables created with prefix '{}' in '{}'.",
        args.prefix,
        args.db.display()
    );
    Ok(())
}

fn run_migrate_down(args: MigrateDbArgs) -> Result<(), String> {
    let mut migration = open_migration(&args)?;
    migration
        .down()
        .map_err(|e| format!("Migration down failed: {e}"))?;
    println!(
        "Migration down complete. LMS tables with prefix '{}' dropped from '{}'.",
        args.prefix,
        args.db.display()
    );
    Ok(())
}

fn run_migrate_drop_table(args: MigrateDropTableArgs) -> Result<(), String> {
    let mut migration = open_migration(&args.db)?;
    migration
        .drop_table(&args.table)
        .map_err(|e| format!("Drop table failed: {e}"))?;
    println!("Dropped table '{}{}'.", args.db.prefix, args.table);
    Ok(())
}

fn run_migrate_status(args: MigrateDbArgs) -> Result<(), String> {
    let migration = open_migration(&args)?;
    let status = migration
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;
    println!("Migration Status:");
    for table in status {
        match table.rows {
            Some(rows) => println!("  {}: present ({rows} rows)", table.name),
            None => println!("  {}: missing", table.name),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// init-config command
// ---------------------------------------------------------------------------

fn run_init_config(args: InitConfigArgs) -> Result<(), String> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "'{}' already exists (use --force to overwrite)",
            args.output.display()
        ));
    }
    Settings::default()
        .save(&args.output)
        .map_err(|e| format!("Failed to write '{}': {e}", args.output.display()))?;
    println!("Wrote default settings to '{}'.", args.output.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Splits a comma-separated list, trimming blanks.
fn parse_csv_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

// crates/mobility-lake-cli/src/main.rs
// ============================================================================
// Module: Mobility Lake CLI Entry Point
// Description: Command dispatcher for every pipeline pass and govern query.
// Purpose: Operator entry points for ingestion, processing, access and audit.
// Dependencies: clap, mobility-lake-cli, mobility-lake-config, serde_json
// ============================================================================

//! ## Overview
//! Each command loads the configuration, opens one [`LakeRuntime`] and runs a
//! pass against it. Results are printed to stdout as pretty JSON; audit
//! events go wherever the configuration sends them. A pass that isolates
//! failures (ingest, process, access, sink load) still prints every outcome
//! and exits non-zero when any item failed.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use mobility_lake_cli::LakeRuntime;
use mobility_lake_config::LakeConfig;
use mobility_lake_config::config_toml_example;
use mobility_lake_core::DatasetName;
use mobility_lake_core::ObjectRef;
use mobility_lake_core::runtime::AccessView;
use mobility_lake_core::runtime::read_view;
use mobility_lake_core::runtime::run_stages;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "mobility-lake", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Config file path (defaults to `MOBILITY_LAKE_CONFIG`, then
    /// `mobility-lake.toml`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload local source files into the raw zone.
    Ingest(IngestCommand),
    /// Run raw to process stages.
    Process(ProcessCommand),
    /// Build access-zone views.
    Access(AccessCommand),
    /// Run ingestion, processing, access views and policy publication.
    Run(IngestCommand),
    /// Govern-zone reports and policy publication.
    Govern {
        /// Selected govern subcommand.
        #[command(subcommand)]
        command: GovernCommand,
    },
    /// Lineage queries.
    Lineage {
        /// Selected lineage subcommand.
        #[command(subcommand)]
        command: LineageCommand,
    },
    /// Metadata catalog queries.
    Catalog {
        /// Selected catalog subcommand.
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Relational sink utilities.
    Sink {
        /// Selected sink subcommand.
        #[command(subcommand)]
        command: SinkCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `ingest` and `run`.
#[derive(Args, Debug)]
struct IngestCommand {
    /// Directory holding the source files (overrides `pipeline.ingest_dir`).
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,
}

/// Arguments for `process`.
#[derive(Args, Debug)]
struct ProcessCommand {
    /// Only run the named stages (repeatable).
    #[arg(long = "stage", value_name = "NAME")]
    stages: Vec<String>,
    /// Run stages on separate threads (overrides `pipeline.parallel`).
    #[arg(long, action = ArgAction::SetTrue)]
    parallel: bool,
}

/// Arguments for `access`.
#[derive(Args, Debug)]
struct AccessCommand {
    /// Only build the named views (repeatable).
    #[arg(long = "view", value_name = "NAME")]
    views: Vec<String>,
}

/// Govern subcommands.
#[derive(Subcommand, Debug)]
enum GovernCommand {
    /// Print every stored quality check with pass rates.
    QualityReport(QualityReportCommand),
    /// Trace every cataloged access-zone dataset.
    LineageReport,
    /// List process and access objects without provenance.
    Untraced,
    /// Publish the security policy to the govern security bucket.
    PublishPolicy,
}

/// Arguments for `govern quality-report`.
#[derive(Args, Debug)]
struct QualityReportCommand {
    /// Only print failed checks.
    #[arg(long, action = ArgAction::SetTrue)]
    failed_only: bool,
}

/// Lineage subcommands.
#[derive(Subcommand, Debug)]
enum LineageCommand {
    /// Trace an object back to its origins.
    Trace(LineageTraceCommand),
}

/// Arguments for `lineage trace`.
#[derive(Args, Debug)]
struct LineageTraceCommand {
    /// Bucket of the traced object.
    #[arg(long, value_name = "BUCKET")]
    bucket: String,
    /// Key of the traced object.
    #[arg(long, value_name = "KEY")]
    object: String,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List every catalog record grouped by location.
    List,
    /// Print one catalog record.
    Get(CatalogGetCommand),
}

/// Arguments for `catalog get`.
#[derive(Args, Debug)]
struct CatalogGetCommand {
    /// Dataset name.
    #[arg(value_name = "NAME")]
    name: String,
}

/// Sink subcommands.
#[derive(Subcommand, Debug)]
enum SinkCommand {
    /// Reload published access views into the relational sink.
    Load(AccessCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
    /// Print a canonical example configuration.
    Example,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Message shown on stderr.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }

    /// Prefixes an underlying error with context.
    fn context(context: &str, error: impl Display) -> Self {
        Self::new(format!("{context}: {error}"))
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// One item of a pass that isolates failures.
#[derive(Debug, Serialize)]
struct Outcome<T> {
    /// Stage, view or file name.
    name: String,
    /// Whether the item succeeded.
    ok: bool,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<T>,
    /// Error category on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    /// Error detail on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> Outcome<T> {
    /// Builds an outcome from a result and its error category.
    fn from_result<E: Display>(
        name: impl Into<String>,
        result: Result<T, E>,
        kind: impl Fn(&E) -> &'static str,
    ) -> Self {
        match result {
            Ok(report) => Self {
                name: name.into(),
                ok: true,
                report: Some(report),
                error_kind: None,
                error: None,
            },
            Err(err) => Self {
                name: name.into(),
                ok: false,
                report: None,
                error_kind: Some(kind(&err)),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Summary printed by `run`.
#[derive(Debug, Serialize)]
struct RunSummary {
    /// Ingested files.
    ingest: Vec<Outcome<mobility_lake_core::DatasetRecord>>,
    /// Process stages.
    process: Vec<Outcome<mobility_lake_core::runtime::StageReport>>,
    /// Access views.
    access: Vec<Outcome<mobility_lake_core::runtime::AccessReport>>,
    /// Security policy publication.
    policy: Outcome<mobility_lake_core::runtime::PolicyPublication>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("mobility-lake {version}"))
            .map_err(|err| CliError::context("stdout", err))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        return Err(CliError::new("no command given; see --help".to_string()));
    };
    let config_path = cli.config.as_deref();
    match command {
        Commands::Config {
            command: ConfigCommand::Example,
        } => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::context("stdout", err))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config {
            command: ConfigCommand::Validate,
        } => {
            LakeConfig::load(config_path)
                .map_err(|err| CliError::context("config load failed", err))?;
            write_stdout_line("config ok").map_err(|err| CliError::context("stdout", err))?;
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let config = LakeConfig::load(config_path)
                .map_err(|err| CliError::context("config load failed", err))?;
            let runtime =
                LakeRuntime::open(config).map_err(|err| CliError::context("startup failed", err))?;
            dispatch(&runtime, command)
        }
    }
}

/// Runs a command that needs an open runtime.
fn dispatch(runtime: &LakeRuntime, command: Commands) -> CliResult<ExitCode> {
    match command {
        Commands::Ingest(command) => {
            ensure_buckets(runtime)?;
            let outcomes = command_ingest(runtime, &command);
            emit_outcomes(&outcomes)
        }
        Commands::Process(command) => {
            ensure_buckets(runtime)?;
            let outcomes = command_process(runtime, &command)?;
            emit_outcomes(&outcomes)
        }
        Commands::Access(command) => {
            ensure_buckets(runtime)?;
            let outcomes = command_access(runtime, &command)?;
            emit_outcomes(&outcomes)
        }
        Commands::Run(command) => command_run(runtime, &command),
        Commands::Govern {
            command,
        } => command_govern(runtime, command),
        Commands::Lineage {
            command: LineageCommand::Trace(command),
        } => {
            let target = ObjectRef::new(command.bucket, command.object);
            let trace = runtime
                .lake()
                .lineage()
                .trace(&target)
                .map_err(|err| CliError::context("lineage trace failed", err))?;
            write_json(&trace)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Catalog {
            command,
        } => command_catalog(runtime, command),
        Commands::Sink {
            command: SinkCommand::Load(command),
        } => {
            let outcomes = command_sink_load(runtime, &command)?;
            emit_outcomes(&outcomes)
        }
        Commands::Config {
            ..
        } => Err(CliError::new("config commands do not open the lake".to_string())),
    }
}

// ============================================================================
// SECTION: Pipeline Commands
// ============================================================================

/// Creates every zone bucket.
fn ensure_buckets(runtime: &LakeRuntime) -> CliResult<()> {
    runtime.lake().ensure_buckets().map_err(|err| CliError::context("bucket setup failed", err))
}

/// Executes `ingest`.
fn command_ingest(
    runtime: &LakeRuntime,
    command: &IngestCommand,
) -> Vec<Outcome<mobility_lake_core::DatasetRecord>> {
    let config = runtime.config();
    let dir = command.dir.clone().unwrap_or_else(|| config.pipeline.ingest_dir.clone());
    runtime
        .lake()
        .ingestor()
        .ingest_all(&dir, &config.ingest_plan())
        .into_iter()
        .map(|(spec, result)| Outcome::from_result(spec.key, result, |err| err.kind()))
        .collect()
}

/// Executes `process`.
fn command_process(
    runtime: &LakeRuntime,
    command: &ProcessCommand,
) -> CliResult<Vec<Outcome<mobility_lake_core::runtime::StageReport>>> {
    let plan = runtime.config().stage_plan();
    let specs = select_by_name(plan, &command.stages, |spec| spec.name.as_str(), "stage")?;
    let parallel = command.parallel || runtime.config().pipeline.parallel;
    let runner = runtime.lake().runner();
    Ok(run_stages(&runner, &specs, parallel)
        .into_iter()
        .map(|(name, result)| Outcome::from_result(name.to_string(), result, |err| err.kind()))
        .collect())
}

/// Executes `access`.
fn command_access(
    runtime: &LakeRuntime,
    command: &AccessCommand,
) -> CliResult<Vec<Outcome<mobility_lake_core::runtime::AccessReport>>> {
    let views = parse_views(&command.views)?;
    let builder = runtime.access_builder();
    Ok(views
        .into_iter()
        .map(|view| {
            let outcome =
                Outcome::from_result(view.as_str(), builder.build(view), |err| err.kind());
            flag_sink_failure(outcome)
        })
        .collect())
}

/// Marks a published view whose sink load failed as a failed item.
fn flag_sink_failure(
    mut outcome: Outcome<mobility_lake_core::runtime::AccessReport>,
) -> Outcome<mobility_lake_core::runtime::AccessReport> {
    let error =
        outcome.report.as_ref().and_then(|report| report.sink_error()).map(str::to_string);
    if let Some(error) = error {
        outcome.ok = false;
        outcome.error_kind = Some("sink");
        outcome.error = Some(error);
    }
    outcome
}

/// Executes `run`: every pass in zone order, then policy publication.
fn command_run(runtime: &LakeRuntime, command: &IngestCommand) -> CliResult<ExitCode> {
    ensure_buckets(runtime)?;
    let ingest = command_ingest(runtime, command);
    let process = command_process(
        runtime,
        &ProcessCommand {
            stages: Vec::new(),
            parallel: false,
        },
    )?;
    let access = command_access(
        runtime,
        &AccessCommand {
            views: Vec::new(),
        },
    )?;
    let policy = runtime
        .security_policy()
        .map_err(|err| CliError::context("security policy unavailable", err))?;
    let policy = Outcome::from_result(
        "security_policy",
        runtime.lake().reporter().publish_policy(&policy),
        |_| "govern",
    );
    let ok = ingest.iter().all(|item| item.ok)
        && process.iter().all(|item| item.ok)
        && access.iter().all(|item| item.ok)
        && policy.ok;
    write_json(&RunSummary {
        ingest,
        process,
        access,
        policy,
    })?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Executes `sink load`.
fn command_sink_load(
    runtime: &LakeRuntime,
    command: &AccessCommand,
) -> CliResult<Vec<Outcome<usize>>> {
    let Some(sink) = runtime.sink() else {
        return Err(CliError::new("no relational sink is configured".to_string()));
    };
    let views = parse_views(&command.views)?;
    let lake = runtime.lake();
    Ok(views
        .into_iter()
        .filter_map(|view| view.sink_table().map(|table_name| (view, table_name)))
        .map(|(view, table_name)| {
            let result = read_view(lake.store().as_ref(), lake.buckets(), view)
                .map_err(|err| CliError::context(view.as_str(), err))
                .and_then(|table| {
                    sink.load_replace(table_name, &table)
                        .map_err(|err| CliError::context(table_name, err))
                });
            Outcome::from_result(table_name, result, |_| "sink")
        })
        .collect())
}

// ============================================================================
// SECTION: Govern Commands
// ============================================================================

/// Dispatches govern subcommands.
fn command_govern(runtime: &LakeRuntime, command: GovernCommand) -> CliResult<ExitCode> {
    let reporter = runtime.lake().reporter();
    match command {
        GovernCommand::QualityReport(command) => {
            let mut report = reporter
                .quality_report()
                .map_err(|err| CliError::context("quality report failed", err))?;
            if command.failed_only {
                report.rows.retain(|row| !row.passed);
            }
            write_json(&report)?;
        }
        GovernCommand::LineageReport => {
            let report = reporter
                .lineage_report()
                .map_err(|err| CliError::context("lineage report failed", err))?;
            write_json(&report)?;
        }
        GovernCommand::Untraced => {
            let untraced = reporter
                .untraced()
                .map_err(|err| CliError::context("untraced audit failed", err))?;
            write_json(&untraced)?;
        }
        GovernCommand::PublishPolicy => {
            ensure_buckets(runtime)?;
            let policy = runtime
                .security_policy()
                .map_err(|err| CliError::context("security policy unavailable", err))?;
            let publication = reporter
                .publish_policy(&policy)
                .map_err(|err| CliError::context("policy publication failed", err))?;
            write_json(&publication)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Dispatches catalog subcommands.
fn command_catalog(runtime: &LakeRuntime, command: CatalogCommand) -> CliResult<ExitCode> {
    let catalog = runtime.lake().catalog();
    match command {
        CatalogCommand::List => {
            let listing =
                catalog.list_all().map_err(|err| CliError::context("catalog list failed", err))?;
            write_json(&listing)?;
            Ok(ExitCode::SUCCESS)
        }
        CatalogCommand::Get(command) => {
            let record = catalog
                .get(&DatasetName::new(command.name.as_str()))
                .map_err(|err| CliError::context("catalog read failed", err))?;
            match record {
                Some(record) => {
                    write_json(&record)?;
                    Ok(ExitCode::SUCCESS)
                }
                None => Err(CliError::new(format!("dataset `{}` is not cataloged", command.name))),
            }
        }
    }
}

// ============================================================================
// SECTION: Selection Helpers
// ============================================================================

/// Keeps the items whose names were requested; no names keeps everything.
fn select_by_name<T>(
    items: Vec<T>,
    names: &[String],
    name_of: impl Fn(&T) -> &str,
    label: &str,
) -> CliResult<Vec<T>> {
    if names.is_empty() {
        return Ok(items);
    }
    if let Some(unknown) =
        names.iter().find(|name| !items.iter().any(|item| name_of(item) == name.as_str()))
    {
        return Err(CliError::new(format!("unknown {label} `{unknown}`")));
    }
    Ok(items.into_iter().filter(|item| names.iter().any(|name| name == name_of(item))).collect())
}

/// Parses requested view names; no names selects every view.
fn parse_views(names: &[String]) -> CliResult<Vec<AccessView>> {
    select_by_name(AccessView::ALL.to_vec(), names, |view| view.as_str(), "view")
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Prints outcomes and maps any failure to a non-zero exit.
fn emit_outcomes<T: Serialize>(outcomes: &[Outcome<T>]) -> CliResult<ExitCode> {
    write_json(&outcomes)?;
    let failed = outcomes.iter().filter(|outcome| !outcome.ok).count();
    if failed == 0 {
        return Ok(ExitCode::SUCCESS);
    }
    write_stderr_line(&format!("{failed} of {} items failed", outcomes.len()))
        .map_err(|err| CliError::context("stderr", err))?;
    Ok(ExitCode::FAILURE)
}

/// Writes a value as pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::context("output encoding failed", err))?;
    write_stdout_line(&text).map_err(|err| CliError::context("stdout", err))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

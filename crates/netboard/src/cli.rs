//! Clap derive structures for the `netboard` command line.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-level ────────────────────────────────────────────────────────

/// Onboard sites, zones and network devices into an IoT platform, stream
/// switch and AP telemetry over MQTT, and export PoE history.
#[derive(Debug, Parser)]
#[command(
    name = "netboard",
    version,
    about,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Settings file (TOML)
    #[arg(long, global = true, env = "NETBOARD_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    JsonCompact,
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the customer, sites, zones and devices on the platform
    Onboard(OnboardArgs),

    /// Discover switch stacks live and onboard each member
    OnboardSwitches(OnboardSwitchesArgs),

    /// Run a telemetry loop until interrupted
    #[command(subcommand)]
    Stream(StreamCommand),

    /// Export hourly PoE history to workbooks and JSON
    Export(ExportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Onboarding ───────────────────────────────────────────────────────

/// Input file overrides shared by the onboarding commands.
#[derive(Debug, Default, Args)]
pub struct TopologyFiles {
    /// Platform file (api, broker, customer)
    #[arg(long)]
    pub platform_file: Option<PathBuf>,

    /// Sites file
    #[arg(long)]
    pub sites_file: Option<PathBuf>,

    /// Zones file
    #[arg(long)]
    pub zones_file: Option<PathBuf>,

    /// Access points file
    #[arg(long)]
    pub aps_file: Option<PathBuf>,

    /// Switches file
    #[arg(long)]
    pub switches_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct OnboardArgs {
    #[command(flatten)]
    pub files: TopologyFiles,

    /// Build devices from files instead of live discovery [env: IS_OFFLINE]
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_bool)]
    pub offline: Option<bool>,

    /// Onboard only access points from files [env: APS_ONLY]
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_bool)]
    pub aps_only: Option<bool>,

    /// Build and print the topology without contacting the platform
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct OnboardSwitchesArgs {
    /// Platform file (api, broker, customer)
    #[arg(long)]
    pub platform_file: Option<PathBuf>,

    /// Switches file supplying zone parents
    #[arg(long)]
    pub switches_file: Option<PathBuf>,

    /// Testbed describing reachable switches
    #[arg(long)]
    pub testbed_file: Option<PathBuf>,

    /// Discover and print stack members without contacting the platform
    #[arg(long)]
    pub dry_run: bool,
}

// ── Streaming ────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum StreamCommand {
    /// Poll switches, save snapshots and publish environment and PoE
    Switches(StreamArgs),

    /// Publish per-AP PoE from the latest switch snapshots
    Aps(StreamArgs),

    /// Collect extended CLI diagnostics to disk
    SwitchesExtra(StreamArgs),
}

#[derive(Debug, Args)]
pub struct StreamArgs {
    /// Platform file (broker section)
    #[arg(long)]
    pub platform_file: Option<PathBuf>,

    /// Testbed describing reachable switches
    #[arg(long)]
    pub testbed_file: Option<PathBuf>,

    /// Snapshot directory
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Print records as JSON lines instead of publishing or saving them
    #[arg(long)]
    pub dry_run: bool,
}

// ── Export ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Platform file (api section)
    #[arg(long)]
    pub platform_file: Option<PathBuf>,

    /// Access points file naming the devices to export
    #[arg(long)]
    pub aps_file: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Window start (RFC 3339 or epoch milliseconds)
    #[arg(long, value_parser = parse_instant)]
    pub start: Option<i64>,

    /// Split point between the two bulk reads; halfway when omitted
    #[arg(long, value_parser = parse_instant)]
    pub mid: Option<i64>,

    /// Window end (RFC 3339 or epoch milliseconds)
    #[arg(long, value_parser = parse_instant)]
    pub end: Option<i64>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

fn parse_bool(value: &str) -> Result<bool, String> {
    netboard_config::parse_flag("value", value).map_err(|e| e.to_string())
}

/// Epoch milliseconds, or an RFC 3339 timestamp (UTC when no offset).
pub fn parse_instant(value: &str) -> Result<i64, String> {
    if let Ok(ms) = value.parse::<i64>() {
        return Ok(ms);
    }
    let time = humantime::parse_rfc3339_weak(value)
        .map_err(|e| format!("expected RFC 3339 or epoch milliseconds: {e}"))?;
    let since = time
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|_| "timestamps before 1970 are not supported".to_string())?;
    i64::try_from(since.as_millis()).map_err(|_| "timestamp out of range".to_string())
}

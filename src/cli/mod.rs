//! CLI argument definitions and command dispatch.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tapbot - Android icon-tap automation over adb.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "tapbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "TAPBOT_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (TOML or YAML); defaults to ./tapbot.toml if present
    #[arg(long, short = 'c', global = true, env = "TAPBOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Automation ===
    /// Start the HTTP trigger server (POST /run_bot)
    Serve(ServeArgs),

    /// Run the automation once against a device and wait for it
    Run(RunArgs),

    /// Locate an icon template in a screenshot
    Locate(LocateArgs),

    // === Devices ===
    /// List devices attached to adb
    Devices,

    /// Device/package username ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),

    // === Configuration ===
    /// Show the effective configuration
    Config(ConfigArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on [default: server.port]
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Bind address [default: server.bind]
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Device serial (as shown by `tapbot devices`)
    #[arg(long, short = 'd')]
    pub device: String,

    /// URL to open on the device
    #[arg(long, short = 'u')]
    pub url: String,

    /// Package to launch before opening the URL
    #[arg(long, short = 'p', default_value = "")]
    pub package: String,
}

#[derive(Parser, Debug)]
pub struct LocateArgs {
    /// Screenshot image
    pub screen: PathBuf,

    /// Icon template image
    pub template: PathBuf,

    /// Minimum score for a match, in (0, 1] [default: automation.threshold]
    #[arg(long, short = 't')]
    pub threshold: Option<f32>,

    /// Write the annotated screenshot here on a match
    #[arg(long)]
    pub debug_out: Option<PathBuf>,
}

/// Ledger operations.
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Add attached devices to the ledger
    Refresh,

    /// Show the table for one device, or every device
    Show(LedgerShowArgs),

    /// Set the username for a device and package
    SetUser(SetUserArgs),

    /// Set a device's display name (empty resets it)
    SetName(SetNameArgs),

    /// Print every stored record (full JSON in robot mode)
    Export,
}

#[derive(Parser, Debug)]
pub struct LedgerShowArgs {
    /// Device id
    pub device: Option<String>,
}

#[derive(Parser, Debug)]
pub struct SetUserArgs {
    /// Device id
    pub device: String,
    /// Package name (must be listed in the package file)
    pub package: String,
    /// Username
    pub user: String,
}

#[derive(Parser, Debug)]
pub struct SetNameArgs {
    /// Device id
    pub device: String,
    /// Display name
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show configuration file path only
    #[arg(long)]
    pub path: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

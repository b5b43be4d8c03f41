//! Clap derive structures for the `sessiongate` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sessiongate -- keep remote login sessions healthy
#[derive(Debug, Parser)]
#[command(
    name = "sessiongate",
    version,
    about = "Check and keep remote login sessions alive",
    long_about = "Logs in to every configured session provider, reports whether there\n\
        is a login issue, and re-checks whenever the network comes back.",
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

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the default location
    #[arg(long, env = "SESSIONGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SESSIONGATE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// How to decide whether the network is reachable
    #[arg(long, default_value = "auto", global = true)]
    pub connectivity: ConnectivityMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Mode Enums ──────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConnectivityMode {
    /// Probe the configured host
    Auto,
    /// Assume the network is reachable
    Online,
    /// Assume the network is unreachable
    Offline,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in where needed and report whether there is a login issue
    Check(CheckArgs),

    /// Keep checking; re-check whenever connectivity returns
    Watch(WatchArgs),

    /// List configured session providers
    #[command(alias = "p")]
    Providers(ProvidersArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Check / Watch ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Seconds to wait before re-checking (overrides config)
    #[arg(long)]
    pub recheck_delay: Option<u64>,

    /// Drop existing sessions before logging in again
    #[arg(long)]
    pub force_relogin: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds to wait before re-checking (overrides config)
    #[arg(long)]
    pub recheck_delay: Option<u64>,
}

// ── Providers ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProvidersArgs {
    /// Log in to each enabled provider, verify the session, then log out
    #[arg(long)]
    pub test: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactively add a session provider
    Init,

    /// Show the current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// Store a provider password in the system keyring
    SetPassword {
        /// Provider name
        #[arg(long)]
        provider: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

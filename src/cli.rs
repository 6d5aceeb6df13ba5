// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `playguard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "playguard",
    version,
    about = "Replay a recorded player session against the fullscreen guard.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If the file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value = "Playguard.toml")]
    pub config: String,

    /// Scenario file (TOML) describing the player session to replay.
    #[arg(long, value_name = "PATH")]
    pub scenario: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PLAYGUARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config and scenario, print the plan, replay nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

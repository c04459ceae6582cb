//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "vcu", version, about = "Vehicle control unit CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/vcu_config.toml")]
    pub config: PathBuf,

    /// Optional throttle map CSV (strict header)
    #[arg(long, value_name = "FILE")]
    pub throttle_map: Option<PathBuf>,

    /// Optional regen brake map CSV (strict header)
    #[arg(long, value_name = "FILE")]
    pub brake_map: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a drive session against the simulated car
    Drive {
        /// Stop after this many milliseconds (runs until Ctrl-C otherwise)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Print session stats on exit (ticks, overruns, transmit errors)
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Parse and validate the config, then exit
    CheckConfig,
    /// Print the CAN identifier contract as JSON
    Contract,
    /// Quick health check (sim stack assembles and steps)
    SelfCheck,
}

//! Command-line interface definitions for the emulator suite.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::emulators::EmulatorKind;

/// Top-level command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the configured emulators and hosting dev servers.
    Start(StartArgs),
}

/// Arguments for the start command.
#[derive(Debug, Parser)]
pub struct StartArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "localcloud.toml")]
    pub config: String,

    /// Only start these emulators (comma separated, e.g. functions,hosting)
    #[arg(long, value_delimiter = ',', value_parser = parse_emulator_kind)]
    pub only: Option<Vec<EmulatorKind>>,

    /// Start the functions emulator with its debugger enabled
    #[arg(long)]
    pub inspect_functions: bool,

    /// Directory with exported emulator state to import on startup
    #[arg(long)]
    pub import: Option<PathBuf>,

    /// Optional override for the hosting base port (overrides port in config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Optional override for the bind address (overrides host in config)
    #[arg(long)]
    pub host: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Supported log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
    Pretty,
}

fn parse_emulator_kind(value: &str) -> Result<EmulatorKind, String> {
    value.parse()
}

//! Library entry for the `localcloud_suite` crate.
//!
//! Exposes `inner_main` so the workspace-level shim binary can call into the
//! suite logic, plus the building blocks (controller, registry, hosting
//! server) for use in integration tests.

pub mod cli;
pub mod config;
pub mod emulators;
pub mod error;
pub mod hosting;
pub mod run;
pub mod shutdown;

use std::fs;
use std::sync::Once;

use eyre::{Result, WrapErr as _};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use cli::{Cli, Command, LogFormat};

static INIT_TRACING: Once = Once::new();

/// The suite's main function; can be called from a shim binary.
///
/// Parses nothing itself; takes an already-parsed CLI and dispatches.
///
/// # Errors
///
/// Returns an error if the config cannot be resolved or the suite fails to
/// start. Fatal suite errors carry a process exit code; see
/// [`error::SuiteError::exit_code`].
pub async fn inner_main(invocation: Cli) -> Result<()> {
    match invocation.command {
        Command::Start(args) => {
            let config = &args.config;
            let config_path =
                fs::canonicalize(config).wrap_err(format!("Config file not found at: {config}"))?;

            INIT_TRACING.call_once(|| {
                let builder = tracing_subscriber::fmt()
                    .with_env_filter(
                        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                    )
                    .with_timer(ChronoLocal::rfc_3339());

                match args.log_format {
                    LogFormat::Compact => builder.compact().init(),
                    LogFormat::Json => builder.json().init(),
                    LogFormat::Pretty => builder.pretty().init(),
                }
            });

            info!(config_path = %config_path.display(), "Starting local emulator suite");

            run::start(&config_path, &args).await?;
            Ok(())
        }
    }
}

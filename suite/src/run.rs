//! Wiring for the start command: load config, bring the suite up, print the
//! status table, wait for a termination signal, and shut everything down.

use std::path::Path;

use tracing::{debug, info};

use crate::cli::StartArgs;
use crate::config::{self, SuiteConfig};
use crate::emulators::{Controller, Registry, StartOptions};
use crate::shutdown::ShutdownSignal;

/// Runs the suite until a termination signal arrives.
///
/// # Errors
///
/// Returns an error when the config cannot be loaded or an emulator fails to
/// start; in the latter case the already-started emulators have been shut
/// down before the error surfaces.
pub async fn start(config_path: &Path, args: &StartArgs) -> eyre::Result<()> {
    let mut config = config::load(config_path).await?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }

    let options = StartOptions {
        only: args.only.clone(),
        inspect_functions: args.inspect_functions,
        import_dir: args.import.clone(),
    };

    let registry = Registry::new();
    let controller = Controller::new(registry.clone(), config_path.to_path_buf());

    let shutdown = ShutdownSignal::new();
    spawn_signal_listener(shutdown.clone());

    controller.start_all(&config, &options).await?;

    print_status_table(&config, &options, &registry);
    info!("All emulators started, it is now safe to connect.");

    shutdown.requested().await;
    controller.clean_shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Listens for termination signals for the lifetime of the process. The
/// first signal resolves the shutdown token; every later one is ignored.
fn spawn_signal_listener(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        loop {
            wait_for_termination_signal().await;
            if shutdown.request() {
                info!("Received shutdown signal, stopping emulators");
            } else {
                debug!("Shutdown already in progress, ignoring signal");
            }
        }
    });
}

async fn wait_for_termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to create SIGTERM signal handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        drop(tokio::signal::ctrl_c().await);
    }
}

fn print_status_table(config: &SuiteConfig, options: &StartOptions, registry: &Registry) {
    println!();
    println!("{:<12} {}", "Emulator", "Host:Port");
    println!("{:-<12} {:-<21}", "", "");
    for kind in Controller::filter_emulator_targets(config, options) {
        match registry.get_info(kind) {
            Some(info) => {
                println!("{:<12} {}:{}", kind.to_string(), info.host, info.port);
            }
            None => println!("{:<12} Failed to initialize (see log above)", kind.to_string()),
        }
    }
    println!();
}

//! Startup and shutdown orchestration for the emulator suite.
//!
//! The controller owns every live handle (child processes, bound hosting
//! servers) and is the only writer of the registry. Startup is sequential in
//! dependency order so later services find their dependencies registered;
//! shutdown runs in reverse start order, is idempotent, and never fails
//! outward.

use std::net::IpAddr;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{ProcessConfig, SuiteConfig};
use crate::emulators::process::ProcessEmulator;
use crate::emulators::{EmulatorInfo, EmulatorKind, Registry, START_ORDER};
use crate::error::SuiteError;
use crate::hosting::ports::hosting_port;
use crate::hosting::server::HostingServer;

/// Startup options resolved from the CLI.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Restrict startup to these kinds (`--only`). `None` starts everything
    /// the config declares.
    pub only: Option<Vec<EmulatorKind>>,
    /// Pass a debugging flag to the functions emulator.
    pub inspect_functions: bool,
    /// State directory handed to the firestore emulator (`--import`).
    pub import_dir: Option<PathBuf>,
}

/// A live handle, held exclusively by the controller. The registry only
/// carries endpoint records.
enum RunningEmulator {
    Process(ProcessEmulator),
    Hosting {
        info: EmulatorInfo,
        servers: Vec<HostingServer>,
    },
}

impl RunningEmulator {
    fn info(&self) -> EmulatorInfo {
        match self {
            Self::Process(process) => process.info().clone(),
            Self::Hosting { info, .. } => info.clone(),
        }
    }

    async fn stop(self) {
        match self {
            Self::Process(process) => process.stop().await,
            Self::Hosting { servers, .. } => {
                for server in servers {
                    server.stop().await;
                }
            }
        }
    }
}

pub struct Controller {
    registry: Registry,
    config_path: PathBuf,
    running: Mutex<Vec<(EmulatorKind, RunningEmulator)>>,
}

impl Controller {
    pub fn new(registry: Registry, config_path: PathBuf) -> Self {
        Self {
            registry,
            config_path,
            running: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The ordered list of emulator kinds a start request will launch: the
    /// fixed dependency order, narrowed to what the config declares and what
    /// `--only` selects. Pure; no side effects.
    pub fn filter_emulator_targets(
        config: &SuiteConfig,
        options: &StartOptions,
    ) -> Vec<EmulatorKind> {
        START_ORDER
            .into_iter()
            .filter(|kind| {
                let configured = match kind {
                    EmulatorKind::Functions => config.emulators.functions.is_some(),
                    EmulatorKind::Firestore => config.emulators.firestore.is_some(),
                    EmulatorKind::Run => config.emulators.run.is_some(),
                    EmulatorKind::Hosting => !config.hosting.is_empty(),
                    EmulatorKind::Gui => config.emulators.gui.is_some(),
                };
                let selected = options
                    .only
                    .as_ref()
                    .is_none_or(|only| only.contains(kind));
                configured && selected
            })
            .collect()
    }

    /// Starts every requested emulator in dependency order, registering each
    /// success. On the first failure the remaining startups are aborted, the
    /// already-started emulators are shut down best-effort, and the original
    /// error is propagated untouched.
    ///
    /// # Errors
    ///
    /// The error of the emulator that failed to start; shutdown errors never
    /// replace it.
    pub async fn start_all(
        &self,
        config: &SuiteConfig,
        options: &StartOptions,
    ) -> Result<(), SuiteError> {
        for kind in Self::filter_emulator_targets(config, options) {
            match self.start_one(kind, config, options).await {
                Ok(running) => {
                    self.registry.register(running.info());
                    self.running.lock().await.push((kind, running));
                }
                Err(err) => {
                    warn!(%kind, "Emulator failed to start, shutting down the rest");
                    self.clean_shutdown().await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn start_one(
        &self,
        kind: EmulatorKind,
        config: &SuiteConfig,
        options: &StartOptions,
    ) -> Result<RunningEmulator, SuiteError> {
        match kind {
            EmulatorKind::Functions => {
                let cfg = require_process_config(kind, config.emulators.functions.as_ref())?;
                let extra = if options.inspect_functions {
                    vec!["--inspect".to_string()]
                } else {
                    Vec::new()
                };
                let process = ProcessEmulator::start(kind, cfg, &extra).await?;
                Ok(RunningEmulator::Process(process))
            }
            EmulatorKind::Firestore => {
                let cfg = require_process_config(kind, config.emulators.firestore.as_ref())?;
                let extra = options.import_dir.as_ref().map_or_else(Vec::new, |dir| {
                    vec!["--import".to_string(), dir.display().to_string()]
                });
                let process = ProcessEmulator::start(kind, cfg, &extra).await?;
                Ok(RunningEmulator::Process(process))
            }
            EmulatorKind::Run => {
                let cfg = require_process_config(kind, config.emulators.run.as_ref())?;
                let process = ProcessEmulator::start(kind, cfg, &[]).await?;
                Ok(RunningEmulator::Process(process))
            }
            EmulatorKind::Gui => {
                let cfg = require_process_config(kind, config.emulators.gui.as_ref())?;
                let process = ProcessEmulator::start(kind, cfg, &[]).await?;
                Ok(RunningEmulator::Process(process))
            }
            EmulatorKind::Hosting => self.start_hosting(config).await,
        }
    }

    async fn start_hosting(&self, config: &SuiteConfig) -> Result<RunningEmulator, SuiteError> {
        let host: IpAddr = config.server.host.parse().map_err(|err| {
            SuiteError::Config(format!(
                "invalid hosting bind address '{}': {err}",
                config.server.host
            ))
        })?;

        let mut servers = Vec::with_capacity(config.hosting.len());
        for (index, site) in config.hosting.iter().enumerate() {
            let port = hosting_port(config.server.port, index);
            match HostingServer::start(site, &self.config_path, host, port, self.registry.clone())
                .await
            {
                Ok(server) => servers.push(server),
                Err(err) => {
                    for server in servers {
                        server.stop().await;
                    }
                    return Err(err);
                }
            }
        }

        let first = servers
            .first()
            .ok_or_else(|| SuiteError::Config("hosting requested with no sites".to_string()))?;
        let info = EmulatorInfo {
            kind: EmulatorKind::Hosting,
            host: config.server.host.clone(),
            port: first.port(),
        };
        Ok(RunningEmulator::Hosting { info, servers })
    }

    /// Stops every running emulator in reverse start order. Idempotent: the
    /// handles are drained under a lock, so a second call (sequential or
    /// concurrent) finds nothing left and waits at most for the first call
    /// to finish. Individual stop failures are logged and do not prevent
    /// stopping the rest; this never fails outward.
    pub async fn clean_shutdown(&self) {
        let mut running = self.running.lock().await;
        if running.is_empty() {
            return;
        }
        info!("Shutting down {} emulator(s)", running.len());
        while let Some((kind, emulator)) = running.pop() {
            self.registry.unregister(kind);
            emulator.stop().await;
        }
    }
}

fn require_process_config<'c>(
    kind: EmulatorKind,
    cfg: Option<&'c ProcessConfig>,
) -> Result<&'c ProcessConfig, SuiteError> {
    cfg.ok_or_else(|| SuiteError::Config(format!("emulator {kind} requested but not configured")))
}

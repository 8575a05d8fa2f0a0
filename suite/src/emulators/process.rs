//! Process-backed emulators.
//!
//! Functions, Firestore, Run, and GUI are externally provided binaries; the
//! suite only spawns them, waits for their advertised port to accept
//! connections, and stops them again. Downloading or managing those
//! binaries is an external concern.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::ProcessConfig;
use crate::emulators::{EmulatorInfo, EmulatorKind};
use crate::error::SuiteError;

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A spawned emulator process and its endpoint.
#[derive(Debug)]
pub struct ProcessEmulator {
    kind: EmulatorKind,
    info: EmulatorInfo,
    child: Child,
}

impl ProcessEmulator {
    /// Spawns the emulator and, unless configured otherwise, waits until its
    /// port accepts connections.
    ///
    /// # Errors
    ///
    /// Fails when the command cannot be spawned, the process exits before
    /// becoming ready, or readiness does not arrive within the configured
    /// timeout. The child is killed before a readiness error is returned.
    pub async fn start(
        kind: EmulatorKind,
        cfg: &ProcessConfig,
        extra_args: &[String],
    ) -> Result<Self, SuiteError> {
        let Some((program, args)) = cfg.command.split_first() else {
            return Err(SuiteError::Config(format!(
                "emulator {kind} has an empty command"
            )));
        };

        info!(%kind, port = cfg.port, "Starting emulator: {program}");

        let child = Command::new(program)
            .args(args)
            .args(extra_args)
            .env("HOST", &cfg.host)
            .env("PORT", cfg.port.to_string())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| SuiteError::EmulatorStart {
                kind,
                reason: format!("failed to spawn '{program}': {err}"),
            })?;

        let mut emulator = Self {
            kind,
            info: EmulatorInfo {
                kind,
                host: cfg.host.clone(),
                port: cfg.port,
            },
            child,
        };

        if cfg.wait_for_port {
            if let Err(err) = emulator.wait_until_ready(cfg).await {
                emulator.kill_silently().await;
                return Err(err);
            }
        }

        Ok(emulator)
    }

    pub fn info(&self) -> &EmulatorInfo {
        &self.info
    }

    async fn wait_until_ready(&mut self, cfg: &ProcessConfig) -> Result<(), SuiteError> {
        let deadline = Instant::now() + Duration::from_secs(cfg.startup_timeout_secs);
        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(SuiteError::EmulatorStart {
                    kind: self.kind,
                    reason: format!("process exited during startup ({status})"),
                });
            }
            if TcpStream::connect((self.info.host.as_str(), self.info.port))
                .await
                .is_ok()
            {
                debug!(kind = %self.kind, port = self.info.port, "Emulator is accepting connections");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SuiteError::EmulatorStart {
                    kind: self.kind,
                    reason: format!(
                        "did not accept connections on port {} within {}s",
                        self.info.port, cfg.startup_timeout_secs
                    ),
                });
            }
            sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    async fn kill_silently(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }

    /// Stops the emulator: graceful termination first (SIGTERM on unix),
    /// then waits for the process to exit. There is no deadline; shutdown
    /// waits for the emulator's own cleanup.
    pub async fn stop(mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            match i32::try_from(pid) {
                Ok(pid) => {
                    if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                        warn!(kind = %self.kind, "Failed to signal emulator, killing: {err}");
                        let _ = self.child.start_kill();
                    }
                }
                Err(_) => {
                    let _ = self.child.start_kill();
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }

        match self.child.wait().await {
            Ok(status) => info!(kind = %self.kind, "Emulator stopped ({status})"),
            Err(err) => warn!(kind = %self.kind, "Failed to wait for emulator exit: {err}"),
        }
    }
}

//! Error types for the emulator suite.
//!
//! Startup failures are fatal and carry a process exit code; request-level
//! failures never reach this type, they are answered inline by the hosting
//! server. Shutdown failures are logged and swallowed at the call site.

use std::io;

use thiserror::Error;

use crate::emulators::EmulatorKind;

/// A fatal suite error. Only fatal conditions unwind past the controller;
/// the retriable address-in-use case is consumed by the bind-retry loop and
/// shows up here only once its attempt budget is exhausted.
#[derive(Debug, Error)]
pub enum SuiteError {
    /// All bind attempts for a hosting site hit an occupied port.
    #[error("could not find an open port for the hosting development server (site {site})")]
    NoOpenPort { site: String },

    /// A bind failed for a reason other than the port being taken.
    #[error("failed to bind {addr} for the hosting development server: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// An emulator did not come up: spawn failure, early exit, or readiness
    /// timeout.
    #[error("the {kind} emulator failed to start: {reason}")]
    EmulatorStart { kind: EmulatorKind, reason: String },

    /// The configuration is unusable (bad rewrite pattern, unreadable
    /// fallback page, ...).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SuiteError {
    /// Exit code the process should terminate with when this error reaches
    /// `main`. All fatal startup errors map to 1, matching the exit contract
    /// of the CLI this suite belongs to.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoOpenPort { .. }
            | Self::Bind { .. }
            | Self::EmulatorStart { .. }
            | Self::Config(_) => 1,
        }
    }
}

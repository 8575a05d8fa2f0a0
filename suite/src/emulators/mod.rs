//! Emulator lifecycle: identifiers, the endpoint registry, process-backed
//! emulators, and the controller that orchestrates them.

mod controller;
pub mod process;
mod registry;
mod types;

pub use controller::{Controller, StartOptions};
pub use registry::Registry;
pub use types::{EmulatorInfo, EmulatorKind, START_ORDER};

//! Endpoint registry for running emulators.
//!
//! An explicit, clonable lookup table passed to every component that needs a
//! backend endpoint (hosting servers, the status table) instead of ambient
//! process-wide state. Only the controller mutates it, and only between
//! discrete startup/shutdown steps; each operation is a single map mutation
//! under the lock, so readers never observe a half-updated entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::emulators::{EmulatorInfo, EmulatorKind};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<EmulatorKind, EmulatorInfo>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the endpoint for `kind`, overwriting any existing entry.
    pub fn register(&self, info: EmulatorInfo) {
        let mut map = self.inner.write().expect("registry lock poisoned");
        map.insert(info.kind, info);
    }

    /// Removes the entry for `kind` if present; no-op otherwise.
    pub fn unregister(&self, kind: EmulatorKind) {
        let mut map = self.inner.write().expect("registry lock poisoned");
        map.remove(&kind);
    }

    /// Endpoint of `kind` if it is currently running. Never panics for a
    /// missing key.
    pub fn get_info(&self, kind: EmulatorKind) -> Option<EmulatorInfo> {
        let map = self.inner.read().expect("registry lock poisoned");
        map.get(&kind).cloned()
    }

    /// Whether any emulator is currently registered.
    pub fn is_empty(&self) -> bool {
        let map = self.inner.read().expect("registry lock poisoned");
        map.is_empty()
    }
}

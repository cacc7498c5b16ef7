//! Backend registry.
//!
//! The set of backend kinds is closed: [`BackendKind`] names every kind the
//! gateway can run, and a name outside it is rejected before any factory is
//! consulted. Factories are registered per kind; constructed instances are
//! kept by name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{Backend, BackendConfig};
use crate::error::{HalError, HalResult};

/// Every backend kind the gateway supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Ideal state-vector simulator (`simulator`, `qulacs`).
    Simulator,
    /// Pulse-level controller (`pulse`, `qubex`).
    Pulse,
    /// External program (`process`, `ybex`).
    Process,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Simulator, BackendKind::Pulse, BackendKind::Process];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Simulator => "simulator",
            BackendKind::Pulse => "pulse",
            BackendKind::Process => "process",
        }
    }

    /// Device type reported to clients.
    pub fn device_type(self) -> &'static str {
        match self {
            BackendKind::Simulator => "simulator",
            BackendKind::Pulse | BackendKind::Process => "QPU",
        }
    }
}

impl FromStr for BackendKind {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulator" | "qulacs" => Ok(BackendKind::Simulator),
            "pulse" | "qubex" => Ok(BackendKind::Pulse),
            "process" | "ybex" => Ok(BackendKind::Process),
            _ => Err(HalError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Factory<B> = Box<dyn Fn(BackendConfig) -> HalResult<B> + Send + Sync>;

/// Factories by kind and constructed backends by name.
pub struct BackendRegistry<B> {
    factories: FxHashMap<BackendKind, Factory<B>>,
    instances: FxHashMap<String, Arc<B>>,
}

impl<B: Backend> BackendRegistry<B> {
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
            instances: FxHashMap::default(),
        }
    }

    /// Register a constructed backend under `name`.
    pub fn register(&mut self, name: impl Into<String>, backend: B) -> Arc<B> {
        let name = name.into();
        debug!("Registering backend: {}", name);
        let backend = Arc::new(backend);
        self.instances.insert(name, backend.clone());
        backend
    }

    /// Register the constructor for a kind.
    pub fn register_factory(
        &mut self,
        kind: BackendKind,
        factory: impl Fn(BackendConfig) -> HalResult<B> + Send + Sync + 'static,
    ) {
        debug!("Registering factory for kind: {}", kind);
        self.factories.insert(kind, Box::new(factory));
    }

    /// Look up a registered backend.
    pub fn get(&self, name: &str) -> HalResult<Arc<B>> {
        self.instances
            .get(name)
            .cloned()
            .ok_or_else(|| HalError::BackendNotFound(name.to_string()))
    }

    /// Construct the backend `name` from its kind's factory and register it.
    pub fn load(&mut self, name: &str, config: BackendConfig) -> HalResult<Arc<B>> {
        let kind: BackendKind = name.parse()?;
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| HalError::BackendNotFound(name.to_string()))?;
        let backend = factory(config)?;
        Ok(self.register(name, backend))
    }

    /// Names of registered backends, sorted.
    pub fn available_backends(&self) -> Vec<String> {
        let mut names: Vec<_> = self.instances.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_backend(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }
}

impl<B: Backend> Default for BackendRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

//! Static backend description.
//!
//! Backends report their [`Capabilities`] once at construction; the router
//! and the lifecycle read them to decide whether calibration is needed, which
//! qubits may be used and how the device is described to clients.

use serde::{Deserialize, Serialize};

/// Gate names of the standard native set.
pub const STANDARD_GATES: &[&str] = &["rz", "sx", "x", "cx", "measure", "barrier", "delay"];

/// What a backend can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Backend name.
    pub name: String,
    /// Whether readout calibration must run before the first job.
    pub requires_calibration: bool,
    /// Whether this is a simulator rather than hardware.
    pub is_simulator: bool,
    /// Labels programs may address; `None` means every qubit in the topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_qubits: Option<Vec<String>>,
    /// Operation names the compiler accepts.
    pub gates: Vec<String>,
}

impl Capabilities {
    /// Capabilities of an ideal simulator with the standard gate set.
    pub fn simulator(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_calibration: false,
            is_simulator: true,
            exposed_qubits: None,
            gates: STANDARD_GATES.iter().map(|g| (*g).to_string()).collect(),
        }
    }

    /// Capabilities of calibrated hardware with the standard gate set.
    pub fn hardware(name: impl Into<String>) -> Self {
        Self {
            requires_calibration: true,
            is_simulator: false,
            ..Self::simulator(name)
        }
    }

    /// Replace the gate set.
    pub fn with_gates<I, S>(mut self, gates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gates = gates.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the usable qubits.
    pub fn with_exposed_qubits(mut self, labels: Vec<String>) -> Self {
        self.exposed_qubits = Some(labels);
        self
    }

    pub fn with_calibration(mut self, required: bool) -> Self {
        self.requires_calibration = required;
        self
    }

    /// Whether `label` may be addressed.
    pub fn exposes(&self, label: &str) -> bool {
        self.exposed_qubits
            .as_ref()
            .is_none_or(|labels| labels.iter().any(|l| l == label))
    }

    pub fn supports_gate(&self, name: &str) -> bool {
        self.gates.iter().any(|g| g == name)
    }

    /// Device type reported to clients.
    pub fn device_type(&self) -> &'static str {
        if self.is_simulator { "simulator" } else { "QPU" }
    }
}

//! Device topology model.
//!
//! The topology file describes the qubits a device exposes, the directed
//! couplings between them and the latest calibration data. It is the single
//! source of truth for label resolution, connectivity checks and readout
//! mitigation, and is rewritten after every calibration run.
//!
//! ```json
//! {
//!   "name": "anemone",
//!   "qubits": [
//!     { "id": 0, "physical_id": 5,
//!       "meas_error": { "prob_meas1_prep0": 0.01, "prob_meas0_prep1": 0.02 } }
//!   ],
//!   "couplings": [ { "control": 0, "target": 1 } ],
//!   "calibrated_at": "2025-04-20T10:03:16.755183Z"
//! }
//! ```
//!
//! Fields this crate does not model are kept in `extra` and written back
//! unchanged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{HalError, HalResult};

/// Readout assignment errors of one qubit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasError {
    /// P(measure 1 | prepared 0).
    #[serde(default)]
    pub prob_meas1_prep0: f64,
    /// P(measure 0 | prepared 1).
    #[serde(default)]
    pub prob_meas0_prep1: f64,
    /// Mean of the two rates.
    #[serde(default)]
    pub readout_assignment_error: f64,
}

impl MeasError {
    /// Build from the two rates, deriving the mean.
    pub fn new(prob_meas1_prep0: f64, prob_meas0_prep1: f64) -> Self {
        Self {
            prob_meas1_prep0,
            prob_meas0_prep1,
            readout_assignment_error: (prob_meas1_prep0 + prob_meas0_prep1) / 2.0,
        }
    }

    /// The 2×2 assignment matrix `[[1-p10, p01], [p10, 1-p01]]`, row-major.
    ///
    /// Column `j` is the distribution of outcomes given preparation `j`.
    pub fn assignment_matrix(&self) -> [[f64; 2]; 2] {
        let p10 = self.prob_meas1_prep0;
        let p01 = self.prob_meas0_prep1;
        [[1.0 - p10, p01], [p10, 1.0 - p01]]
    }
}

/// T1/T2 lifetimes in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QubitLifetime {
    #[serde(default)]
    pub t1: f64,
    #[serde(default)]
    pub t2: f64,
}

/// Layout position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// One qubit of the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QubitRecord {
    /// Dense index `0..N`, the virtual qubit number programs use.
    pub id: u32,
    /// Hardware identifier, rendered as the label `Q{physical_id:02}`.
    pub physical_id: u32,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub fidelity: f64,
    #[serde(default)]
    pub meas_error: MeasError,
    #[serde(default)]
    pub qubit_lifetime: QubitLifetime,
    /// Gate durations in nanoseconds, by gate name.
    #[serde(default)]
    pub gate_duration: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QubitRecord {
    /// A record with only the identifiers set.
    pub fn new(id: u32, physical_id: u32) -> Self {
        Self {
            id,
            physical_id,
            position: Position::default(),
            fidelity: 0.0,
            meas_error: MeasError::default(),
            qubit_lifetime: QubitLifetime::default(),
            gate_duration: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

/// A directed coupling, `control` drives `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingRecord {
    pub control: u32,
    pub target: u32,
    #[serde(default)]
    pub fidelity: f64,
    #[serde(default)]
    pub gate_duration: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CouplingRecord {
    /// A coupling with only the endpoints set.
    pub fn new(control: u32, target: u32) -> Self {
        Self {
            control,
            target,
            fidelity: 0.0,
            gate_duration: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

/// The full device description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTopology {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_id: String,
    pub qubits: Vec<QubitRecord>,
    #[serde(default)]
    pub couplings: Vec<CouplingRecord>,
    /// RFC 3339 timestamp of the last calibration.
    #[serde(default)]
    pub calibrated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceTopology {
    /// Build a topology from its parts and validate it.
    pub fn new(
        name: impl Into<String>,
        qubits: Vec<QubitRecord>,
        couplings: Vec<CouplingRecord>,
    ) -> HalResult<Self> {
        let name = name.into();
        let topology = Self {
            device_id: name.clone(),
            name,
            qubits,
            couplings,
            calibrated_at: None,
            extra: Map::new(),
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Parse and validate a topology document.
    pub fn from_json(json: &str) -> HalResult<Self> {
        let mut topology: Self = serde_json::from_str(json)
            .map_err(|e| HalError::Mapping(format!("malformed topology: {e}")))?;
        topology.validate()?;
        topology.qubits.sort_by_key(|q| q.id);
        Ok(topology)
    }

    /// Read, parse and validate the topology at `path`.
    pub fn load(path: impl AsRef<Path>) -> HalResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            HalError::Mapping(format!("cannot read topology {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> HalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the file at `path` with this topology.
    ///
    /// The document is written to `<path>.tmp` first and renamed over the
    /// target, so a reader never sees a partially written file.
    pub fn save_atomic(&self, path: impl AsRef<Path>) -> HalResult<()> {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "topology persisted");
        Ok(())
    }

    /// Check identifiers and coupling endpoints.
    pub fn validate(&self) -> HalResult<()> {
        let n = self.qubits.len();
        let mut ids = FxHashSet::default();
        let mut physical = FxHashSet::default();

        for q in &self.qubits {
            if q.id as usize >= n {
                return Err(HalError::Mapping(format!(
                    "qubit id {} outside 0..{n}",
                    q.id
                )));
            }
            if !ids.insert(q.id) {
                return Err(HalError::Mapping(format!("duplicate qubit id {}", q.id)));
            }
            if !physical.insert(q.physical_id) {
                return Err(HalError::Mapping(format!(
                    "duplicate physical_id {}",
                    q.physical_id
                )));
            }
        }

        for c in &self.couplings {
            if !ids.contains(&c.control) || !ids.contains(&c.target) {
                return Err(HalError::Mapping(format!(
                    "coupling {}-{} references an unknown qubit",
                    c.control, c.target
                )));
            }
            if c.control == c.target {
                return Err(HalError::Mapping(format!(
                    "coupling {}-{} is a self loop",
                    c.control, c.target
                )));
            }
        }
        Ok(())
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// The record for qubit `id`.
    pub fn qubit(&self, id: u32) -> Option<&QubitRecord> {
        self.qubits.iter().find(|q| q.id == id)
    }

    /// Mutable record for qubit `id`.
    pub fn qubit_mut(&mut self, id: u32) -> Option<&mut QubitRecord> {
        self.qubits.iter_mut().find(|q| q.id == id)
    }

    /// Stamp the current time as the calibration time.
    pub fn mark_calibrated(&mut self) {
        self.calibrated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

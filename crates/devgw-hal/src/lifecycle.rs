//! One-time readout calibration and the shared topology snapshot.
//!
//! ```text
//!   Uninitialized ──(first request, device ACTIVE)──→ Calibrating ──→ Ready
//!         ↑                                               │
//!         └───────────────────(calibration error)─────────┘
//! ```
//!
//! Backends that do not require calibration go straight to `Ready`. While
//! the device is not `ACTIVE` the state stays `Uninitialized` and requests
//! proceed uncalibrated.
//!
//! The transition is serialized by an async mutex. The calibration run is a
//! spawned task that owns the lock guard, so it finishes (and releases the
//! lock) even if the request that started it is dropped. Concurrent requests
//! wait on the lock and then observe `Ready`.
//!
//! Readers get an `Arc` snapshot of the topology. A calibration run edits a
//! private copy, persists it with an atomic rename and only then swaps the
//! snapshot in.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::backend::{Backend, ReadoutCalibration};
use crate::error::{HalError, HalResult};
use crate::mapping::QubitMapping;
use crate::status::DeviceStatus;
use crate::topology::{DeviceTopology, MeasError};

/// Calibration state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationState {
    Uninitialized,
    Calibrating,
    Ready,
}

#[derive(Debug)]
struct Inner {
    topology: RwLock<Arc<DeviceTopology>>,
    mapping: Arc<QubitMapping>,
    path: Option<PathBuf>,
    state: Arc<Mutex<CalibrationState>>,
}

/// Device state shared by all requests.
#[derive(Debug, Clone)]
pub struct DeviceLifecycle {
    inner: Arc<Inner>,
}

impl DeviceLifecycle {
    /// Wrap a topology; calibration results are persisted to `path` if set.
    pub fn new(topology: DeviceTopology, path: Option<PathBuf>) -> HalResult<Self> {
        let mapping = QubitMapping::from_topology(&topology)?;
        Ok(Self {
            inner: Arc::new(Inner {
                topology: RwLock::new(Arc::new(topology)),
                mapping: Arc::new(mapping),
                path,
                state: Arc::new(Mutex::new(CalibrationState::Uninitialized)),
            }),
        })
    }

    /// Load the topology at `path` and persist calibrations back to it.
    pub fn load(path: impl AsRef<Path>) -> HalResult<Self> {
        let path = path.as_ref();
        let topology = DeviceTopology::load(path)?;
        Self::new(topology, Some(path.to_path_buf()))
    }

    /// Current topology snapshot.
    pub fn topology(&self) -> Arc<DeviceTopology> {
        self.inner
            .topology
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn mapping(&self) -> Arc<QubitMapping> {
        self.inner.mapping.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Current state; waits while a calibration run holds the lock.
    pub async fn state(&self) -> CalibrationState {
        *self.inner.state.lock().await
    }

    /// Make sure calibration has run, if `backend` needs it and the device
    /// is active. Returns the resulting state.
    #[instrument(skip_all, fields(backend = backend.name(), %status))]
    pub async fn ensure_ready<B>(
        &self,
        backend: Arc<B>,
        status: DeviceStatus,
    ) -> HalResult<CalibrationState>
    where
        B: Backend + 'static,
    {
        let mut guard = self.inner.state.clone().lock_owned().await;

        if *guard == CalibrationState::Ready {
            return Ok(CalibrationState::Ready);
        }
        if !backend.capabilities().requires_calibration {
            *guard = CalibrationState::Ready;
            return Ok(CalibrationState::Ready);
        }
        if status != DeviceStatus::Active {
            debug!("device not active, calibration skipped");
            return Ok(*guard);
        }

        *guard = CalibrationState::Calibrating;
        let this = self.clone();
        let task = tokio::spawn(async move {
            let mut guard = guard;
            match this.calibrate(backend.as_ref()).await {
                Ok(()) => {
                    *guard = CalibrationState::Ready;
                    Ok(CalibrationState::Ready)
                }
                Err(e) => {
                    *guard = CalibrationState::Uninitialized;
                    Err(e)
                }
            }
        });

        task.await
            .map_err(|e| HalError::Execution(format!("calibration task failed: {e}")))?
    }

    async fn calibrate<B: Backend>(&self, backend: &B) -> HalResult<()> {
        let mapping = self.mapping();
        let targets = backend
            .capabilities()
            .exposed_qubits
            .clone()
            .unwrap_or_else(|| mapping.labels().to_vec());
        info!(qubits = targets.len(), "starting readout calibration");

        let mut topology = DeviceTopology::clone(&self.topology());
        for label in &targets {
            let Ok(id) = mapping.physical_index(label) else {
                warn!(qubit = %label, "exposed qubit is not in the topology, skipping calibration");
                continue;
            };
            let rates = match backend.calibrate_qubit(label).await {
                Ok(rates) => rates,
                Err(e) => {
                    warn!(qubit = %label, error = %e, "readout calibration failed, using zero error rates");
                    ReadoutCalibration::default()
                }
            };
            if let Some(record) = topology.qubit_mut(id.0) {
                record.meas_error = MeasError::new(rates.prob_meas1_prep0, rates.prob_meas0_prep1);
            }
        }
        topology.mark_calibrated();

        if let Some(path) = self.inner.path.clone() {
            let snapshot = topology.clone();
            tokio::task::spawn_blocking(move || snapshot.save_atomic(&path))
                .await
                .map_err(|e| HalError::Execution(format!("topology write task failed: {e}")))??;
        }

        *self
            .inner
            .topology
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(topology);
        info!("readout calibration complete");
        Ok(())
    }
}

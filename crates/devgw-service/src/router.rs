//! The execution router.
//!
//! One request runs:
//!
//! ```text
//! status check -> one-time calibration -> parse -> compile -> execute
//!              -> remap -> mitigation -> drop zero counts
//! ```
//!
//! Every failure becomes a `FAILURE` response. An inactive device is
//! reported as such; anything else is reported as an internal error, with
//! the cause only in the log.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use devgw_hal::mitigation::{self, MitigationStrategy};
use devgw_hal::{
    Backend, ClassicalBitMap, Counts, DeviceLifecycle, DeviceStatus, HalError, JobId, JobResult, remap,
};

use crate::backend::{GatewayBackend, gateway_registry};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

/// Failure message for an inactive device.
pub const INACTIVE_MESSAGE: &str = "device is inactive";
/// Failure message for every other error.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Where the device status comes from.
#[derive(Debug, Clone)]
pub enum StatusSource {
    /// A plain-text file, read on every request.
    File(PathBuf),
    /// A fixed status.
    Fixed(DeviceStatus),
}

/// Request limits and reported metadata.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub max_shots: u32,
    pub job_timeout: Option<Duration>,
    pub mitigation: MitigationStrategy,
    pub device_id: Option<String>,
    pub provider: String,
    pub max_qubits: Option<usize>,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            max_shots: 100_000,
            job_timeout: None,
            mitigation: MitigationStrategy::None,
            device_id: None,
            provider: "devgw".to_string(),
            max_qubits: None,
        }
    }
}

impl RouterSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_shots: config.server.max_shots,
            job_timeout: config.job_timeout(),
            mitigation: config.mitigation,
            device_id: config.device.device_id.clone(),
            provider: config.device.provider.clone(),
            max_qubits: config.device.max_qubits,
        }
    }
}

/// Static description of the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub provider: String,
    /// `"simulator"` or `"QPU"`.
    #[serde(rename = "type")]
    pub device_type: String,
    pub max_qubits: usize,
    pub max_shots: u32,
    /// The device topology as JSON.
    pub device_info: String,
    pub calibrated_at: Option<String>,
}

/// Routes requests to one backend over one device.
pub struct ExecutionRouter<B> {
    backend: Arc<B>,
    lifecycle: DeviceLifecycle,
    status: StatusSource,
    settings: RouterSettings,
}

impl<B> ExecutionRouter<B>
where
    B: Backend + 'static,
    B::Program: 'static,
{
    pub fn new(backend: Arc<B>, lifecycle: DeviceLifecycle, status: StatusSource) -> Self {
        Self {
            backend,
            lifecycle,
            status,
            settings: RouterSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RouterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn lifecycle(&self) -> &DeviceLifecycle {
        &self.lifecycle
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Run `program` for `shots` shots.
    ///
    /// Never fails: errors are folded into a `FAILURE` result.
    #[instrument(skip(self, job_id, program), fields(job_id = %job_id, backend = self.backend.name()))]
    pub async fn call_job(&self, job_id: JobId, program: &str, shots: u32) -> JobResult {
        let started = Instant::now();
        let run = self.run_job(program, shots);
        let outcome = match self.settings.job_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .unwrap_or(Err(ServiceError::Timeout(limit))),
            None => run.await,
        };

        match outcome {
            Ok(counts) => {
                info!(
                    outcomes = counts.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "job succeeded"
                );
                JobResult::success(job_id, counts)
            }
            Err(ServiceError::DeviceInactive) => {
                warn!("job rejected, device is inactive");
                JobResult::failure(job_id, INACTIVE_MESSAGE)
            }
            Err(e) => {
                error!(error = %e, "job failed");
                JobResult::failure(job_id, INTERNAL_ERROR_MESSAGE)
            }
        }
    }

    async fn run_job(&self, program: &str, shots: u32) -> ServiceResult<Counts> {
        let status = self.get_service_status().await;
        if status == DeviceStatus::Inactive {
            return Err(ServiceError::DeviceInactive);
        }
        self.check_shots(shots)?;

        self.lifecycle.ensure_ready(self.backend.clone(), status).await?;

        let circuit = devgw_qasm3::parse(program)?;
        let backend = self.backend.clone();
        let mapping = self.lifecycle.mapping();
        let compiled = tokio::task::spawn_blocking(move || backend.compile(&circuit, &mapping)).await??;

        let raw = self.backend.execute(&compiled, shots).await?;
        let counts = remap(&raw, &compiled.clbits)?;
        let counts = self.mitigate(counts, &compiled.clbits, shots)?;
        Ok(counts.without_zeros())
    }

    fn check_shots(&self, shots: u32) -> ServiceResult<()> {
        if shots == 0 || shots > self.settings.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} is outside 1..={}",
                self.settings.max_shots
            ))
            .into());
        }
        Ok(())
    }

    fn mitigate(&self, counts: Counts, clbits: &ClassicalBitMap, shots: u32) -> ServiceResult<Counts> {
        let num_bits = clbits.num_clbits();
        if num_bits == 0 || self.settings.mitigation == MitigationStrategy::None {
            return Ok(counts);
        }
        mitigation::check_width(num_bits)?;

        let mitigated = match self.settings.mitigation {
            MitigationStrategy::None => counts,
            MitigationStrategy::LinearInversion => {
                let inverse = self.backend.inverse_confusion_matrix(&clbits.labels_by_bit())?;
                mitigation::linear_inversion(&counts, num_bits, shots, &inverse)?
            }
            MitigationStrategy::NearestDistribution => {
                let topology = self.lifecycle.topology();
                let matrices = mitigation::assignment_matrices(clbits, &topology)?;
                mitigation::nearest_distribution(&counts, &matrices, shots)?
            }
        };
        Ok(mitigated)
    }

    /// Current device status; `INACTIVE` when it cannot be read.
    pub async fn get_service_status(&self) -> DeviceStatus {
        match &self.status {
            StatusSource::Fixed(status) => *status,
            StatusSource::File(path) => match DeviceStatus::read(path).await {
                Ok(status) => status,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "cannot read device status");
                    DeviceStatus::Inactive
                }
            },
        }
    }

    /// Device metadata and the current topology snapshot.
    pub fn get_device_info(&self) -> ServiceResult<DeviceInfo> {
        let topology = self.lifecycle.topology();
        let capabilities = self.backend.capabilities();
        let usable = capabilities
            .exposed_qubits
            .as_ref()
            .map_or(topology.num_qubits(), Vec::len);

        Ok(DeviceInfo {
            device_id: self
                .settings
                .device_id
                .clone()
                .unwrap_or_else(|| topology.device_id.clone()),
            provider: self.settings.provider.clone(),
            device_type: capabilities.device_type().to_string(),
            max_qubits: self.settings.max_qubits.unwrap_or(usable),
            max_shots: self.settings.max_shots,
            device_info: topology.to_json()?,
            calibrated_at: topology.calibrated_at.clone(),
        })
    }
}

impl ExecutionRouter<GatewayBackend> {
    /// Load the topology, construct the configured backend and wire them up.
    pub fn from_config(config: &ServiceConfig) -> ServiceResult<Self> {
        let lifecycle = DeviceLifecycle::load(&config.device.topology_path)?;
        let backend = gateway_registry().load(&config.plugin.name, config.backend_config())?;
        info!(
            backend = backend.name(),
            kind = %backend.kind(),
            qubits = lifecycle.mapping().num_qubits(),
            mitigation = %config.mitigation,
            "execution router ready"
        );
        Ok(Self::new(
            backend,
            lifecycle,
            StatusSource::File(config.device.status_path.clone()),
        )
        .with_settings(RouterSettings::from_config(config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgw_adapter_sim::SimulatorBackend;
    use devgw_hal::{DeviceTopology, JobStatus, QubitRecord};

    const PROGRAM: &str = "OPENQASM 3;\ninclude \"stdgates.inc\";\nbit[2] c;\nx $0;\nc[1] = measure $0;\n";

    fn router(status: DeviceStatus) -> ExecutionRouter<SimulatorBackend> {
        let qubits = vec![QubitRecord::new(0, 5), QubitRecord::new(1, 6)];
        let topology = DeviceTopology::new("anemone", qubits, vec![]).unwrap();
        let lifecycle = DeviceLifecycle::new(topology, None).unwrap();
        ExecutionRouter::new(
            Arc::new(SimulatorBackend::new().with_seed(3)),
            lifecycle,
            StatusSource::Fixed(status),
        )
    }

    #[tokio::test]
    async fn test_call_job_success() {
        let result = router(DeviceStatus::Active).call_job("j1".into(), PROGRAM, 100).await;
        assert_eq!(result.status, JobStatus::Success);
        assert_eq!(result.message, "job is succeeded");
        assert_eq!(result.counts.get("10"), 100);
        assert_eq!(result.counts.len(), 1);
    }

    #[tokio::test]
    async fn test_maintenance_still_runs() {
        let result = router(DeviceStatus::Maintenance).call_job("j".into(), PROGRAM, 10).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_inactive_device() {
        let result = router(DeviceStatus::Inactive).call_job("j2".into(), PROGRAM, 100).await;
        assert_eq!(result.status, JobStatus::Failure);
        assert_eq!(result.message, INACTIVE_MESSAGE);
        assert!(result.counts.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_internal() {
        let r = router(DeviceStatus::Active);
        let bad_syntax = r.call_job("a".into(), "OPENQASM 3;\nnot a program", 10).await;
        assert_eq!(bad_syntax.message, INTERNAL_ERROR_MESSAGE);

        let bad_qubit = r.call_job("b".into(), "OPENQASM 3;\nx $7;", 10).await;
        assert_eq!(bad_qubit.message, INTERNAL_ERROR_MESSAGE);
        assert_eq!(bad_qubit.job_id, JobId::new("b"));
    }

    #[tokio::test]
    async fn test_shot_bounds() {
        let r = router(DeviceStatus::Active).with_settings(RouterSettings {
            max_shots: 50,
            ..RouterSettings::default()
        });
        assert!(!r.call_job("a".into(), PROGRAM, 0).await.is_success());
        assert!(!r.call_job("b".into(), PROGRAM, 51).await.is_success());
        assert!(r.call_job("c".into(), PROGRAM, 50).await.is_success());
    }

    #[tokio::test]
    async fn test_status_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status");
        let mut r = router(DeviceStatus::Active);
        r.status = StatusSource::File(path.clone());

        assert_eq!(r.get_service_status().await, DeviceStatus::Inactive);
        std::fs::write(&path, "maintenance\n").unwrap();
        assert_eq!(r.get_service_status().await, DeviceStatus::Maintenance);
        std::fs::write(&path, "rebooting").unwrap();
        assert_eq!(r.get_service_status().await, DeviceStatus::Inactive);
    }

    #[test]
    fn test_device_info() {
        let r = router(DeviceStatus::Active).with_settings(RouterSettings {
            device_id: Some("anemone-1".into()),
            ..RouterSettings::default()
        });
        let info = r.get_device_info().unwrap();
        assert_eq!(info.device_id, "anemone-1");
        assert_eq!(info.device_type, "simulator");
        assert_eq!(info.max_qubits, 2);
        assert_eq!(info.max_shots, 100_000);
        assert!(info.calibrated_at.is_none());

        let topology = DeviceTopology::from_json(&info.device_info).unwrap();
        assert_eq!(topology.num_qubits(), 2);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "simulator");
    }

    #[tokio::test]
    async fn test_mitigation_skipped_without_clbits() {
        let r = router(DeviceStatus::Active).with_settings(RouterSettings {
            mitigation: MitigationStrategy::LinearInversion,
            ..RouterSettings::default()
        });
        // The simulator has no confusion matrix, but nothing is measured.
        let result = r
            .call_job("a".into(), "OPENQASM 3;\ninclude \"stdgates.inc\";\nx $0;", 10)
            .await;
        assert!(result.is_success());
        assert_eq!(result.counts.total(), 10);

        let measured = r.call_job("b".into(), PROGRAM, 10).await;
        assert_eq!(measured.message, INTERNAL_ERROR_MESSAGE);
    }
}

//! Calibration lifecycle under concurrent and cancelled requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use devgw_hal::{
    Backend, CalibrationState, Capabilities, ClassicalBitMap, CompiledCircuit, CouplingRecord,
    Counts, DeviceLifecycle, DeviceStatus, DeviceTopology, HalError, HalResult, QubitMapping,
    QubitRecord, ReadoutCalibration,
};
use devgw_ir::Circuit;

/// Backend whose calibration takes a while and fails for one qubit.
struct SlowCalibrator {
    caps: Capabilities,
    calls: AtomicUsize,
    failing: Option<&'static str>,
}

impl SlowCalibrator {
    fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            calls: AtomicUsize::new(0),
            failing: None,
        }
    }
}

#[async_trait]
impl Backend for SlowCalibrator {
    type Program = ();

    fn name(&self) -> &str {
        "slow"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn compile(&self, _: &Circuit, _: &QubitMapping) -> HalResult<CompiledCircuit<()>> {
        Ok(CompiledCircuit::new((), ClassicalBitMap::new(0), 0))
    }

    async fn calibrate_qubit(&self, label: &str) -> HalResult<ReadoutCalibration> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.failing == Some(label) {
            return Err(HalError::Execution(format!("{label} did not respond")));
        }
        Ok(ReadoutCalibration {
            prob_meas1_prep0: 0.02,
            prob_meas0_prep1: 0.04,
        })
    }

    async fn execute(&self, _: &CompiledCircuit<()>, _: u32) -> HalResult<Counts> {
        Ok(Counts::new())
    }
}

fn topology() -> DeviceTopology {
    let mut qubits = vec![QubitRecord::new(0, 5), QubitRecord::new(1, 6), QubitRecord::new(2, 7)];
    qubits[1].meas_error.prob_meas1_prep0 = 0.5;
    DeviceTopology::new("bench", qubits, vec![CouplingRecord::new(0, 1)]).unwrap()
}

fn lifecycle_on_disk() -> (tempfile::TempDir, DeviceLifecycle) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device_topology.json");
    topology().save_atomic(&path).unwrap();
    let lifecycle = DeviceLifecycle::load(&path).unwrap();
    (dir, lifecycle)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_calibrate_once() {
    let (_dir, lifecycle) = lifecycle_on_disk();
    let backend = Arc::new(SlowCalibrator::new(Capabilities::hardware("slow")));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let lifecycle = lifecycle.clone();
            let backend = backend.clone();
            tokio::spawn(async move { lifecycle.ensure_ready(backend, DeviceStatus::Active).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), CalibrationState::Ready);
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    assert_eq!(lifecycle.state().await, CalibrationState::Ready);
}

#[tokio::test]
async fn test_calibration_updates_and_persists_topology() {
    let (_dir, lifecycle) = lifecycle_on_disk();
    let before = lifecycle.topology();
    assert!(before.calibrated_at.is_none());

    let mut backend = SlowCalibrator::new(Capabilities::hardware("slow"));
    backend.failing = Some("Q06");
    lifecycle
        .ensure_ready(Arc::new(backend), DeviceStatus::Active)
        .await
        .unwrap();

    let after = lifecycle.topology();
    let q0 = after.qubit(0).unwrap().meas_error;
    assert_eq!(q0.prob_meas1_prep0, 0.02);
    assert!((q0.readout_assignment_error - 0.03).abs() < 1e-12);

    // The failing qubit is reset rather than left stale.
    let q1 = after.qubit(1).unwrap().meas_error;
    assert_eq!(q1.prob_meas1_prep0, 0.0);
    assert_eq!(q1.prob_meas0_prep1, 0.0);

    assert!(after.calibrated_at.is_some());
    // Earlier snapshots are untouched.
    assert!(before.calibrated_at.is_none());

    let on_disk = DeviceTopology::load(lifecycle.path().unwrap()).unwrap();
    assert_eq!(on_disk, *after);
}

#[tokio::test]
async fn test_exposed_qubits_limit_calibration() {
    let (_dir, lifecycle) = lifecycle_on_disk();
    let caps = Capabilities::hardware("slow").with_exposed_qubits(vec!["Q07".into()]);
    let backend = Arc::new(SlowCalibrator::new(caps));

    lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Active)
        .await
        .unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(lifecycle.topology().qubit(2).unwrap().meas_error.prob_meas0_prep1, 0.04);
}

#[tokio::test]
async fn test_maintenance_skips_calibration() {
    let (_dir, lifecycle) = lifecycle_on_disk();
    let backend = Arc::new(SlowCalibrator::new(Capabilities::hardware("slow")));

    let state = lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Maintenance)
        .await
        .unwrap();
    assert_eq!(state, CalibrationState::Uninitialized);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

    // Once the device is active again, the first request calibrates.
    let state = lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Active)
        .await
        .unwrap();
    assert_eq!(state, CalibrationState::Ready);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_simulator_never_calibrates() {
    let lifecycle = DeviceLifecycle::new(topology(), None).unwrap();
    let backend = Arc::new(SlowCalibrator::new(Capabilities::simulator("sim")));

    let state = lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Maintenance)
        .await
        .unwrap();
    assert_eq!(state, CalibrationState::Ready);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert!(lifecycle.topology().calibrated_at.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_request_still_completes_calibration() {
    let (_dir, lifecycle) = lifecycle_on_disk();
    let backend = Arc::new(SlowCalibrator::new(Capabilities::hardware("slow")));

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        lifecycle.ensure_ready(backend.clone(), DeviceStatus::Active),
    )
    .await;
    assert!(abandoned.is_err());

    // The next request waits for the running calibration instead of
    // starting a second one.
    let state = lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Active)
        .await
        .unwrap();
    assert_eq!(state, CalibrationState::Ready);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unknown_exposed_label_is_skipped() {
    let lifecycle = DeviceLifecycle::new(topology(), None).unwrap();
    let caps = Capabilities::hardware("slow").with_exposed_qubits(vec!["Q42".into(), "Q06".into()]);
    let backend = Arc::new(SlowCalibrator::new(caps));

    let state = lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Active)
        .await
        .unwrap();
    assert_eq!(state, CalibrationState::Ready);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let after = lifecycle.topology();
    assert_eq!(after.qubit(1).unwrap().meas_error.prob_meas1_prep0, 0.02);
    assert!(after.calibrated_at.is_some());

    // Ready is terminal: later requests do not retry.
    lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Active)
        .await
        .unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

//! Calibration, execution and mitigation through the emulated controller.

use std::sync::Arc;

use devgw_adapter_pulse::{EmulatorConfig, EmulatorEngine, PulseBackend};
use devgw_hal::mitigation::linear_inversion;
use devgw_hal::{
    Backend, CalibrationState, CouplingRecord, DeviceLifecycle, DeviceStatus, DeviceTopology,
    HalError, QubitRecord, ReadoutCalibration, remap,
};
use devgw_qasm3::parse;

fn topology() -> DeviceTopology {
    DeviceTopology::new(
        "emulated",
        vec![QubitRecord::new(0, 5), QubitRecord::new(1, 6), QubitRecord::new(2, 7)],
        vec![CouplingRecord::new(0, 1), CouplingRecord::new(1, 2)],
    )
    .unwrap()
}

fn backend(readout: &[(&str, f64, f64)]) -> Arc<PulseBackend> {
    let mut config = EmulatorConfig {
        seed: Some(21),
        ..EmulatorConfig::default()
    };
    for (label, p10, p01) in readout {
        config.readout.insert(
            label.to_string(),
            ReadoutCalibration {
                prob_meas1_prep0: *p10,
                prob_meas0_prep1: *p01,
            },
        );
    }
    Arc::new(PulseBackend::new(EmulatorEngine::new(config)))
}

fn program(body: &str) -> devgw_ir::Circuit {
    parse(&format!("OPENQASM 3;\ninclude \"stdgates.inc\";\n{body}")).unwrap()
}

#[tokio::test]
async fn test_calibration_writes_estimates_to_topology() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device_topology.json");
    topology().save_atomic(&path).unwrap();
    let lifecycle = DeviceLifecycle::load(&path).unwrap();

    let backend = backend(&[("Q05", 0.1, 0.2)]);
    let state = lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Active)
        .await
        .unwrap();
    assert_eq!(state, CalibrationState::Ready);

    let on_disk = DeviceTopology::load(&path).unwrap();
    let q5 = on_disk.qubit(0).unwrap().meas_error;
    assert!((q5.prob_meas1_prep0 - 0.1).abs() < 0.02);
    assert!((q5.prob_meas0_prep1 - 0.2).abs() < 0.02);
    assert_eq!(on_disk.qubit(1).unwrap().meas_error.prob_meas1_prep0, 0.0);
    assert!(on_disk.calibrated_at.is_some());
}

#[tokio::test]
async fn test_bell_pair_through_schedule() {
    let mapping = devgw_hal::QubitMapping::from_topology(&topology()).unwrap();
    let backend = backend(&[]);
    let circuit = program(
        "bit[2] c;\nrz(pi/2) $0;\nsx $0;\nrz(pi/2) $0;\ncx $0, $1;\nc[0] = measure $0;\nc[1] = measure $1;\n",
    );

    let compiled = backend.compile(&circuit, &mapping).unwrap();
    let raw = backend.execute(&compiled, 1000).await.unwrap();
    let counts = remap(&raw, &compiled.clbits).unwrap();

    assert_eq!(counts.get("00") + counts.get("11"), 1000);
    assert!(counts.get("00") > 0 && counts.get("11") > 0);
}

#[test]
fn test_compilation_is_idempotent() {
    let mapping = devgw_hal::QubitMapping::from_topology(&topology()).unwrap();
    let backend = backend(&[]);
    let programs = [
        "bit[2] c;\nrz(pi/2) $0;\nsx $0;\ncx $0, $1;\nrz(0.3) $1;\nc[1] = measure $1;\nc[0] = measure $0;\n",
        "bit[3] c;\ncx $1, $2;\nbarrier;\ndelay[100ns] $2;\nx $2;\nc[2] = measure $2;\n",
        "bit[1] c;\nc[0] = measure $1;\n",
    ];

    for src in programs {
        let circuit = program(src);
        let first = backend.compile(&circuit, &mapping).unwrap();
        let second = backend.compile(&circuit, &mapping).unwrap();
        assert_eq!(first, second, "{src}");
    }
}

#[tokio::test]
async fn test_reversed_cx_is_invalid_coupling() {
    let mapping = devgw_hal::QubitMapping::from_topology(&topology()).unwrap();
    let err = backend(&[])
        .compile(&program("bit[1] c;\ncx $2, $1;\nc[0] = measure $1;\n"), &mapping)
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidCoupling { .. }));
}

#[tokio::test]
async fn test_linear_mitigation_recovers_prepared_state() {
    let lifecycle = DeviceLifecycle::new(topology(), None).unwrap();
    let backend = backend(&[("Q05", 0.0, 0.2)]);
    lifecycle
        .ensure_ready(backend.clone(), DeviceStatus::Active)
        .await
        .unwrap();

    let circuit = program("bit[1] c;\nx $0;\nc[0] = measure $0;\n");
    let compiled = backend.compile(&circuit, &lifecycle.mapping()).unwrap();
    let shots = 10_000;
    let raw = remap(&backend.execute(&compiled, shots).await.unwrap(), &compiled.clbits).unwrap();
    assert!(raw.get("1") < 8_500);

    let labels = compiled.clbits.labels_by_bit();
    let inverse = backend.inverse_confusion_matrix(&labels).unwrap();
    let mitigated = linear_inversion(&raw, labels.len(), shots, &inverse).unwrap();
    assert!(mitigated.get("1") > 9_500);
}

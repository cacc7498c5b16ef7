//! End-to-end tests: configuration on disk, router, HTTP surface.

use std::path::Path;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use devgw_hal::{
    CalibrationState, CouplingRecord, DeviceTopology, JobStatus, MitigationStrategy, QubitRecord,
};
use devgw_service::{ExecutionRouter, GatewayBackend, ServiceConfig, rest_router};

const X_INTO_BIT_ONE: &str = r#"
OPENQASM 3;
include "stdgates.inc";
bit[2] c;
x $0;
c[1] = measure $0;
"#;

const X_ONE_QUBIT: &str = r#"
OPENQASM 3;
include "stdgates.inc";
bit[1] c;
x $0;
c[0] = measure $0;
"#;

fn write_device(dir: &Path, status: &str) -> ServiceConfig {
    let qubits = vec![QubitRecord::new(0, 5), QubitRecord::new(1, 6), QubitRecord::new(2, 7)];
    let couplings = vec![CouplingRecord::new(0, 1), CouplingRecord::new(2, 1)];
    let topology = DeviceTopology::new("anemone", qubits, couplings).unwrap();

    let mut config = ServiceConfig::default();
    config.device.topology_path = dir.join("device_topology.json");
    config.device.status_path = dir.join("device_status");
    topology.save_atomic(&config.device.topology_path).unwrap();
    std::fs::write(&config.device.status_path, status).unwrap();
    config
}

fn pulse_config(dir: &Path, status: &str) -> ServiceConfig {
    let mut config = write_device(dir, status);
    config.plugin.name = "qubex".into();
    config.plugin.seed = Some(11);
    config.plugin.backend.insert(
        "emulator".into(),
        json!({
            "readout": { "Q05": { "prob_meas1_prep0": 0.05, "prob_meas0_prep1": 0.1 } },
            "calibration_shots": 20000
        }),
    );
    config
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_job(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/jobs")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_call_job_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_device(dir.path(), "active");
    config.plugin.seed = Some(1);
    let router = Arc::new(ExecutionRouter::from_config(&config).unwrap());
    let app = rest_router(router, "*");

    let (status, body) = send(
        app,
        post_job(json!({ "job_id": "job-7", "program": X_INTO_BIT_ONE, "shots": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job_id"], "job-7");
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(body["message"], "job is succeeded");
    assert_eq!(body["counts"], json!({ "10": 100 }));
}

#[tokio::test]
async fn test_failures_are_uniform() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_device(dir.path(), "active");
    let router = Arc::new(ExecutionRouter::from_config(&config).unwrap());
    let app = rest_router(router, "*");

    // h is outside the standard gate set.
    let program = "OPENQASM 3;\ninclude \"stdgates.inc\";\nbit[1] c;\nh $0;\nc[0] = measure $0;\n";
    let (status, body) = send(app.clone(), post_job(json!({ "program": program, "shots": 10 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FAILURE");
    assert_eq!(body["message"], "internal server error");
    assert_eq!(body["counts"], json!({}));
    assert!(!body["job_id"].as_str().unwrap().is_empty());

    let (_, body) = send(app, post_job(json!({ "program": X_INTO_BIT_ONE, "shots": 100_001 }))).await;
    assert_eq!(body["message"], "internal server error");
}

#[tokio::test]
async fn test_status_and_device_info() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_device(dir.path(), "active\n");
    config.device.provider = "lab".into();
    let router = Arc::new(ExecutionRouter::from_config(&config).unwrap());
    let app = rest_router(router, "http://localhost:3000");

    let (_, body) = send(app.clone(), get("/v1/status")).await;
    assert_eq!(body["status"], "ACTIVE");

    let (status, info) = send(app.clone(), get("/v1/device")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["device_id"], "anemone");
    assert_eq!(info["provider"], "lab");
    assert_eq!(info["type"], "simulator");
    assert_eq!(info["max_qubits"], 3);
    assert_eq!(info["max_shots"], 100_000);
    let topology = DeviceTopology::from_json(info["device_info"].as_str().unwrap()).unwrap();
    assert_eq!(topology.couplings.len(), 2);

    std::fs::write(&config.device.status_path, "inactive").unwrap();
    let (_, body) = send(app.clone(), get("/v1/status")).await;
    assert_eq!(body["status"], "INACTIVE");
    let (_, body) = send(app.clone(), post_job(json!({ "program": X_INTO_BIT_ONE }))).await;
    assert_eq!(body["message"], "device is inactive");

    std::fs::remove_file(&config.device.status_path).unwrap();
    let (_, body) = send(app.clone(), get("/v1/status")).await;
    assert_eq!(body["status"], "INACTIVE");

    let (status, body) = send(app, get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pulse_calibrates_once_and_mitigates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = pulse_config(dir.path(), "active");
    config.mitigation = MitigationStrategy::LinearInversion;
    let router = Arc::new(ExecutionRouter::<GatewayBackend>::from_config(&config).unwrap());
    assert_eq!(router.lifecycle().state().await, CalibrationState::Uninitialized);

    let shots = 4000;
    let (a, b, c) = tokio::join!(
        router.call_job("a".into(), X_ONE_QUBIT, shots),
        router.call_job("b".into(), X_ONE_QUBIT, shots),
        router.call_job("c".into(), X_ONE_QUBIT, shots),
    );
    for result in [&a, &b, &c] {
        assert_eq!(result.status, JobStatus::Success, "{}", result.message);
        assert!(result.counts.get("1") > 3800, "{:?}", result.counts);
    }
    assert_eq!(router.lifecycle().state().await, CalibrationState::Ready);

    let saved = DeviceTopology::load(&config.device.topology_path).unwrap();
    let calibrated_at = saved.calibrated_at.clone().expect("calibration timestamp");
    let q05 = saved.qubit(0).unwrap().meas_error;
    assert!((q05.prob_meas1_prep0 - 0.05).abs() < 0.01);
    assert!((q05.prob_meas0_prep1 - 0.1).abs() < 0.01);

    let again = router.call_job("d".into(), X_ONE_QUBIT, 100).await;
    assert!(again.is_success());
    let reloaded = DeviceTopology::load(&config.device.topology_path).unwrap();
    assert_eq!(reloaded.calibrated_at, Some(calibrated_at));

    let info = router.get_device_info().unwrap();
    assert_eq!(info.device_type, "QPU");
    assert!(info.calibrated_at.is_some());
}

#[tokio::test]
async fn test_maintenance_runs_without_calibrating() {
    let dir = tempfile::tempdir().unwrap();
    let config = pulse_config(dir.path(), "maintenance");
    let router = ExecutionRouter::from_config(&config).unwrap();

    let result = router.call_job("m".into(), X_ONE_QUBIT, 200).await;
    assert!(result.is_success(), "{}", result.message);
    assert_eq!(router.lifecycle().state().await, CalibrationState::Uninitialized);

    let saved = DeviceTopology::load(&config.device.topology_path).unwrap();
    assert!(saved.calibrated_at.is_none());
}

#[tokio::test]
async fn test_pulse_rejects_missing_coupling() {
    let dir = tempfile::tempdir().unwrap();
    let config = pulse_config(dir.path(), "active");
    let router = ExecutionRouter::from_config(&config).unwrap();

    // Only 0->1 and 2->1 exist.
    let program = "OPENQASM 3;\ninclude \"stdgates.inc\";\nbit[2] c;\ncx $1, $0;\nc[0] = measure $0;\nc[1] = measure $1;\n";
    let result = router.call_job("r".into(), program, 100).await;
    assert_eq!(result.status, JobStatus::Failure);
    assert_eq!(result.message, "internal server error");
}

#[tokio::test]
async fn test_nearest_distribution_uses_topology() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_device(dir.path(), "active");
    let mut topology = DeviceTopology::load(&config.device.topology_path).unwrap();
    topology.qubit_mut(0).unwrap().meas_error.prob_meas1_prep0 = 0.1;
    topology.qubit_mut(0).unwrap().meas_error.prob_meas0_prep1 = 0.2;
    topology.save_atomic(&config.device.topology_path).unwrap();
    config.mitigation = MitigationStrategy::NearestDistribution;

    let router = ExecutionRouter::from_config(&config).unwrap();
    // The ideal simulator reads |1> perfectly; inverting the recorded error
    // pushes mass below zero on "0", which the projection removes.
    let result = router.call_job("n".into(), X_ONE_QUBIT, 1000).await;
    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.counts.get("0"), 0);
    assert!(result.counts.get("1") >= 999);
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_process_backend() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_device(dir.path(), "active");
    config.plugin.name = "ybex".into();
    config.plugin.backend.insert(
        "command".into(),
        json!(["sh", "-c", "echo '{\"1\": {shots}}'"]),
    );
    let router = ExecutionRouter::from_config(&config).unwrap();

    let program = "OPENQASM 3;\ninclude \"stdgates.inc\";\nbit[1] c;\nrx(0.5) $0;\nc[0] = measure $0;\n";
    let result = router.call_job("p".into(), program, 64).await;
    assert!(result.is_success(), "{}", result.message);
    assert_eq!(result.counts.get("1"), 64);
}

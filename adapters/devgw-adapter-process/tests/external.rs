//! Jobs against small shell programs.
#![cfg(unix)]

use std::time::{Duration, Instant};

use devgw_adapter_process::{CommandSpec, CommandTemplate, ProcessBackend};
use devgw_hal::{Backend, Counts, DeviceTopology, HalError, HalResult, QubitMapping, QubitRecord, remap};
use devgw_qasm3::parse;

const PROGRAM: &str = "OPENQASM 3;\ninclude \"stdgates.inc\";\nbit[1] c;\nrx(0.5) $0;\nrx(0.25) $0;\nc[0] = measure $0;\n";

fn mapping() -> QubitMapping {
    let qubits = (0..4).map(|i| QubitRecord::new(i, i)).collect();
    QubitMapping::from_topology(&DeviceTopology::new("anemone", qubits, vec![]).unwrap()).unwrap()
}

fn shell(script: &str) -> ProcessBackend {
    let spec = CommandSpec::Args(vec!["sh".into(), "-c".into(), script.into()]);
    ProcessBackend::new(CommandTemplate::from_spec(spec).unwrap())
}

async fn run(backend: &ProcessBackend, shots: u32) -> HalResult<Counts> {
    let circuit = parse(PROGRAM).unwrap();
    let compiled = backend.compile(&circuit, &mapping())?;
    let raw = backend.execute(&compiled, shots).await?;
    remap(&raw, &compiled.clbits)
}

#[tokio::test]
async fn test_shots_and_angle_are_passed() {
    let backend = shell(r#"test "{angle}" = 0.75 && echo '{"0": 0, "1": {shots}}'"#);
    let counts = run(&backend, 70).await.unwrap();
    assert_eq!(counts.get("0"), 0);
    assert_eq!(counts.get("1"), 70);
}

#[tokio::test]
async fn test_short_histogram_is_parse_error() {
    let err = run(&shell(r#"echo '{"0": 3}'"#), 1000).await.unwrap_err();
    match err {
        HalError::ResultParse(msg) => assert!(msg.contains("1000 shots")),
        other => panic!("expected ResultParse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_zero_exit_is_execution_error() {
    let backend = shell("echo boom >&2; exit 3");
    let err = run(&backend, 10).await.unwrap_err();
    match err {
        HalError::Execution(msg) => assert!(msg.contains("boom")),
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_output_is_parse_error() {
    let err = run(&shell("echo not-json"), 10).await.unwrap_err();
    assert!(matches!(err, HalError::ResultParse(_)));

    let err = run(&shell(r#"echo '{"0x": 10}'"#), 10).await.unwrap_err();
    assert!(matches!(err, HalError::ResultParse(_)));
}

#[tokio::test]
async fn test_missing_program() {
    let backend = ProcessBackend::new(
        CommandTemplate::new(vec!["/nonexistent/devgw-sampler".into()]).unwrap(),
    );
    let err = run(&backend, 10).await.unwrap_err();
    assert!(matches!(err, HalError::Execution(_)));
}

#[tokio::test]
async fn test_dropped_job_does_not_wait_for_child() {
    let backend = shell("sleep 5; echo '{\"0\": 1}'");
    let start = Instant::now();
    let result = tokio::time::timeout(Duration::from_millis(200), run(&backend, 1)).await;
    assert!(result.is_err());
    assert!(start.elapsed() < Duration::from_secs(2));
}

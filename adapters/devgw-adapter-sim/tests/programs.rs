//! End-to-end: parse, compile, simulate and remap client programs.

use devgw_adapter_sim::SimulatorBackend;
use devgw_hal::{Backend, Counts, DeviceTopology, HalError, QubitMapping, QubitRecord, remap};
use devgw_qasm3::parse;
use proptest::prelude::*;

fn mapping() -> QubitMapping {
    let qubits = (0..4).map(|i| QubitRecord::new(i, 10 + i)).collect();
    QubitMapping::from_topology(&DeviceTopology::new("sim", qubits, vec![]).unwrap()).unwrap()
}

async fn run(body: &str, shots: u32) -> Result<Counts, HalError> {
    let circuit = parse(&format!("OPENQASM 3;\ninclude \"stdgates.inc\";\n{body}")).unwrap();
    let backend = SimulatorBackend::new().with_seed(11);
    let compiled = backend.compile(&circuit, &mapping())?;
    let raw = backend.execute(&compiled, shots).await?;
    remap(&raw, &compiled.clbits)
}

#[tokio::test]
async fn test_measure_into_second_bit() {
    let counts = run("bit[2] c;\nx $0;\nc[1] = measure $0;\n", 100).await.unwrap();
    assert_eq!(counts.get("10"), 100);
    assert_eq!(counts.len(), 1);
}

#[tokio::test]
async fn test_bell_pair() {
    let counts = run(
        "bit[2] c;\nrz(pi/2) $0;\nsx $0;\nrz(pi/2) $0;\ncx $0, $1;\nc[0] = measure $0;\nc[1] = measure $1;\n",
        1000,
    )
    .await
    .unwrap();
    assert_eq!(counts.get("00") + counts.get("11"), 1000);
}

#[tokio::test]
async fn test_sparse_qubits() {
    let counts = run(
        "bit[2] c;\nrz(pi/2) $0;\nsx $0;\nrz(pi/2) $0;\ncx $0, $2;\nc[0] = measure $0;\nc[1] = measure $2;\n",
        1000,
    )
    .await
    .unwrap();
    assert_eq!(counts.get("00") + counts.get("11"), 1000);
}

#[tokio::test]
async fn test_idle_qubit_reads_zero() {
    let counts = run(
        "bit[2] c;\nsx $0;\nc[0] = measure $0;\nc[1] = measure $1;\n",
        1000,
    )
    .await
    .unwrap();
    assert_eq!(counts.get("00") + counts.get("01"), 1000);
    assert!(counts.get("01") > 0);
}

#[tokio::test]
async fn test_barrier_and_delay_accepted() {
    let counts = run("bit[1] c;\nx $0;\nbarrier;\ndelay[40ns] $0;\nc[0] = measure $0;\n", 10)
        .await
        .unwrap();
    assert_eq!(counts.get("1"), 10);
}

#[tokio::test]
async fn test_unsupported_gate() {
    let err = run("bit[1] c;\nh $0;\nc[0] = measure $0;\n", 10).await.unwrap_err();
    assert!(matches!(err, HalError::UnsupportedInstruction { ref name } if name == "h"));
}

#[tokio::test]
async fn test_qubit_outside_device() {
    let err = run("bit[1] c;\nx $4;\nc[0] = measure $4;\n", 10).await.unwrap_err();
    assert!(matches!(err, HalError::InvalidQubit(_)));
}

#[test]
fn test_compilation_is_idempotent() {
    let circuit = parse(
        "OPENQASM 3;\ninclude \"stdgates.inc\";\nbit[3] c;\nrz(pi/4) $2;\nsx $2;\ncx $2, $0;\nx $3;\nc[2] = measure $3;\nc[0] = measure $2;\n",
    )
    .unwrap();
    let backend = SimulatorBackend::new();
    let mapping = mapping();

    let first = backend.compile(&circuit, &mapping).unwrap();
    let second = backend.compile(&circuit, &mapping).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.clbits.labels_by_bit(), vec![Some("Q12"), None, Some("Q13")]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Remapped counts preserve the shot total and the register width.
    #[test]
    fn prop_remap_preserves_shots(flips in prop::collection::vec(any::<bool>(), 1..4), shots in 1u32..500) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let width = flips.len();
        let mut body = format!("bit[{width}] c;\n");
        for (i, flip) in flips.iter().enumerate() {
            if *flip {
                body.push_str(&format!("x ${i};\n"));
            }
            body.push_str(&format!("c[{i}] = measure ${i};\n"));
        }

        let counts = runtime.block_on(run(&body, shots)).unwrap();
        prop_assert_eq!(counts.total(), u64::from(shots));
        prop_assert!(counts.iter().all(|(k, _)| k.len() == width));

        let expected: String = flips.iter().rev().map(|f| if *f { '1' } else { '0' }).collect();
        prop_assert_eq!(counts.get(&expected), u64::from(shots));
    }
}

//! Front-end behaviour on the program shapes the gateway receives.

use devgw_ir::{ClbitId, InstructionKind, QubitId, StandardGate, TimeUnit};
use devgw_qasm3::{ParseError, parse};
use proptest::prelude::*;

const HEADER: &str = "OPENQASM 3;\ninclude \"stdgates.inc\";\n";

fn program(body: &str) -> String {
    format!("{HEADER}{body}")
}

#[test]
fn test_sparse_physical_qubits_span_to_max() {
    let circuit = parse(&program(
        "bit[2] c;\nsx $0;\ncx $0, $2;\nc[0] = measure $0;\nc[1] = measure $2;\n",
    ))
    .unwrap();

    assert_eq!(circuit.num_qubits(), 3);
    assert_eq!(circuit.used_qubits(), vec![QubitId(0), QubitId(2)]);
}

#[test]
fn test_measure_targets_named_bit() {
    let circuit = parse(&program("bit[2] c;\nx $0;\nc[1] = measure $0;\n")).unwrap();
    let measure = &circuit.instructions()[1];

    assert!(measure.is_measure());
    assert_eq!(measure.qubits, vec![QubitId(0)]);
    assert_eq!(measure.clbits, vec![ClbitId(1)]);
}

#[test]
fn test_arrow_measure() {
    let circuit = parse(&program("bit[1] c;\nmeasure $3 -> c[0];\n")).unwrap();
    assert_eq!(circuit.num_qubits(), 4);
    assert_eq!(circuit.instructions()[0].clbits, vec![ClbitId(0)]);
}

#[test]
fn test_unknown_gate_kept_opaque() {
    let circuit = parse(&program("h $0;\nccx $0, $1, $2;\n")).unwrap();

    assert_eq!(circuit.instructions()[0].name(), "h");
    let ccx = circuit.instructions()[1].as_gate().unwrap();
    assert!(ccx.as_standard().is_none());
    assert_eq!(ccx.num_qubits(), 3);
}

#[test]
fn test_rotation_angle_expression() {
    let circuit = parse(&program("rz(-pi/4) $0;\n")).unwrap();
    let gate = circuit.instructions()[0].as_gate().unwrap();
    match gate.as_standard() {
        Some(StandardGate::Rz(angle)) => {
            let value = angle.as_f64().unwrap();
            assert!((value + std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        }
        other => panic!("expected rz, got {other:?}"),
    }
}

#[test]
fn test_delay_and_barrier() {
    let circuit = parse(&program("delay[100ns] $0, $1;\nbarrier;\nbarrier $1;\n")).unwrap();

    match &circuit.instructions()[0].kind {
        InstructionKind::Delay(d) => {
            assert_eq!(d.unit, TimeUnit::Ns);
            assert_eq!(d.as_nanoseconds(), Some(100.0));
        }
        other => panic!("expected delay, got {other:?}"),
    }
    assert!(circuit.instructions()[1].qubits.is_empty());
    assert_eq!(circuit.instructions()[2].qubits, vec![QubitId(1)]);
}

#[test]
fn test_mixed_addressing_rejected() {
    let err = parse(&program("qubit[2] q;\nx q[0];\nx $1;\n")).unwrap_err();
    assert!(matches!(err, ParseError::MixedQubitAddressing(1)));
}

#[test]
fn test_unbound_parameter_rejected() {
    let err = parse(&program("rz(theta) $0;\n")).unwrap_err();
    assert!(matches!(err, ParseError::UndefinedIdentifier(ref n) if n == "theta"));
}

#[test]
fn test_measure_bit_out_of_range() {
    let err = parse(&program("bit[1] c;\nc[1] = measure $0;\n")).unwrap_err();
    assert!(matches!(err, ParseError::IndexOutOfBounds { index: 1, size: 1, .. }));
}

#[test]
fn test_register_measure_size_mismatch() {
    let err = parse(&program("bit[2] c;\nc = measure $0;\n")).unwrap_err();
    assert!(matches!(err, ParseError::MeasureMismatch { qubits: 1, bits: 2 }));
}

#[test]
fn test_control_flow_rejected() {
    let err = parse(&program("bit[1] c;\nif (c == 1) { x $0; }\n")).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedStatement(ref s) if s == "if"));

    let err = parse(&program("for i in [0:3] { x $0; }\n")).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedStatement(ref s) if s == "for"));

    let err = parse(&program("gate flip a { x a; }\nflip $0;\n")).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedStatement(ref s) if s == "gate definition"));
}

#[test]
fn test_classical_assignment_rejected() {
    let err = parse(&program("bit[1] c;\nc[0] = 1;\n")).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedStatement(ref s) if s == "classical assignment"));

    let ast = devgw_qasm3::parse_ast(&program("bit[1] c;\nc[0] = measure $0;\n")).unwrap();
    assert_eq!(ast.statements.len(), 3);
}

#[test]
fn test_duplicate_register_rejected() {
    let err = parse(&program("bit[1] c;\nbit[2] c;\n")).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateDeclaration(_)));
}

proptest! {
    /// The circuit always spans up to the largest `$n` referenced.
    #[test]
    fn prop_num_qubits_is_max_reference(indices in prop::collection::vec(0u32..64, 1..12)) {
        let body: String = indices.iter().map(|i| format!("x ${i};\n")).collect();
        let circuit = parse(&program(&body)).unwrap();

        let max = *indices.iter().max().unwrap() as usize;
        prop_assert_eq!(circuit.num_qubits(), max + 1);
        prop_assert_eq!(circuit.len(), indices.len());
    }
}

//! Reduction of `rx` programs to a single rotation angle.

use devgw_compile::{CircuitCompiler, CompileError, CompileResult, GateSet, LoweringContext, angle};
use devgw_ir::{Circuit, InstructionKind, StandardGate};
use tracing::trace;

/// Operations the external program understands.
pub const PROCESS_GATES: [&str; 3] = ["rx", "measure", "barrier"];

/// What the external program is invoked with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessProgram {
    /// Sum of every `rx` angle in the circuit.
    pub angle: f64,
}

/// Accumulates the `rx` rotations of a circuit.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    gates: GateSet,
}

impl ProcessCompiler {
    pub fn new() -> Self {
        Self {
            gates: GateSet::new(PROCESS_GATES),
        }
    }
}

impl Default for ProcessCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitCompiler for ProcessCompiler {
    type Output = ProcessProgram;

    fn name(&self) -> &str {
        "process"
    }

    fn gate_set(&self) -> &GateSet {
        &self.gates
    }

    fn lower(&self, circuit: &Circuit, ctx: &mut LoweringContext<'_>) -> CompileResult<ProcessProgram> {
        let mut total = 0.0;
        for inst in circuit.instructions() {
            match &inst.kind {
                InstructionKind::Measure => {
                    ctx.record_measure(inst.qubits[0], inst.clbits[0])?;
                }
                InstructionKind::Barrier => {
                    for q in &inst.qubits {
                        ctx.resolve(*q)?;
                    }
                }
                InstructionKind::Gate(gate) => match gate.as_standard() {
                    Some(StandardGate::Rx(theta)) => {
                        let label = ctx.resolve(inst.qubits[0])?;
                        let theta = angle(theta)?;
                        trace!(qubit = label, theta, "rx");
                        total += theta;
                    }
                    _ => {
                        return Err(CompileError::UnsupportedInstruction {
                            name: gate.name().to_string(),
                        });
                    }
                },
                InstructionKind::Delay(_) | InstructionKind::Reset => {
                    return Err(CompileError::UnsupportedInstruction {
                        name: inst.name().to_string(),
                    });
                }
            }
        }
        Ok(ProcessProgram { angle: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgw_hal::{Capabilities, DeviceTopology, QubitMapping, QubitRecord};
    use devgw_ir::{ClbitId, QubitId};

    fn mapping() -> QubitMapping {
        let qubits = (0..2).map(|i| QubitRecord::new(i, i)).collect();
        QubitMapping::from_topology(&DeviceTopology::new("ext", qubits, vec![]).unwrap()).unwrap()
    }

    fn caps() -> Capabilities {
        Capabilities::hardware("ext").with_gates(PROCESS_GATES)
    }

    #[test]
    fn test_angles_accumulate() {
        let mut c = Circuit::with_size("c", 1, 1);
        c.rx(0.5, QubitId(0)).unwrap();
        c.barrier([QubitId(0)]).unwrap();
        c.rx(0.25, QubitId(0)).unwrap();
        c.measure(QubitId(0), ClbitId(0)).unwrap();

        let compiled = ProcessCompiler::new().compile(&c, &mapping(), &caps()).unwrap();
        assert_eq!(compiled.program.angle, 0.75);
        assert_eq!(compiled.clbits.get(ClbitId(0)).unwrap().label, "Q00");
    }

    #[test]
    fn test_standard_gates_rejected() {
        let mut c = Circuit::with_size("c", 1, 1);
        c.rx(0.5, QubitId(0)).unwrap();
        c.x(QubitId(0)).unwrap();
        let err = ProcessCompiler::new().compile(&c, &mapping(), &caps()).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedInstruction { ref name } if name == "x"));
    }

    #[test]
    fn test_unknown_qubit() {
        let mut c = Circuit::with_size("c", 3, 0);
        c.rx(0.5, QubitId(2)).unwrap();
        let err = ProcessCompiler::new().compile(&c, &mapping(), &caps()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidQubit(_)));
    }
}

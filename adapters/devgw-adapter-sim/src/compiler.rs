//! Lowering to statevector operations.

use devgw_compile::{CircuitCompiler, CompileError, CompileResult, GateSet, LoweringContext, angle};
use devgw_ir::{Circuit, InstructionKind, StandardGate};
use tracing::trace;

use crate::statevector::SimOp;

/// Compiles circuits over the standard gate set into [`SimOp`]s.
///
/// Operations act on virtual indices; labels are only resolved to check
/// that every qubit exists on the device. Barriers and delays have no
/// effect on an ideal state and are dropped after that check.
#[derive(Debug, Clone, Default)]
pub struct SimCompiler {
    gates: GateSet,
}

impl SimCompiler {
    pub fn new(gates: GateSet) -> Self {
        Self { gates }
    }
}

impl CircuitCompiler for SimCompiler {
    type Output = Vec<SimOp>;

    fn name(&self) -> &str {
        "statevector"
    }

    fn gate_set(&self) -> &GateSet {
        &self.gates
    }

    fn lower(&self, circuit: &Circuit, ctx: &mut LoweringContext<'_>) -> CompileResult<Vec<SimOp>> {
        let mut ops = Vec::with_capacity(circuit.len());

        for inst in circuit.instructions() {
            match &inst.kind {
                InstructionKind::Measure => {
                    ctx.record_measure(inst.qubits[0], inst.clbits[0])?;
                }
                InstructionKind::Barrier | InstructionKind::Delay(_) => {
                    for q in &inst.qubits {
                        ctx.resolve(*q)?;
                    }
                }
                InstructionKind::Gate(gate) => {
                    for q in &inst.qubits {
                        ctx.resolve(*q)?;
                    }
                    let q = |i: usize| inst.qubits[i].index();
                    let op = match gate.as_standard() {
                        Some(StandardGate::X) => SimOp::X(q(0)),
                        Some(StandardGate::SX) => SimOp::SX(q(0)),
                        Some(StandardGate::Rx(theta)) => SimOp::Rx(q(0), angle(theta)?),
                        Some(StandardGate::Rz(theta)) => SimOp::Rz(q(0), angle(theta)?),
                        Some(StandardGate::CX) => SimOp::CX(q(0), q(1)),
                        None => return Err(CompileError::UnsupportedInstruction {
                            name: gate.name().to_string(),
                        }),
                    };
                    trace!(?op, "lowered");
                    ops.push(op);
                }
                InstructionKind::Reset => {
                    return Err(CompileError::UnsupportedInstruction {
                        name: inst.name().to_string(),
                    });
                }
            }
        }
        Ok(ops)
    }
}

//! Circuit instructions combining gates with operands.

use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::gate::{Gate, StandardGate};
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(Gate),
    /// Measurement of one qubit into one classical bit.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (synchronization point).
    Barrier,
    /// Idle the qubit for a duration.
    Delay(Duration),
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction writes (measure only).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate.into()),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a barrier. An empty operand list means all qubits.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a delay instruction.
    pub fn delay(qubits: impl IntoIterator<Item = QubitId>, duration: Duration) -> Self {
        Self {
            kind: InstructionKind::Delay(duration),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Name of the operation as it appears in a program.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure",
            InstructionKind::Reset => "reset",
            InstructionKind::Barrier => "barrier",
            InstructionKind::Delay(_) => "delay",
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Instruction::measure(QubitId(0), ClbitId(0)).name(), "measure");
        assert_eq!(Instruction::barrier([]).name(), "barrier");
        assert_eq!(
            Instruction::single_qubit_gate(StandardGate::SX, QubitId(1)).name(),
            "sx"
        );
        assert_eq!(
            Instruction::delay([QubitId(0)], Duration::dt(4)).name(),
            "delay"
        );
    }

    #[test]
    fn test_gate_accessors() {
        let inst = Instruction::gate(StandardGate::CX, [QubitId(0), QubitId(1)]);
        assert!(inst.is_gate());
        assert!(!inst.is_measure());
        assert_eq!(inst.as_gate().map(Gate::num_qubits), Some(2));
    }
}

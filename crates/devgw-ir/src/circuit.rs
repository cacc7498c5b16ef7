//! High-level circuit builder API.

use std::f64::consts::FRAC_PI_2;

use crate::duration::Duration;
use crate::error::{IrError, IrResult};
use crate::gate::{Gate, StandardGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::ParameterExpression;
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit in program order.
///
/// Every instruction is checked against the declared qubit and bit counts
/// when it is applied, so a `Circuit` never references an operand it does not
/// own.
#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_qubits: 0,
            num_clbits: 0,
            instructions: vec![],
        }
    }

    /// Create a circuit with a given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            num_qubits,
            num_clbits,
            ..Self::new(name)
        }
    }

    /// Add a single qubit to the circuit.
    pub fn add_qubit(&mut self) -> QubitId {
        let id = QubitId(self.num_qubits);
        self.num_qubits += 1;
        id
    }

    /// Add `size` consecutive qubits.
    pub fn add_qubits(&mut self, size: u32) -> Vec<QubitId> {
        (0..size).map(|_| self.add_qubit()).collect()
    }

    /// Add a single classical bit to the circuit.
    pub fn add_clbit(&mut self) -> ClbitId {
        let id = ClbitId(self.num_clbits);
        self.num_clbits += 1;
        id
    }

    /// Add `size` consecutive classical bits.
    pub fn add_clbits(&mut self, size: u32) -> Vec<ClbitId> {
        (0..size).map(|_| self.add_clbit()).collect()
    }

    // =========================================================================
    // Gates
    // =========================================================================

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::X, qubit))
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::SX, qubit))
    }

    /// Apply Rx rotation.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Rx(theta.into()),
            qubit,
        ))
    }

    /// Apply Rz rotation.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Rz(theta.into()),
            qubit,
        ))
    }

    /// Apply CNOT gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(StandardGate::CX, [control, target]))
    }

    /// Apply an arbitrary gate.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(gate, qubits))
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.apply(Instruction::measure(qubit, clbit))
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::reset(qubit))
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.apply(Instruction::barrier(qubits))
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        self.apply(Instruction::barrier([]))
    }

    /// Idle a qubit for `duration`.
    pub fn delay(&mut self, qubit: QubitId, duration: Duration) -> IrResult<&mut Self> {
        self.apply(Instruction::delay([qubit], duration))
    }

    /// Validate and append an instruction.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.check(&instruction)?;
        self.instructions.push(instruction);
        Ok(self)
    }

    fn check(&self, instruction: &Instruction) -> IrResult<()> {
        let name = instruction.name();

        for &qubit in &instruction.qubits {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: Some(name.to_string()),
                });
            }
        }
        for &clbit in &instruction.clbits {
            if clbit.0 >= self.num_clbits {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: Some(name.to_string()),
                });
            }
        }

        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let got = instruction.qubits.len() as u32;
                if got != gate.num_qubits() {
                    return Err(IrError::QubitCountMismatch {
                        gate_name: name.to_string(),
                        expected: gate.num_qubits(),
                        got,
                    });
                }
                for (i, q) in instruction.qubits.iter().enumerate() {
                    if instruction.qubits[..i].contains(q) {
                        return Err(IrError::DuplicateQubit {
                            qubit: *q,
                            gate_name: Some(name.to_string()),
                        });
                    }
                }
            }
            InstructionKind::Measure => {
                if instruction.qubits.len() != 1 || instruction.clbits.len() != 1 {
                    return Err(IrError::MeasureArity {
                        qubits: instruction.qubits.len(),
                        clbits: instruction.clbits.len(),
                    });
                }
            }
            InstructionKind::Reset | InstructionKind::Delay(_) => {
                if instruction.qubits.is_empty() {
                    return Err(IrError::QubitCountMismatch {
                        gate_name: name.to_string(),
                        expected: 1,
                        got: 0,
                    });
                }
            }
            InstructionKind::Barrier => {}
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the circuit has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Every qubit that some instruction touches, ascending.
    ///
    /// An empty barrier spans all declared qubits but does not count as a use.
    pub fn used_qubits(&self) -> Vec<QubitId> {
        let mut used: Vec<QubitId> = self
            .instructions
            .iter()
            .filter(|inst| !matches!(inst.kind, InstructionKind::Barrier))
            .flat_map(|inst| inst.qubits.iter().copied())
            .collect();
        used.sort_unstable();
        used.dedup();
        used
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit in the native gate set.
    ///
    /// The Hadamard is expressed as `rz(π/2) sx rz(π/2)`.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        let q0 = QubitId(0);
        let q1 = QubitId(1);

        circuit
            .rz(FRAC_PI_2, q0)?
            .sx(q0)?
            .rz(FRAC_PI_2, q0)?
            .cx(q0, q1)?
            .measure(q0, ClbitId(0))?
            .measure(q1, ClbitId(1))?;

        Ok(circuit)
    }
}

//! Quantum gate types.

use serde::{Deserialize, Serialize};

use crate::parameter::ParameterExpression;

/// Gates with known semantics that at least one backend executes natively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Pauli-X gate.
    X,
    /// sqrt(X) gate.
    SX,
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Controlled-X (CNOT) gate.
    CX,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::X => "x",
            StandardGate::SX => "sx",
            StandardGate::Rx(_) => "rx",
            StandardGate::Rz(_) => "rz",
            StandardGate::CX => "cx",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::X | StandardGate::SX | StandardGate::Rx(_) | StandardGate::Rz(_) => 1,
            StandardGate::CX => 2,
        }
    }

    /// The rotation angle, for parameterized gates.
    pub fn angle(&self) -> Option<&ParameterExpression> {
        match self {
            StandardGate::Rx(p) | StandardGate::Rz(p) => Some(p),
            _ => None,
        }
    }
}

/// A gate the front end recognised syntactically but no backend knows.
///
/// Kept in the circuit so compilation can fail with the gate's name instead of
/// silently dropping it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomGate {
    /// Name of the gate as written in the program.
    pub name: String,
    /// Number of qubits.
    pub num_qubits: u32,
    /// Parameters.
    pub params: Vec<ParameterExpression>,
}

impl CustomGate {
    /// Create a new custom gate.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            params: vec![],
        }
    }

    /// Set parameters.
    pub fn with_params(mut self, params: Vec<ParameterExpression>) -> Self {
        self.params = params;
        self
    }
}

/// Standard or custom gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// Standard gate.
    Standard(StandardGate),
    /// Custom gate.
    Custom(CustomGate),
}

impl GateKind {
    /// Get the name of the gate.
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Custom(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Custom(g) => g.num_qubits,
        }
    }
}

/// A gate, optionally labelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The gate kind.
    pub kind: GateKind,
    /// Optional label for display.
    pub label: Option<String>,
}

impl Gate {
    /// Create a gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            label: None,
        }
    }

    /// Create a gate from a custom gate.
    pub fn custom(gate: CustomGate) -> Self {
        Self {
            kind: GateKind::Custom(gate),
            label: None,
        }
    }

    /// Set a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the gate name.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }

    /// The standard gate, if this is one.
    pub fn as_standard(&self) -> Option<&StandardGate> {
        match &self.kind {
            GateKind::Standard(g) => Some(g),
            GateKind::Custom(_) => None,
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CustomGate> for Gate {
    fn from(gate: CustomGate) -> Self {
        Gate::custom(gate)
    }
}

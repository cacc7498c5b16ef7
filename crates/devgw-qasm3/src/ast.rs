//! Abstract Syntax Tree for `OpenQASM` 3.

use devgw_ir::Duration;
use serde::{Deserialize, Serialize};

/// A complete QASM3 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// QASM version (e.g., "3.0").
    pub version: String,
    /// Statements in the program.
    pub statements: Vec<Statement>,
}

/// A statement in a QASM3 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// Include statement.
    Include(String),

    /// Qubit declaration: `qubit[n] name;` or `qubit name;`
    QubitDecl { name: String, size: Option<u32> },

    /// Classical bit declaration: `bit[n] name;` or `bit name;`
    BitDecl { name: String, size: Option<u32> },

    /// Gate application.
    Gate(GateCall),

    /// Measurement: `measure q -> c;` or `c = measure q;`
    Measure {
        qubits: Vec<QubitRef>,
        bits: Vec<BitRef>,
    },

    /// Reset: `reset q;`
    Reset { qubits: Vec<QubitRef> },

    /// Barrier: `barrier q;`
    Barrier { qubits: Vec<QubitRef> },

    /// Delay: `delay[100ns] q;`
    Delay {
        duration: Duration,
        qubits: Vec<QubitRef>,
    },
}

impl Statement {
    /// Keyword describing the statement, for error messages.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Include(_) => "include",
            Statement::QubitDecl { .. } => "qubit",
            Statement::BitDecl { .. } => "bit",
            Statement::Gate(_) => "gate call",
            Statement::Measure { .. } => "measure",
            Statement::Reset { .. } => "reset",
            Statement::Barrier { .. } => "barrier",
            Statement::Delay { .. } => "delay",
        }
    }

    /// Qubit operands of this statement.
    pub fn qubit_refs(&self) -> &[QubitRef] {
        match self {
            Statement::Gate(call) => &call.qubits,
            Statement::Measure { qubits, .. }
            | Statement::Reset { qubits }
            | Statement::Barrier { qubits }
            | Statement::Delay { qubits, .. } => qubits,
            Statement::Include(_) | Statement::QubitDecl { .. } | Statement::BitDecl { .. } => &[],
        }
    }
}

/// A gate call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCall {
    /// Gate name.
    pub name: String,
    /// Gate parameters (angles, etc.).
    pub params: Vec<Expression>,
    /// Qubits the gate acts on.
    pub qubits: Vec<QubitRef>,
}

/// Reference to a qubit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QubitRef {
    /// Register element `q[i]` or the whole register `q`.
    Single {
        register: String,
        index: Option<u32>,
    },
    /// Hardware-addressed qubit `$n`.
    Physical(u32),
}

impl QubitRef {
    /// Create a reference to a single qubit.
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        QubitRef::Single {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Create a reference to an entire register.
    pub fn register(register: impl Into<String>) -> Self {
        QubitRef::Single {
            register: register.into(),
            index: None,
        }
    }
}

/// Reference to a classical bit or bit register element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BitRef {
    /// Single bit: `c` or `c[i]`.
    Single {
        register: String,
        index: Option<u32>,
    },
}

impl BitRef {
    /// Create a reference to a single bit.
    pub fn single(register: impl Into<String>, index: u32) -> Self {
        BitRef::Single {
            register: register.into(),
            index: Some(index),
        }
    }

    /// Create a reference to an entire register.
    pub fn register(register: impl Into<String>) -> Self {
        BitRef::Single {
            register: register.into(),
            index: None,
        }
    }
}

/// An expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Boolean literal.
    Bool(bool),
    /// Identifier.
    Identifier(String),
    /// Pi constant.
    Pi,
    /// Tau constant (2π).
    Tau,
    /// Euler's number.
    Euler,
    /// Negation.
    Neg(Box<Expression>),
    /// Binary operation.
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    /// Function call.
    FnCall { name: String, args: Vec<Expression> },
    /// Parenthesized expression.
    Paren(Box<Expression>),
}

impl Expression {
    /// Try to evaluate as a constant f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Expression::Int(v) => Some(*v as f64),
            Expression::Float(v) => Some(*v),
            Expression::Pi => Some(std::f64::consts::PI),
            Expression::Tau => Some(std::f64::consts::TAU),
            Expression::Euler => Some(std::f64::consts::E),
            Expression::Neg(e) => e.as_f64().map(|v| -v),
            Expression::BinOp { left, op, right } => {
                let l = left.as_f64()?;
                let r = right.as_f64()?;
                Some(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Pow => l.powf(r),
                    BinOp::Mod => l % r,
                    _ => return None,
                })
            }
            Expression::FnCall { name, args } => {
                let [arg] = args.as_slice() else {
                    return None;
                };
                let x = arg.as_f64()?;
                Some(match name.as_str() {
                    "sin" => x.sin(),
                    "cos" => x.cos(),
                    "tan" => x.tan(),
                    "exp" => x.exp(),
                    "ln" => x.ln(),
                    "sqrt" => x.sqrt(),
                    _ => return None,
                })
            }
            Expression::Paren(e) => e.as_f64(),
            _ => None,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

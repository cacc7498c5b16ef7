//! `OpenQASM` 3 front end for the devgw gateway
//!
//! Parses the programs clients submit into a [`devgw_ir::Circuit`]. Programs
//! address hardware qubits directly as `$0..$N-1`; the circuit spans
//! `$0..=$max` of the referenced indices, so a qubit that is only measured is
//! still part of it.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version declaration | `OPENQASM 3;` |
//! | Physical qubits | `x $0;` |
//! | Qubit registers | `qubit[2] q;` |
//! | Classical bits | `bit[2] c;` |
//! | Gates | `rz(pi/2) $0;`, `cx $0, $1;` |
//! | Measurements | `c[1] = measure $0;`, `measure $0 -> c[0];` |
//! | Barriers | `barrier $0, $1;` |
//! | Delays | `delay[100ns] $0;` |
//! | Reset | `reset $0;` |
//!
//! Gate names other than `x`, `sx`, `rz`, `rx` and `cx` are kept as opaque
//! custom gates; whether they run is the backend's decision. Control flow,
//! gate definitions and classical assignments are rejected.
//!
//! # Example
//!
//! ```rust
//! use devgw_qasm3::parse;
//!
//! let qasm = r#"
//!     OPENQASM 3;
//!     include "stdgates.inc";
//!     bit[2] c;
//!     sx $0;
//!     cx $0, $1;
//!     c[0] = measure $0;
//!     c[1] = measure $1;
//! "#;
//!
//! let circuit = parse(qasm).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.len(), 4);
//! ```

mod ast;
mod error;
mod lexer;
mod parser;

pub use error::{ParseError, ParseResult};
pub use parser::{parse, parse_ast};

/// AST types, for callers that inspect programs before lowering.
pub mod syntax {
    pub use crate::ast::*;
}

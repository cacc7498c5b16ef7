//! devgw Circuit Intermediate Representation
//!
//! This crate provides the data structures the gateway compiles from. A
//! [`Circuit`] is an ordered, program-order list of [`Instruction`]s over
//! virtual qubits (`$0..$N-1` in the source program) and classical bits.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`StandardGate`] for the gates backends understand natively and
//!   [`CustomGate`] for anything else the front end saw (kept so the validator
//!   can reject it by name)
//! - **Parameters**: [`ParameterExpression`] for rotation angles
//! - **Durations**: [`Duration`] and [`TimeUnit`] for `delay` instructions
//! - **Circuit**: [`Circuit`] builder API
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use devgw_ir::{Circuit, ClbitId, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.sx(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure(QubitId(0), ClbitId(0)).unwrap();
//! circuit.measure(QubitId(1), ClbitId(1)).unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.len(), 4);
//! ```
//!
//! # Native Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `Rz` | 1 | Rotation around Z (virtual on pulse hardware) |
//! | `SX` | 1 | sqrt(X) |
//! | `X` | 1 | Pauli-X |
//! | `Rx` | 1 | Rotation around X (external-process backends) |
//! | `CX` | 2 | Controlled-NOT |

pub mod circuit;
pub mod duration;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use duration::{Duration, TimeUnit};
pub use error::{IrError, IrResult};
pub use gate::{CustomGate, Gate, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use qubit::{ClbitId, QubitId};

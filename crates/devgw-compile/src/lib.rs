//! devgw compilation support
//!
//! Shared pieces every backend compiler is built from:
//!
//! - [`GateSet`]: the closed set of operations a backend accepts, checked
//!   over the whole program before anything is emitted
//! - [`CircuitCompiler`]: the lowering seam, with validation built in
//! - [`LoweringContext`]: virtual→physical resolution against the exposed
//!   qubits, coupling checks and classical-bit bookkeeping
//! - [`delay_to_ticks`]: duration conversion to device ticks
//!
//! # Pipeline
//!
//! ```text
//! Circuit ──→ GateSet::validate ──→ CircuitCompiler::lower ──→ CompiledCircuit
//!                  │                        │
//!                  │                        ├── resolve($n) → "Q05"
//!                  │                        ├── resolve_coupling → "Q05-Q06"
//!                  │                        └── record_measure → ClassicalBitMap
//!                  └── UnsupportedInstruction{name}
//! ```
//!
//! # Example
//!
//! ```rust
//! use devgw_compile::GateSet;
//! use devgw_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("c", 1, 0);
//! circuit.reset(QubitId(0)).unwrap();
//!
//! let err = GateSet::standard().validate(&circuit).unwrap_err();
//! assert_eq!(err.to_string(), "Unsupported instruction: reset");
//! ```

pub mod compiler;
pub mod context;
pub mod delay;
pub mod error;
pub mod gate_set;

pub use compiler::CircuitCompiler;
pub use context::{LoweringContext, angle};
pub use delay::delay_to_ticks;
pub use error::{CompileError, CompileResult};
pub use gate_set::GateSet;

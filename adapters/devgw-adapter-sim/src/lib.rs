//! devgw State-Vector Simulator
//!
//! An ideal simulator backend. Programs are compiled against the device
//! topology like on hardware (labels must exist and be exposed) but run on
//! an exact state vector over the program's virtual qubits.
//!
//! # Memory
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 20 | ~16 MB |
//! | 28 | ~4 GB (limit) |
//!
//! # Example
//!
//! ```ignore
//! use devgw_adapter_sim::SimulatorBackend;
//! use devgw_hal::{Backend, DeviceTopology, QubitMapping};
//! use devgw_ir::Circuit;
//!
//! let topology = DeviceTopology::load("config/device_topology.json")?;
//! let mapping = QubitMapping::from_topology(&topology)?;
//!
//! let backend = SimulatorBackend::new().with_seed(7);
//! let compiled = backend.compile(&Circuit::bell()?, &mapping)?;
//! let counts = backend.execute(&compiled, 1000).await?;
//! // Expect ~50% "00" and ~50% "11"
//! ```

mod backend;
mod compiler;
mod statevector;

pub use backend::SimulatorBackend;
pub use compiler::SimCompiler;
pub use statevector::{MAX_QUBITS, SimOp, Statevector};

//! devgw Hardware Abstraction Layer
//!
//! The device model and the backend seam of the gateway.
//!
//! # Overview
//!
//! - [`DeviceTopology`]: qubits, couplings and calibration data, loaded from
//!   and persisted to JSON
//! - [`QubitMapping`]: virtual index ↔ physical label (`Q05`) ↔ coupling label
//! - [`Backend`]: a compiler plus execution engine, with [`Capabilities`]
//! - [`DeviceLifecycle`]: the calibrate-once state machine and topology
//!   snapshot shared across requests
//! - [`BackendRegistry`]: factories for the closed set of [`BackendKind`]s
//! - [`remap`] and [`mitigation`]: turning raw engine counts into the counts
//!   clients asked for
//!
//! # Example: Remapping Results
//!
//! ```rust
//! use devgw_hal::{ClassicalBitMap, Counts, remap};
//! use devgw_ir::{ClbitId, QubitId};
//!
//! // `c[1] = measure $0;` with `bit[2] c;`
//! let mut bits = ClassicalBitMap::new(2);
//! bits.assign(ClbitId(1), QubitId(0), "Q05");
//!
//! let raw: Counts = [("1", 1000)].into_iter().collect();
//! let counts = remap(&raw, &bits).unwrap();
//! assert_eq!(counts.get("10"), 1000);
//! ```
//!
//! # Implementing a Backend
//!
//! ```ignore
//! use devgw_hal::{Backend, Capabilities, CompiledCircuit, Counts, HalResult, QubitMapping};
//! use devgw_ir::Circuit;
//! use async_trait::async_trait;
//!
//! struct MyBackend {
//!     capabilities: Capabilities,
//! }
//!
//! #[async_trait]
//! impl Backend for MyBackend {
//!     type Program = Vec<String>;
//!
//!     fn name(&self) -> &str { "my_backend" }
//!
//!     fn capabilities(&self) -> &Capabilities {
//!         &self.capabilities
//!     }
//!
//!     fn compile(&self, circuit: &Circuit, mapping: &QubitMapping)
//!         -> HalResult<CompiledCircuit<Vec<String>>> {
//!         # todo!()
//!     }
//!
//!     async fn execute(&self, compiled: &CompiledCircuit<Vec<String>>, shots: u32)
//!         -> HalResult<Counts> {
//!         # todo!()
//!     }
//! }
//! ```

pub mod backend;
pub mod capability;
pub mod compiled;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod mapping;
pub mod mitigation;
pub mod registry;
pub mod result;
pub mod status;
pub mod topology;

pub use backend::{Backend, BackendConfig, BackendFactory, ReadoutCalibration};
pub use capability::{Capabilities, STANDARD_GATES};
pub use compiled::{BitSource, ClassicalBitMap, CompiledCircuit};
pub use error::{HalError, HalResult};
pub use job::{JobId, JobResult, JobStatus, SUCCESS_MESSAGE};
pub use lifecycle::{CalibrationState, DeviceLifecycle};
pub use mapping::{QubitMapping, qubit_label};
pub use mitigation::{MAX_MITIGATION_BITS, MitigationStrategy};
pub use registry::{BackendKind, BackendRegistry};
pub use result::{Counts, remap};
pub use status::DeviceStatus;
pub use topology::{CouplingRecord, DeviceTopology, MeasError, QubitRecord};

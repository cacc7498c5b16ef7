//! devgw External-Process Backend
//!
//! Delegates execution to a configured program. Circuits may only contain
//! `rx`, `measure` and `barrier`; the `rx` angles are summed and passed to
//! the program together with the shot count:
//!
//! ```yaml
//! plugin:
//!   name: ybex
//!   backend:
//!     command: "python3 tools/rx_sampler.py {shots} {angle}"
//! ```
//!
//! The program must exit with status 0 and print one JSON object mapping
//! bitstrings to counts, e.g. `{"0": 620, "1": 380}`.

mod backend;
mod command;
mod compiler;

pub use backend::ProcessBackend;
pub use command::{CommandSpec, CommandTemplate};
pub use compiler::{PROCESS_GATES, ProcessCompiler, ProcessProgram};

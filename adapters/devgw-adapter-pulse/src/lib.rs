//! devgw Pulse Backend
//!
//! Compiles circuits over the standard gate set into channel-level pulse
//! schedules and runs them on a [`PulseEngine`]:
//!
//! ```text
//! x $q        →  play x180 on Qq
//! sx $q       →  play x90 on Qq
//! rz(θ) $q    →  vz(θ) on Qq  (+ frame correction on coupling channels)
//! cx $c, $t   →  play zx90 on Qc-Qt; vz(-π/2) on Qc; play -x90 on Qt
//! delay[d] $q →  delay of ⌈d / sampling period⌉ ticks on Qq
//! ```
//!
//! Every gate block is followed by a barrier over all channels. Which
//! coupling channels follow a virtual Z is set by [`VirtualZPolicy`].
//!
//! The backend requires readout calibration: on the first job against an
//! active device every exposed qubit gets a readout classifier, whose error
//! rates are written back to the device topology and feed the confusion
//! matrix used for linear mitigation.
//!
//! [`EmulatorEngine`] stands in for a controller. It plays the schedule on
//! the state-vector kernel and applies a per-qubit readout error model.

mod backend;
mod compiler;
mod engine;
mod schedule;

pub use backend::{MAX_CONFUSION_BITS, PulseBackend};
pub use compiler::{DEFAULT_SAMPLING_PERIOD_NS, PulseCompiler, PulseProgram, VirtualZPolicy};
pub use engine::{EmulatorConfig, EmulatorEngine, PulseEngine};
pub use schedule::{PulseSchedule, ScheduleOp, Waveform};

//! The controller seam and an emulated controller.
//!
//! [`PulseEngine`] is what the backend needs from pulse hardware: play a
//! schedule and read the qubits out, and build a readout classifier per
//! qubit. [`EmulatorEngine`] implements it on the state-vector kernel with a
//! configurable readout error model, so the full calibrate/execute/mitigate
//! path runs without a controller attached.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use devgw_adapter_sim::{SimOp, Statevector};
use devgw_hal::mitigation::AssignmentMatrix;
use devgw_hal::{Counts, HalError, HalResult, MeasError, ReadoutCalibration};

use crate::compiler::PulseProgram;
use crate::schedule::{ScheduleOp, Waveform};

/// A pulse controller.
#[async_trait]
pub trait PulseEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Play `program` and read out every qubit it touches, `shots` times.
    ///
    /// Bitstrings are indexed by virtual qubit with qubit 0 rightmost.
    async fn measure(&self, program: &PulseProgram, shots: u32) -> HalResult<Counts>;

    /// Build the readout classifier of `label` and report its error rates.
    async fn build_classifier(&self, label: &str) -> HalResult<ReadoutCalibration>;

    /// Assignment matrix of the last classifier built for `label`.
    fn assignment_matrix(&self, label: &str) -> HalResult<AssignmentMatrix>;
}

fn default_calibration_shots() -> u32 {
    10_000
}

/// Readout error model of the emulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Error rates of qubits without an entry in `readout`.
    #[serde(default)]
    pub default_readout: ReadoutCalibration,
    /// Error rates by qubit label.
    #[serde(default)]
    pub readout: BTreeMap<String, ReadoutCalibration>,
    /// Shots per prepared state when building a classifier.
    #[serde(default = "default_calibration_shots")]
    pub calibration_shots: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            default_readout: ReadoutCalibration::default(),
            readout: BTreeMap::new(),
            calibration_shots: default_calibration_shots(),
            seed: None,
        }
    }
}

/// Ideal gate-level emulation of a pulse schedule with noisy readout.
///
/// Drive channels map onto the virtual qubits of the program; `X90`/`X180`
/// become X rotations scaled by the play amplitude, a cross-resonance play
/// becomes a ZX rotation, and a virtual Z on a drive channel becomes a Z
/// rotation. Frame changes on coupling channels carry no state here.
pub struct EmulatorEngine {
    config: EmulatorConfig,
    classifiers: RwLock<FxHashMap<String, ReadoutCalibration>>,
    draws: AtomicU64,
}

impl EmulatorEngine {
    pub fn new(config: EmulatorConfig) -> Self {
        Self {
            config,
            classifiers: RwLock::new(FxHashMap::default()),
            draws: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    fn true_readout(&self, label: &str) -> ReadoutCalibration {
        self.config
            .readout
            .get(label)
            .copied()
            .unwrap_or(self.config.default_readout)
    }

    /// A fresh generator; seeded runs differ per draw but replay identically.
    fn rng(&self) -> StdRng {
        let draw = self.draws.fetch_add(1, Ordering::Relaxed);
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(draw)),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for EmulatorEngine {
    fn default() -> Self {
        Self::new(EmulatorConfig::default())
    }
}

/// Translate a schedule into kernel operations on virtual indices.
fn to_sim_ops(program: &PulseProgram) -> HalResult<Vec<SimOp>> {
    let index = |label: &str| {
        program
            .qubit_index(label)
            .ok_or_else(|| HalError::Execution(format!("channel {label} drives no program qubit")))
    };
    let coupling = |label: &str| -> HalResult<(usize, usize)> {
        let (control, target) = label
            .split_once('-')
            .ok_or_else(|| HalError::Execution(format!("{label} is not a coupling channel")))?;
        Ok((index(control)?, index(target)?))
    };

    let mut ops = Vec::with_capacity(program.schedule.len());
    for op in program.schedule.ops() {
        match op {
            ScheduleOp::Play {
                channel,
                waveform: Waveform::X90,
                scale,
            } => ops.push(SimOp::Rx(index(channel.as_str())?, FRAC_PI_2 * scale)),
            ScheduleOp::Play {
                channel,
                waveform: Waveform::X180,
                scale,
            } => ops.push(SimOp::Rx(index(channel.as_str())?, PI * scale)),
            ScheduleOp::Play {
                channel,
                waveform: Waveform::Zx90,
                scale,
            } => {
                let (c, t) = coupling(channel.as_str())?;
                ops.push(SimOp::Rzx(c, t, FRAC_PI_2 * scale));
            }
            ScheduleOp::VirtualZ { channel, angle } if !channel.contains('-') => {
                ops.push(SimOp::Rz(index(channel.as_str())?, *angle));
            }
            ScheduleOp::VirtualZ { .. } | ScheduleOp::Delay { .. } | ScheduleOp::Barrier { .. } => {}
        }
    }
    Ok(ops)
}

/// Flip each read bit according to its qubit's error rates.
fn apply_readout_error<R: Rng>(
    ideal: &Counts,
    rates: &[Option<ReadoutCalibration>],
    rng: &mut R,
) -> Counts {
    let width = rates.len();
    let mut noisy = Counts::new();
    for (bitstring, n) in ideal.iter() {
        let bits: Vec<u8> = bitstring.bytes().collect();
        for _ in 0..n {
            let mut read = bits.clone();
            for (qubit, rate) in rates.iter().enumerate() {
                let Some(rate) = rate else { continue };
                let pos = width - 1 - qubit;
                let flip = if read[pos] == b'0' {
                    rate.prob_meas1_prep0
                } else {
                    rate.prob_meas0_prep1
                };
                if flip > 0.0 && rng.gen_bool(flip.min(1.0)) {
                    read[pos] = if read[pos] == b'0' { b'1' } else { b'0' };
                }
            }
            noisy.insert(String::from_utf8_lossy(&read).into_owned(), 1);
        }
    }
    noisy
}

fn run_emulation(
    ops: &[SimOp],
    rates: &[Option<ReadoutCalibration>],
    shots: u32,
    mut rng: StdRng,
) -> HalResult<Counts> {
    let mut sv = Statevector::new(rates.len())?;
    sv.run(ops)?;
    let ideal = sv.sample_counts(shots, &mut rng)?;
    Ok(apply_readout_error(&ideal, rates, &mut rng))
}

#[async_trait]
impl PulseEngine for EmulatorEngine {
    fn name(&self) -> &str {
        "emulator"
    }

    #[instrument(skip(self, program), fields(ops = program.schedule.len()))]
    async fn measure(&self, program: &PulseProgram, shots: u32) -> HalResult<Counts> {
        let ops = to_sim_ops(program)?;
        let rates: Vec<Option<ReadoutCalibration>> = program
            .qubits
            .iter()
            .map(|q| q.as_deref().map(|label| self.true_readout(label)))
            .collect();
        let rng = self.rng();

        tokio::task::spawn_blocking(move || run_emulation(&ops, &rates, shots, rng))
            .await
            .map_err(|e| HalError::Execution(format!("emulation task failed: {e}")))?
    }

    #[instrument(skip(self))]
    async fn build_classifier(&self, label: &str) -> HalResult<ReadoutCalibration> {
        let rate = self.true_readout(label);
        let shots = self.config.calibration_shots.max(1);
        let mut rng = self.rng();

        let misread = |p: f64, rng: &mut StdRng| (0..shots).filter(|_| rng.gen_bool(p.clamp(0.0, 1.0))).count();
        let ones_from_zero = misread(rate.prob_meas1_prep0, &mut rng);
        let zeros_from_one = misread(rate.prob_meas0_prep1, &mut rng);

        let estimate = ReadoutCalibration {
            prob_meas1_prep0: ones_from_zero as f64 / f64::from(shots),
            prob_meas0_prep1: zeros_from_one as f64 / f64::from(shots),
        };
        info!(
            qubit = label,
            p10 = estimate.prob_meas1_prep0,
            p01 = estimate.prob_meas0_prep1,
            "classifier built"
        );
        self.classifiers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label.to_string(), estimate);
        Ok(estimate)
    }

    fn assignment_matrix(&self, label: &str) -> HalResult<AssignmentMatrix> {
        let classifiers = self.classifiers.read().unwrap_or_else(PoisonError::into_inner);
        let rate = classifiers
            .get(label)
            .ok_or_else(|| HalError::Execution(format!("no readout classifier for {label}")))?;
        debug!(qubit = label, "assignment matrix from classifier");
        Ok(MeasError::new(rate.prob_meas1_prep0, rate.prob_meas0_prep1).assignment_matrix())
    }
}

//! Statevector simulation engine.
//!
//! Amplitude index bit `k` is qubit `k`, so the bitstring of an outcome is its
//! index in binary with qubit 0 rightmost.

use num_complex::Complex64;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use devgw_hal::{Counts, HalError, HalResult};

/// Widest state the engine will allocate.
pub const MAX_QUBITS: usize = 28;

/// One operation on virtual qubit indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimOp {
    X(usize),
    SX(usize),
    Rx(usize, f64),
    Rz(usize, f64),
    CX(usize, usize),
    /// `exp(-i θ/2 Z⊗X)`, Z on the first qubit.
    Rzx(usize, usize, f64),
}

impl SimOp {
    fn max_qubit(&self) -> usize {
        match *self {
            SimOp::X(q) | SimOp::SX(q) | SimOp::Rx(q, _) | SimOp::Rz(q, _) => q,
            SimOp::CX(a, b) | SimOp::Rzx(a, b, _) => a.max(b),
        }
    }
}

/// A quantum state over `num_qubits` qubits.
pub struct Statevector {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
}

impl Statevector {
    /// `|0...0⟩` over `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> HalResult<Self> {
        if num_qubits > MAX_QUBITS {
            return Err(HalError::ResourceLimit {
                requested: num_qubits,
                limit: MAX_QUBITS,
            });
        }
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Ok(Self {
            amplitudes,
            num_qubits,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &SimOp) -> HalResult<()> {
        if op.max_qubit() >= self.num_qubits {
            return Err(HalError::Execution(format!(
                "{op:?} addresses a qubit outside a {}-qubit state",
                self.num_qubits
            )));
        }
        match *op {
            SimOp::X(q) => self.apply_x(q),
            SimOp::SX(q) => self.apply_rx(q, PI / 2.0),
            SimOp::Rx(q, theta) => self.apply_rx(q, theta),
            SimOp::Rz(q, theta) => self.apply_rz(q, theta),
            SimOp::CX(c, t) => self.apply_cx(c, t),
            SimOp::Rzx(c, t, theta) => self.apply_rzx(c, t, theta),
        }
        Ok(())
    }

    /// Run a sequence of operations.
    pub fn run<'a>(&mut self, ops: impl IntoIterator<Item = &'a SimOp>) -> HalResult<()> {
        ops.into_iter().try_for_each(|op| self.apply(op))
    }

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + neg_i_s * b;
                self.amplitudes[j] = neg_i_s * a + c * b;
            }
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            *amp *= if i & mask == 0 { phase_0 } else { phase_1 };
        }
    }

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                self.amplitudes.swap(i, i | tgt_mask);
            }
        }
    }

    /// Rx(θ) on the target in the control's |0⟩ subspace, Rx(-θ) in |1⟩.
    fn apply_rzx(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        for i in 0..self.amplitudes.len() {
            if i & tgt_mask != 0 {
                continue;
            }
            let sign = if i & ctrl_mask == 0 { 1.0 } else { -1.0 };
            let neg_i_s = Complex64::new(0.0, -sign * s);
            let j = i | tgt_mask;
            let a = self.amplitudes[i];
            let b = self.amplitudes[j];
            self.amplitudes[i] = c * a + neg_i_s * b;
            self.amplitudes[j] = neg_i_s * a + c * b;
        }
    }

    /// Outcome probabilities, indexed by basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Sample `shots` outcomes into bitstring counts.
    pub fn sample_counts<R: Rng + ?Sized>(&self, shots: u32, rng: &mut R) -> HalResult<Counts> {
        let dist = WeightedIndex::new(self.probabilities())
            .map_err(|e| HalError::Execution(format!("invalid state distribution: {e}")))?;

        let mut hits = vec![0u64; self.amplitudes.len()];
        for _ in 0..shots {
            hits[dist.sample(rng)] += 1;
        }

        let width = self.num_qubits;
        Ok(hits
            .into_iter()
            .enumerate()
            .filter(|(_, n)| *n > 0)
            .map(|(i, n)| (format!("{i:0width$b}"), n))
            .collect())
    }
}

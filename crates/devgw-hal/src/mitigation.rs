//! Readout-error mitigation.
//!
//! Two strategies are available:
//!
//! - [`linear_inversion`] multiplies the measured distribution by an inverse
//!   joint confusion matrix the backend provides.
//! - [`nearest_distribution`] builds a 2×2 assignment matrix per bit from the
//!   calibrated `meas_error` data, applies the per-bit inverses to get a
//!   quasi-probability distribution and projects it onto the nearest valid
//!   probability distribution (Smolin, Gambetta, Smith, PRL 108, 070502).
//!
//! Both operate on dense vectors of length `2^n`, indexed by the integer
//! value of the bitstring (bit 0 is the least significant), so `n` is capped
//! at [`MAX_MITIGATION_BITS`].
//!
//! Mitigated probabilities are turned back into counts as
//! `trunc(p * shots)`; outcomes that round to zero are dropped.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compiled::ClassicalBitMap;
use crate::error::{HalError, HalResult};
use crate::result::Counts;
use crate::topology::DeviceTopology;

/// Widest bitstring either strategy accepts.
pub const MAX_MITIGATION_BITS: usize = 32;

/// A 2×2 assignment matrix, `m[measured][prepared]`.
pub type AssignmentMatrix = [[f64; 2]; 2];

const IDENTITY: AssignmentMatrix = [[1.0, 0.0], [0.0, 1.0]];
const SINGULAR_EPS: f64 = 1e-12;

/// Which mitigation the router applies to results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MitigationStrategy {
    /// Return counts as measured.
    #[default]
    #[serde(rename = "none")]
    None,
    /// Inverse joint confusion matrix from the backend.
    #[serde(rename = "linear")]
    LinearInversion,
    /// Per-bit inversion with projection to a probability distribution.
    #[serde(rename = "nearest")]
    NearestDistribution,
}

impl FromStr for MitigationStrategy {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(MitigationStrategy::None),
            "linear" | "linear_inversion" => Ok(MitigationStrategy::LinearInversion),
            "nearest" | "nearest_distribution" => Ok(MitigationStrategy::NearestDistribution),
            other => Err(HalError::Configuration(format!(
                "unknown mitigation strategy '{other}'"
            ))),
        }
    }
}

impl fmt::Display for MitigationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MitigationStrategy::None => "none",
            MitigationStrategy::LinearInversion => "linear",
            MitigationStrategy::NearestDistribution => "nearest",
        })
    }
}

/// Reject widths the dense representation cannot hold.
pub fn check_width(num_bits: usize) -> HalResult<()> {
    if num_bits > MAX_MITIGATION_BITS {
        return Err(HalError::ResourceLimit {
            requested: num_bits,
            limit: MAX_MITIGATION_BITS,
        });
    }
    Ok(())
}

/// Per-bit assignment matrices for a compiled program, bit 0 first.
///
/// Bits no measurement writes get the identity.
pub fn assignment_matrices(
    bitmap: &ClassicalBitMap,
    topology: &DeviceTopology,
) -> HalResult<Vec<AssignmentMatrix>> {
    (0..bitmap.num_clbits())
        .map(|bit| {
            let Some(source) = bitmap.get(devgw_ir::ClbitId(bit as u32)) else {
                return Ok(IDENTITY);
            };
            topology
                .qubit(source.qubit.0)
                .map(|q| q.meas_error.assignment_matrix())
                .ok_or_else(|| HalError::InvalidQubit(source.label.clone()))
        })
        .collect()
}

/// Apply an inverse joint confusion matrix.
///
/// `inverse` must be `2^num_bits` square; the mitigated distribution is
/// `inverse · p`.
pub fn linear_inversion(
    counts: &Counts,
    num_bits: usize,
    shots: u32,
    inverse: &Array2<f64>,
) -> HalResult<Counts> {
    check_width(num_bits)?;
    let dim = 1usize << num_bits;
    if inverse.dim() != (dim, dim) {
        return Err(HalError::Execution(format!(
            "confusion matrix is {}x{}, expected {dim}x{dim}",
            inverse.nrows(),
            inverse.ncols()
        )));
    }

    let probs = probability_vector(counts, num_bits)?;
    let mitigated = inverse.dot(&probs);
    debug!(num_bits, "linear inversion applied");

    Ok(to_counts(
        mitigated.iter().enumerate().map(|(i, p)| (i, *p)),
        num_bits,
        shots,
    ))
}

/// Inverse joint confusion matrix of independent per-bit readout errors.
///
/// The joint matrix is the tensor product of the per-bit matrices, so its
/// inverse is the tensor product of the 2×2 inverses. `matrices[k]` belongs
/// to bit `k`; the result is `2^n` square. Widths above `max_bits` are
/// refused before allocating.
pub fn joint_inverse(matrices: &[AssignmentMatrix], max_bits: usize) -> HalResult<Array2<f64>> {
    let num_bits = matrices.len();
    let limit = max_bits.min(MAX_MITIGATION_BITS);
    if num_bits > limit {
        return Err(HalError::ResourceLimit {
            requested: num_bits,
            limit,
        });
    }
    let inverses = invert_all(matrices)?;

    let dim = 1usize << num_bits;
    Ok(Array2::from_shape_fn((dim, dim), |(row, col)| {
        inverses
            .iter()
            .enumerate()
            .map(|(bit, inv)| inv[(row >> bit) & 1][(col >> bit) & 1])
            .product()
    }))
}

fn invert_all(matrices: &[AssignmentMatrix]) -> HalResult<Vec<AssignmentMatrix>> {
    matrices
        .iter()
        .enumerate()
        .map(|(bit, m)| invert_2x2(m).ok_or(bit))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|bit| HalError::Execution(format!("assignment matrix of bit {bit} is singular")))
}

/// Per-bit inversion followed by projection onto the nearest distribution.
///
/// `matrices[k]` is the assignment matrix of bit `k`.
pub fn nearest_distribution(
    counts: &Counts,
    matrices: &[AssignmentMatrix],
    shots: u32,
) -> HalResult<Counts> {
    let num_bits = matrices.len();
    check_width(num_bits)?;

    let inverses = invert_all(matrices)?;

    let mut quasi = probability_vector(counts, num_bits)?;
    for (bit, inv) in inverses.iter().enumerate() {
        apply_on_bit(&mut quasi, bit, inv);
    }

    let nearest = project_to_distribution(
        quasi
            .iter()
            .enumerate()
            .filter(|(_, p)| **p != 0.0)
            .map(|(i, p)| (i, *p))
            .collect(),
    );
    debug!(num_bits, outcomes = nearest.len(), "nearest distribution applied");

    Ok(to_counts(nearest.into_iter(), num_bits, shots))
}

/// Smolin–Gambetta–Smith projection of a quasi-distribution.
///
/// Entries are visited from most negative upward; negative mass is spread
/// evenly over the entries that remain.
fn project_to_distribution(mut quasi: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
    quasi.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut remaining = quasi.len();
    let mut beta = 0.0;
    let mut out = Vec::with_capacity(quasi.len());
    for (index, value) in quasi {
        let shifted = value + beta / remaining as f64;
        if shifted < 0.0 {
            beta += value;
            remaining -= 1;
        } else {
            out.push((index, shifted));
        }
    }
    out
}

fn probability_vector(counts: &Counts, num_bits: usize) -> HalResult<Array1<f64>> {
    let dim = 1usize << num_bits;
    let mut probs = Array1::<f64>::zeros(dim);
    let total = counts.total();
    if total == 0 {
        return Ok(probs);
    }

    for (bitstring, count) in counts.iter() {
        if bitstring.len() != num_bits {
            return Err(HalError::ResultParse(format!(
                "bitstring '{bitstring}' is not {num_bits} bits wide"
            )));
        }
        let index = if num_bits == 0 {
            0
        } else {
            usize::from_str_radix(bitstring, 2)
                .map_err(|e| HalError::ResultParse(format!("bitstring '{bitstring}': {e}")))?
        };
        probs[index] += count as f64 / total as f64;
    }
    Ok(probs)
}

fn invert_2x2(m: &AssignmentMatrix) -> Option<AssignmentMatrix> {
    let [[a, b], [c, d]] = *m;
    let det = a * d - b * c;
    if det.abs() < SINGULAR_EPS {
        return None;
    }
    Some([[d / det, -b / det], [-c / det, a / det]])
}

fn apply_on_bit(vec: &mut Array1<f64>, bit: usize, m: &AssignmentMatrix) {
    let mask = 1usize << bit;
    for i in 0..vec.len() {
        if i & mask != 0 {
            continue;
        }
        let j = i | mask;
        let (v0, v1) = (vec[i], vec[j]);
        vec[i] = m[0][0] * v0 + m[0][1] * v1;
        vec[j] = m[1][0] * v0 + m[1][1] * v1;
    }
}

fn to_counts(probs: impl Iterator<Item = (usize, f64)>, num_bits: usize, shots: u32) -> Counts {
    probs
        .filter(|(_, p)| *p > 0.0)
        .map(|(i, p)| ((p * f64::from(shots)).trunc() as u64, i))
        .filter(|(c, _)| *c > 0)
        .map(|(c, i)| (format!("{i:0num_bits$b}"), c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn amat(p10: f64, p01: f64) -> AssignmentMatrix {
        [[1.0 - p10, p01], [p10, 1.0 - p01]]
    }

    #[test]
    fn test_width_limit_checked_first() {
        let counts = Counts::new();
        let matrices = vec![IDENTITY; 33];
        let err = nearest_distribution(&counts, &matrices, 100).unwrap_err();
        assert!(matches!(err, HalError::ResourceLimit { requested: 33, limit: 32 }));

        let err = linear_inversion(&counts, 40, 100, &Array2::zeros((1, 1))).unwrap_err();
        assert!(matches!(err, HalError::ResourceLimit { requested: 40, .. }));
    }

    #[test]
    fn test_identity_keeps_counts() {
        let counts: Counts = [("00", 750), ("11", 250)].into_iter().collect();
        let out = nearest_distribution(&counts, &[IDENTITY, IDENTITY], 1000).unwrap();
        assert_eq!(out.get("00"), 750);
        assert_eq!(out.get("11"), 250);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_nearest_undoes_readout_flip() {
        // Prepared |1>, half of the shots read as 0.
        let counts: Counts = [("1", 500), ("0", 500)].into_iter().collect();
        let out = nearest_distribution(&counts, &[amat(0.0, 0.5)], 1000).unwrap();
        assert_eq!(out.get("1"), 1000);
        assert_eq!(out.get("0"), 0);
    }

    #[test]
    fn test_nearest_projects_negative_mass() {
        // Observed "0" less often than the error rate predicts; the quasi
        // distribution goes negative and must be projected.
        let counts: Counts = [("1", 750), ("0", 250)].into_iter().collect();
        let out = nearest_distribution(&counts, &[amat(0.0, 0.5)], 1000).unwrap();
        assert_eq!(out.get("1"), 1000);
        assert_eq!(out.total(), 1000);
    }

    #[test]
    fn test_projection_sums_to_one() {
        let projected = project_to_distribution(vec![(0, -0.1), (1, 0.3), (2, 0.8)]);
        let sum: f64 = projected.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(projected.iter().all(|(_, p)| *p >= 0.0));
        assert!(projected.iter().all(|(i, _)| *i != 0));
    }

    #[test]
    fn test_singular_matrix() {
        let counts: Counts = [("0", 1)].into_iter().collect();
        let err = nearest_distribution(&counts, &[amat(0.5, 0.5)], 10).unwrap_err();
        assert!(matches!(err, HalError::Execution(_)));
    }

    #[test]
    fn test_bit_zero_is_rightmost() {
        // Only bit 0 has readout error: half of prepared |0> read as 1.
        let counts: Counts = [("00", 500), ("01", 500)].into_iter().collect();
        let out = nearest_distribution(&counts, &[amat(0.5, 0.0), IDENTITY], 1000).unwrap();
        assert_eq!(out.get("00"), 1000);
    }

    #[test]
    fn test_linear_inversion() {
        let counts: Counts = [("0", 75), ("1", 25)].into_iter().collect();
        let inverse = array![[1.0, 0.0], [0.0, 1.0]];
        let out = linear_inversion(&counts, 1, 200, &inverse).unwrap();
        assert_eq!(out.get("0"), 150);
        assert_eq!(out.get("1"), 50);

        let swap = array![[0.0, 1.0], [1.0, 0.0]];
        let out = linear_inversion(&counts, 1, 100, &swap).unwrap();
        assert_eq!(out.get("1"), 75);
    }

    #[test]
    fn test_linear_inversion_drops_negative() {
        let counts: Counts = [("0", 50), ("1", 50)].into_iter().collect();
        let inverse = array![[1.5, -0.5], [-1.0, 0.0]];
        let out = linear_inversion(&counts, 1, 100, &inverse).unwrap();
        assert_eq!(out.get("0"), 50);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_linear_dimension_mismatch() {
        let counts: Counts = [("00", 1)].into_iter().collect();
        let err = linear_inversion(&counts, 2, 10, &Array2::eye(2)).unwrap_err();
        assert!(matches!(err, HalError::Execution(_)));
    }

    #[test]
    fn test_joint_inverse_matches_linear_strategy() {
        let inverse = joint_inverse(&[amat(0.0, 0.5), IDENTITY], 8).unwrap();
        assert_eq!(inverse.dim(), (4, 4));
        assert_eq!(inverse[[0, 1]], -1.0);
        assert_eq!(inverse[[1, 1]], 2.0);
        assert_eq!(inverse[[2, 3]], -1.0);
        assert_eq!(inverse[[0, 2]], 0.0);

        let counts: Counts = [("01", 500), ("00", 500)].into_iter().collect();
        let out = linear_inversion(&counts, 2, 1000, &inverse).unwrap();
        assert_eq!(out.get("01"), 1000);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_joint_inverse_limits() {
        let err = joint_inverse(&[IDENTITY; 5], 4).unwrap_err();
        assert!(matches!(err, HalError::ResourceLimit { requested: 5, limit: 4 }));
        assert!(joint_inverse(&[[[0.5, 0.5], [0.5, 0.5]]], 4).is_err());
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("nearest".parse::<MitigationStrategy>().unwrap(), MitigationStrategy::NearestDistribution);
        assert_eq!("LINEAR".parse::<MitigationStrategy>().unwrap(), MitigationStrategy::LinearInversion);
        assert!("bogus".parse::<MitigationStrategy>().is_err());
        assert_eq!(MitigationStrategy::default().to_string(), "none");
    }
}

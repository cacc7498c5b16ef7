//! Measurement counts and classical-bit remapping.
//!
//! Engines report bitstrings over the qubits they ran, qubit 0 in the
//! rightmost character. Clients expect bitstrings over the classical bits of
//! their program, bit 0 rightmost. [`remap`] converts between the two using
//! the [`ClassicalBitMap`] the compiler produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compiled::ClassicalBitMap;
use crate::error::{HalError, HalResult};

/// Bitstring histogram, ordered by bitstring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts {
    counts: BTreeMap<String, u64>,
}

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `bitstring`.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.counts.entry(bitstring.into()).or_insert(0) += count;
    }

    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Drop bitstrings with a zero count.
    pub fn without_zeros(mut self) -> Self {
        self.counts.retain(|_, v| *v > 0);
        self
    }

    /// The outcome seen most often, ties resolved by bitstring order.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.iter().fold(None, |best, (k, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((k, v)),
        })
    }

    pub fn into_inner(self) -> BTreeMap<String, u64> {
        self.counts
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut counts = Counts::new();
        for (k, v) in iter {
            counts.insert(k, v);
        }
        counts
    }
}

impl From<BTreeMap<String, u64>> for Counts {
    fn from(counts: BTreeMap<String, u64>) -> Self {
        Self { counts }
    }
}

/// Rewrite engine bitstrings into classical-bit bitstrings.
///
/// Each output bit takes the value of the qubit its classical bit was
/// measured from; unassigned bits are `0`. Raw outcomes that collapse onto
/// the same output bitstring have their counts summed.
pub fn remap(raw: &Counts, bitmap: &ClassicalBitMap) -> HalResult<Counts> {
    let width = bitmap.num_clbits();
    let mut out = Counts::new();

    for (bitstring, count) in raw.iter() {
        let bits = bitstring.as_bytes();
        if let Some(bad) = bits.iter().find(|b| !matches!(b, b'0' | b'1')) {
            return Err(HalError::ResultParse(format!(
                "invalid character '{}' in bitstring '{bitstring}'",
                char::from(*bad)
            )));
        }

        let mut mapped = vec![b'0'; width];
        for (clbit, source) in bitmap.iter() {
            let q = source.qubit.index();
            if q >= bits.len() {
                return Err(HalError::ResultParse(format!(
                    "bitstring '{bitstring}' has no position for qubit {}",
                    source.qubit
                )));
            }
            mapped[width - 1 - clbit.index()] = bits[bits.len() - 1 - q];
        }

        // Only '0'/'1' bytes are ever written.
        let key = String::from_utf8_lossy(&mapped).into_owned();
        out.insert(key, count);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgw_ir::{ClbitId, QubitId};
    use proptest::prelude::*;

    #[test]
    fn test_measure_into_higher_bit() {
        let mut map = ClassicalBitMap::new(2);
        map.assign(ClbitId(1), QubitId(0), "Q00");
        let raw: Counts = [("1", 100)].into_iter().collect();

        let counts = remap(&raw, &map).unwrap();
        assert_eq!(counts.get("10"), 100);
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn test_sparse_qubits_collapse() {
        let mut map = ClassicalBitMap::new(2);
        map.assign(ClbitId(0), QubitId(0), "Q00");
        map.assign(ClbitId(1), QubitId(2), "Q02");
        let raw: Counts = [("101", 40), ("111", 10), ("000", 50)].into_iter().collect();

        let counts = remap(&raw, &map).unwrap();
        assert_eq!(counts.get("11"), 50);
        assert_eq!(counts.get("00"), 50);
        assert_eq!(counts.total(), 100);
    }

    #[test]
    fn test_short_bitstring_rejected() {
        let mut map = ClassicalBitMap::new(1);
        map.assign(ClbitId(0), QubitId(3), "Q03");
        let raw: Counts = [("1", 1)].into_iter().collect();
        assert!(matches!(remap(&raw, &map), Err(HalError::ResultParse(_))));
    }

    #[test]
    fn test_non_binary_rejected() {
        let map = ClassicalBitMap::new(1);
        let raw: Counts = [("2", 1)].into_iter().collect();
        assert!(matches!(remap(&raw, &map), Err(HalError::ResultParse(_))));
    }

    #[test]
    fn test_counts_helpers() {
        let counts: Counts = [("00", 5), ("11", 7), ("01", 0)].into_iter().collect();
        assert_eq!(counts.most_frequent(), Some(("11", 7)));
        let trimmed = counts.without_zeros();
        assert_eq!(trimmed.len(), 2);
        assert_eq!(serde_json::to_string(&trimmed).unwrap(), r#"{"00":5,"11":7}"#);
    }

    proptest! {
        /// Remapping keeps the shot total and yields keys of register width.
        #[test]
        fn prop_remap_preserves_total(
            outcomes in prop::collection::vec((0u32..16, 1u64..50), 1..20),
            width in 1usize..6,
        ) {
            let mut map = ClassicalBitMap::new(width);
            for bit in 0..width.min(4) {
                map.assign(ClbitId(bit as u32), QubitId(bit as u32), format!("Q{bit:02}"));
            }
            let mut raw = Counts::new();
            for (value, count) in &outcomes {
                raw.insert(format!("{value:04b}"), *count);
            }

            let counts = remap(&raw, &map).unwrap();
            prop_assert_eq!(counts.total(), raw.total());
            for (key, _) in counts.iter() {
                prop_assert_eq!(key.len(), width);
            }
        }
    }
}

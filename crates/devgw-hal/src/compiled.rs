//! Compiler output shared by all backends.

use std::collections::BTreeMap;

use devgw_ir::{ClbitId, QubitId};
use serde::{Deserialize, Serialize};

/// Where a classical bit's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitSource {
    /// Physical label of the measured qubit.
    pub label: String,
    /// Virtual index of the measured qubit, its position in raw bitstrings.
    pub qubit: QubitId,
}

/// Classical bit assignments collected from the measurements of a program.
///
/// A bit written twice keeps the last measurement. Bits no measurement
/// writes are absent and read as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalBitMap {
    num_clbits: usize,
    sources: BTreeMap<ClbitId, BitSource>,
}

impl ClassicalBitMap {
    /// An empty map over `num_clbits` bits.
    pub fn new(num_clbits: usize) -> Self {
        Self {
            num_clbits,
            sources: BTreeMap::new(),
        }
    }

    /// Record that `clbit` receives the measurement of `qubit`.
    pub fn assign(&mut self, clbit: ClbitId, qubit: QubitId, label: impl Into<String>) {
        self.num_clbits = self.num_clbits.max(clbit.index() + 1);
        self.sources.insert(
            clbit,
            BitSource {
                label: label.into(),
                qubit,
            },
        );
    }

    /// The source of `clbit`, if any measurement writes it.
    pub fn get(&self, clbit: ClbitId) -> Option<&BitSource> {
        self.sources.get(&clbit)
    }

    /// Width of the output bitstrings.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    /// Assigned bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (ClbitId, &BitSource)> {
        self.sources.iter().map(|(c, s)| (*c, s))
    }

    /// Labels per bit, `None` for unassigned bits, bit 0 first.
    pub fn labels_by_bit(&self) -> Vec<Option<&str>> {
        (0..self.num_clbits)
            .map(|i| self.get(ClbitId(i as u32)).map(|s| s.label.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// A program lowered for one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCircuit<P> {
    /// Backend-specific executable.
    pub program: P,
    /// Classical bit sources for result remapping.
    pub clbits: ClassicalBitMap,
    /// Width of the raw bitstrings the engine produces.
    pub num_qubits: usize,
}

impl<P> CompiledCircuit<P> {
    pub fn new(program: P, clbits: ClassicalBitMap, num_qubits: usize) -> Self {
        Self {
            program,
            clbits,
            num_qubits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut map = ClassicalBitMap::new(2);
        map.assign(ClbitId(1), QubitId(0), "Q05");
        map.assign(ClbitId(1), QubitId(2), "Q07");

        assert_eq!(map.get(ClbitId(1)).unwrap().qubit, QubitId(2));
        assert_eq!(map.labels_by_bit(), vec![None, Some("Q07")]);
    }

    #[test]
    fn test_width_grows_with_assignment() {
        let mut map = ClassicalBitMap::new(0);
        assert!(map.is_empty());
        map.assign(ClbitId(3), QubitId(0), "Q00");
        assert_eq!(map.num_clbits(), 4);
    }
}

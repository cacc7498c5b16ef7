//! Virtual-to-physical qubit mapping.
//!
//! Programs address qubits as `$0..$N-1`; the device names them by label
//! (`Q05`, `Q64`). The mapping is a bijection derived from the topology:
//! virtual index `i` is the qubit record with `id == i`, and its label is
//! `Q{physical_id:02}`.

use rustc_hash::{FxHashMap, FxHashSet};

use devgw_ir::QubitId;

use crate::error::{HalError, HalResult};
use crate::topology::DeviceTopology;

/// Render a physical id as a device label.
pub fn qubit_label(physical_id: u32) -> String {
    format!("Q{physical_id:02}")
}

/// Lookup tables between virtual indices, labels and couplings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QubitMapping {
    labels: Vec<String>,
    by_label: FxHashMap<String, QubitId>,
    couplings: Vec<(QubitId, QubitId)>,
    coupling_set: FxHashSet<(QubitId, QubitId)>,
    coupling_labels: Vec<String>,
}

impl QubitMapping {
    /// Build the mapping from a validated topology.
    pub fn from_topology(topology: &DeviceTopology) -> HalResult<Self> {
        let n = topology.num_qubits();
        let mut labels = vec![String::new(); n];
        let mut by_label = FxHashMap::default();

        for q in &topology.qubits {
            let slot = labels
                .get_mut(q.id as usize)
                .ok_or_else(|| HalError::Mapping(format!("qubit id {} outside 0..{n}", q.id)))?;
            let label = qubit_label(q.physical_id);
            if by_label.insert(label.clone(), QubitId(q.id)).is_some() {
                return Err(HalError::Mapping(format!("duplicate label {label}")));
            }
            *slot = label;
        }

        let mut couplings = Vec::with_capacity(topology.couplings.len());
        let mut coupling_labels = Vec::with_capacity(topology.couplings.len());
        for c in &topology.couplings {
            let (control, target) = (QubitId(c.control), QubitId(c.target));
            let (Some(cl), Some(tl)) = (labels.get(control.index()), labels.get(target.index()))
            else {
                return Err(HalError::Mapping(format!(
                    "coupling {}-{} references an unknown qubit",
                    c.control, c.target
                )));
            };
            coupling_labels.push(format!("{cl}-{tl}"));
            couplings.push((control, target));
        }

        let coupling_set = couplings.iter().copied().collect();
        Ok(Self {
            labels,
            by_label,
            couplings,
            coupling_set,
            coupling_labels,
        })
    }

    /// Label of virtual qubit `qubit`.
    pub fn physical_label(&self, qubit: QubitId) -> HalResult<&str> {
        self.labels
            .get(qubit.index())
            .map(String::as_str)
            .ok_or_else(|| HalError::InvalidQubit(qubit.to_string()))
    }

    /// Virtual index of the qubit with `label`.
    pub fn physical_index(&self, label: &str) -> HalResult<QubitId> {
        self.by_label
            .get(label)
            .copied()
            .ok_or_else(|| HalError::InvalidQubit(label.to_string()))
    }

    /// Label of the coupling `control`-`target`, if the device has it.
    pub fn coupling_label(&self, control: QubitId, target: QubitId) -> HalResult<String> {
        let cl = self.physical_label(control)?;
        let tl = self.physical_label(target)?;
        if !self.has_coupling(control, target) {
            return Err(HalError::InvalidCoupling {
                control: cl.to_string(),
                target: tl.to_string(),
            });
        }
        Ok(format!("{cl}-{tl}"))
    }

    /// Whether the directed coupling `control`-`target` exists.
    pub fn has_coupling(&self, control: QubitId, target: QubitId) -> bool {
        self.coupling_set.contains(&(control, target))
    }

    /// All labels in virtual order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// All coupling labels in topology order.
    pub fn coupling_labels(&self) -> &[String] {
        &self.coupling_labels
    }

    /// All couplings as virtual index pairs, in topology order.
    pub fn couplings(&self) -> &[(QubitId, QubitId)] {
        &self.couplings
    }

    pub fn num_qubits(&self) -> usize {
        self.labels.len()
    }
}

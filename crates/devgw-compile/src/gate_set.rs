//! Closed gate sets and program validation.

use rustc_hash::FxHashSet;
use tracing::debug;

use devgw_hal::{Capabilities, STANDARD_GATES};
use devgw_ir::Circuit;

use crate::error::{CompileError, CompileResult};

/// The operations a backend accepts, by name.
///
/// Names cover gates and the non-gate operations `measure`, `barrier`,
/// `delay` and `reset` alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSet {
    names: FxHashSet<String>,
}

impl GateSet {
    /// A gate set from a list of names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// `rz`, `sx`, `x`, `cx`, `measure`, `barrier`, `delay`.
    pub fn standard() -> Self {
        Self::new(STANDARD_GATES.iter().copied())
    }

    /// The gate set a backend declares.
    pub fn from_capabilities(capabilities: &Capabilities) -> Self {
        Self::new(capabilities.gates.iter().cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check every instruction of `circuit`.
    ///
    /// Reports the first unsupported operation in program order.
    pub fn validate(&self, circuit: &Circuit) -> CompileResult<()> {
        if let Some(inst) = circuit
            .instructions()
            .iter()
            .find(|inst| !self.contains(inst.name()))
        {
            debug!(name = inst.name(), "rejecting unsupported operation");
            return Err(CompileError::UnsupportedInstruction {
                name: inst.name().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for GateSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devgw_ir::{ClbitId, QubitId};

    #[test]
    fn test_standard_accepts_bell() {
        let circuit = Circuit::bell().unwrap();
        assert!(GateSet::standard().validate(&circuit).is_ok());
    }

    #[test]
    fn test_first_unsupported_reported() {
        let mut circuit = Circuit::with_size("c", 2, 1);
        circuit.sx(QubitId(0)).unwrap();
        circuit.reset(QubitId(1)).unwrap();
        circuit.rx(1.0, QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();

        let err = GateSet::standard().validate(&circuit).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedInstruction { ref name } if name == "reset"));
    }

    #[test]
    fn test_custom_set() {
        let set = GateSet::new(["rx", "measure", "barrier"]);
        assert_eq!(set.names(), vec!["barrier", "measure", "rx"]);

        let mut circuit = Circuit::with_size("c", 1, 1);
        circuit.rx(0.5, QubitId(0)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        assert!(set.validate(&circuit).is_ok());

        circuit.sx(QubitId(0)).unwrap();
        assert!(set.validate(&circuit).is_err());
    }
}

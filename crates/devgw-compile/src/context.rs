//! Per-compilation state shared by all backend compilers.

use devgw_hal::{Capabilities, ClassicalBitMap, QubitMapping};
use devgw_ir::{ClbitId, ParameterExpression, QubitId};

use crate::error::{CompileError, CompileResult};

/// Resolves virtual qubits and collects classical-bit assignments while a
/// compiler walks a circuit.
#[derive(Debug)]
pub struct LoweringContext<'a> {
    mapping: &'a QubitMapping,
    capabilities: &'a Capabilities,
    clbits: ClassicalBitMap,
}

impl<'a> LoweringContext<'a> {
    pub fn new(mapping: &'a QubitMapping, capabilities: &'a Capabilities, num_clbits: usize) -> Self {
        Self {
            mapping,
            capabilities,
            clbits: ClassicalBitMap::new(num_clbits),
        }
    }

    pub fn mapping(&self) -> &'a QubitMapping {
        self.mapping
    }

    /// Physical label of `qubit`.
    ///
    /// Fails when the index is outside the topology or the label is not
    /// exposed by the backend.
    pub fn resolve(&self, qubit: QubitId) -> CompileResult<&'a str> {
        let label = self
            .mapping
            .physical_label(qubit)
            .map_err(|_| CompileError::InvalidQubit(qubit.to_string()))?;
        if !self.capabilities.exposes(label) {
            return Err(CompileError::InvalidQubit(format!("{qubit} ({label})")));
        }
        Ok(label)
    }

    /// Coupling label for a two-qubit gate, checking both endpoints.
    pub fn resolve_coupling(&self, control: QubitId, target: QubitId) -> CompileResult<String> {
        let cl = self.resolve(control)?;
        let tl = self.resolve(target)?;
        if !self.mapping.has_coupling(control, target) {
            return Err(CompileError::InvalidCoupling {
                control: cl.to_string(),
                target: tl.to_string(),
            });
        }
        Ok(format!("{cl}-{tl}"))
    }

    /// Record `clbit = measure qubit`, returning the qubit's label.
    pub fn record_measure(&mut self, qubit: QubitId, clbit: ClbitId) -> CompileResult<&'a str> {
        let label = self.resolve(qubit)?;
        self.clbits.assign(clbit, qubit, label);
        Ok(label)
    }

    pub fn into_clbits(self) -> ClassicalBitMap {
        self.clbits
    }
}

/// Evaluate a rotation angle to radians.
pub fn angle(param: &ParameterExpression) -> CompileResult<f64> {
    param
        .as_f64()
        .ok_or_else(|| CompileError::UnresolvedParameter(param.to_string()))
}

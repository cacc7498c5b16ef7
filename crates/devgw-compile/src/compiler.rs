//! The compiler seam backends implement.

use tracing::debug;

use devgw_hal::{Capabilities, CompiledCircuit, QubitMapping};
use devgw_ir::Circuit;

use crate::context::LoweringContext;
use crate::error::CompileResult;
use crate::gate_set::GateSet;

/// Lowers circuits into a backend's executable form.
///
/// Implementors provide [`lower`](Self::lower); [`compile`](Self::compile)
/// validates the whole circuit against the gate set first, so lowering
/// never starts on a program that would be rejected halfway.
pub trait CircuitCompiler: Send + Sync {
    /// The executable form.
    type Output;

    fn name(&self) -> &str;

    fn gate_set(&self) -> &GateSet;

    /// Walk a validated circuit, resolving qubits and recording
    /// measurements through `ctx`.
    fn lower(&self, circuit: &Circuit, ctx: &mut LoweringContext<'_>) -> CompileResult<Self::Output>;

    /// Validate, then lower.
    fn compile(
        &self,
        circuit: &Circuit,
        mapping: &QubitMapping,
        capabilities: &Capabilities,
    ) -> CompileResult<CompiledCircuit<Self::Output>> {
        self.gate_set().validate(circuit)?;

        let mut ctx = LoweringContext::new(mapping, capabilities, circuit.num_clbits());
        let program = self.lower(circuit, &mut ctx)?;
        debug!(
            compiler = self.name(),
            instructions = circuit.len(),
            "circuit lowered"
        );
        Ok(CompiledCircuit::new(
            program,
            ctx.into_clbits(),
            circuit.num_qubits(),
        ))
    }
}

//! The closed set of backends the server can run.

use async_trait::async_trait;
use ndarray::Array2;

use devgw_adapter_process::{ProcessBackend, ProcessProgram};
use devgw_adapter_pulse::{PulseBackend, PulseProgram};
use devgw_adapter_sim::{SimOp, SimulatorBackend};
use devgw_hal::{
    Backend, BackendFactory, BackendKind, BackendRegistry, Capabilities, CompiledCircuit, Counts,
    HalError, HalResult, QubitMapping, ReadoutCalibration,
};
use devgw_ir::Circuit;

/// One of the backends in [`BackendKind`].
pub enum GatewayBackend {
    Simulator(SimulatorBackend),
    Pulse(PulseBackend),
    Process(ProcessBackend),
}

/// A program compiled by one of the [`GatewayBackend`] variants.
#[derive(Debug, Clone)]
pub enum GatewayProgram {
    Simulator(CompiledCircuit<Vec<SimOp>>),
    Pulse(CompiledCircuit<PulseProgram>),
    Process(CompiledCircuit<ProcessProgram>),
}

impl GatewayBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            GatewayBackend::Simulator(_) => BackendKind::Simulator,
            GatewayBackend::Pulse(_) => BackendKind::Pulse,
            GatewayBackend::Process(_) => BackendKind::Process,
        }
    }
}

fn wrap<P>(
    compiled: CompiledCircuit<P>,
    variant: fn(CompiledCircuit<P>) -> GatewayProgram,
) -> CompiledCircuit<GatewayProgram> {
    let clbits = compiled.clbits.clone();
    let num_qubits = compiled.num_qubits;
    CompiledCircuit::new(variant(compiled), clbits, num_qubits)
}

#[async_trait]
impl Backend for GatewayBackend {
    type Program = GatewayProgram;

    fn name(&self) -> &str {
        match self {
            GatewayBackend::Simulator(b) => b.name(),
            GatewayBackend::Pulse(b) => b.name(),
            GatewayBackend::Process(b) => b.name(),
        }
    }

    fn capabilities(&self) -> &Capabilities {
        match self {
            GatewayBackend::Simulator(b) => b.capabilities(),
            GatewayBackend::Pulse(b) => b.capabilities(),
            GatewayBackend::Process(b) => b.capabilities(),
        }
    }

    fn compile(
        &self,
        circuit: &Circuit,
        mapping: &QubitMapping,
    ) -> HalResult<CompiledCircuit<GatewayProgram>> {
        Ok(match self {
            GatewayBackend::Simulator(b) => wrap(b.compile(circuit, mapping)?, GatewayProgram::Simulator),
            GatewayBackend::Pulse(b) => wrap(b.compile(circuit, mapping)?, GatewayProgram::Pulse),
            GatewayBackend::Process(b) => wrap(b.compile(circuit, mapping)?, GatewayProgram::Process),
        })
    }

    async fn calibrate_qubit(&self, label: &str) -> HalResult<ReadoutCalibration> {
        match self {
            GatewayBackend::Simulator(b) => b.calibrate_qubit(label).await,
            GatewayBackend::Pulse(b) => b.calibrate_qubit(label).await,
            GatewayBackend::Process(b) => b.calibrate_qubit(label).await,
        }
    }

    async fn execute(&self, compiled: &CompiledCircuit<GatewayProgram>, shots: u32) -> HalResult<Counts> {
        match (self, &compiled.program) {
            (GatewayBackend::Simulator(b), GatewayProgram::Simulator(inner)) => b.execute(inner, shots).await,
            (GatewayBackend::Pulse(b), GatewayProgram::Pulse(inner)) => b.execute(inner, shots).await,
            (GatewayBackend::Process(b), GatewayProgram::Process(inner)) => b.execute(inner, shots).await,
            _ => Err(HalError::Execution(format!(
                "program was not compiled by backend '{}'",
                self.name()
            ))),
        }
    }

    fn inverse_confusion_matrix(&self, labels: &[Option<&str>]) -> HalResult<Array2<f64>> {
        match self {
            GatewayBackend::Simulator(b) => b.inverse_confusion_matrix(labels),
            GatewayBackend::Pulse(b) => b.inverse_confusion_matrix(labels),
            GatewayBackend::Process(b) => b.inverse_confusion_matrix(labels),
        }
    }
}

/// A registry with a factory for every [`BackendKind`].
pub fn gateway_registry() -> BackendRegistry<GatewayBackend> {
    let mut registry = BackendRegistry::new();
    registry.register_factory(BackendKind::Simulator, |config| {
        SimulatorBackend::from_config(config).map(GatewayBackend::Simulator)
    });
    registry.register_factory(BackendKind::Pulse, |config| {
        PulseBackend::from_config(config).map(GatewayBackend::Pulse)
    });
    registry.register_factory(BackendKind::Process, |config| {
        ProcessBackend::from_config(config).map(GatewayBackend::Process)
    });
    registry
}

//! External-process backend implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use devgw_compile::CircuitCompiler;
use devgw_hal::{
    Backend, BackendConfig, BackendFactory, Capabilities, CompiledCircuit, Counts, HalError,
    HalResult, QubitMapping,
};
use devgw_ir::Circuit;

use crate::command::{CommandSpec, CommandTemplate};
use crate::compiler::{PROCESS_GATES, ProcessCompiler, ProcessProgram};

/// Runs one external program per job.
///
/// The program receives the shot count and the accumulated `rx` angle
/// through its arguments and prints a JSON object of counts on stdout.
/// The child is killed if the job is dropped before it exits.
pub struct ProcessBackend {
    capabilities: Capabilities,
    compiler: ProcessCompiler,
    command: CommandTemplate,
    working_dir: Option<PathBuf>,
}

impl ProcessBackend {
    pub fn new(command: CommandTemplate) -> Self {
        Self {
            capabilities: Capabilities::hardware("process")
                .with_gates(PROCESS_GATES)
                .with_calibration(false),
            compiler: ProcessCompiler::new(),
            command,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_exposed_qubits(mut self, labels: Vec<String>) -> Self {
        self.capabilities = self.capabilities.with_exposed_qubits(labels);
        self
    }

    pub fn command(&self) -> &CommandTemplate {
        &self.command
    }
}

/// Parse the program's stdout into counts summing to `shots`.
fn parse_counts(stdout: &str, shots: u32) -> HalResult<Counts> {
    let raw: BTreeMap<String, u64> = serde_json::from_str(stdout.trim())
        .map_err(|e| HalError::ResultParse(format!("external program output: {e}")))?;

    if let Some(key) = raw
        .keys()
        .find(|k| k.is_empty() || !k.bytes().all(|b| b == b'0' || b == b'1'))
    {
        return Err(HalError::ResultParse(format!("'{key}' is not a bitstring")));
    }

    let counts = Counts::from(raw);
    if counts.total() != u64::from(shots) {
        return Err(HalError::ResultParse(format!(
            "external program returned {} outcomes for {shots} shots",
            counts.total()
        )));
    }
    Ok(counts)
}

#[async_trait]
impl Backend for ProcessBackend {
    type Program = ProcessProgram;

    fn name(&self) -> &str {
        &self.capabilities.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn compile(&self, circuit: &Circuit, mapping: &QubitMapping) -> HalResult<CompiledCircuit<ProcessProgram>> {
        Ok(self.compiler.compile(circuit, mapping, &self.capabilities)?)
    }

    #[instrument(skip(self, compiled), fields(program = self.command.program()))]
    async fn execute(&self, compiled: &CompiledCircuit<ProcessProgram>, shots: u32) -> HalResult<Counts> {
        let args = self.command.render(shots, compiled.program.angle);
        debug!(?args, "starting external program");

        let mut command = Command::new(self.command.program());
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| {
            HalError::Execution(format!("cannot start '{}': {e}", self.command.program()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HalError::Execution(format!(
                "external program exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(stdout = %stdout.trim(), "external program finished");
        parse_counts(&stdout, shots)
    }
}

impl BackendFactory for ProcessBackend {
    /// Options: `command` (required), `working_dir`, `exposed_qubits`.
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let spec = config
            .parse_option::<CommandSpec>("command")?
            .ok_or_else(|| HalError::Configuration("plugin.backend.command is missing".into()))?;

        let mut backend = Self::new(CommandTemplate::from_spec(spec)?);
        backend.capabilities.name = config.name.clone();
        if let Some(dir) = config.parse_option::<PathBuf>("working_dir")? {
            backend = backend.with_working_dir(dir);
        }
        if let Some(labels) = config.parse_option::<Vec<String>>("exposed_qubits")? {
            backend = backend.with_exposed_qubits(labels);
        }
        Ok(backend)
    }
}

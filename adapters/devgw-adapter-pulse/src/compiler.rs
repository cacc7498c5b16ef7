//! Lowering circuits to pulse schedules.

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use devgw_compile::{
    CircuitCompiler, CompileError, CompileResult, GateSet, LoweringContext, angle, delay_to_ticks,
};
use devgw_hal::HalError;
use devgw_ir::{Circuit, InstructionKind, QubitId, StandardGate};

use crate::schedule::{PulseSchedule, Waveform};

/// Default controller sampling period.
pub const DEFAULT_SAMPLING_PERIOD_NS: f64 = 2.0;

/// Which cross-resonance channels receive the frame correction of an `rz`.
///
/// A virtual Z on qubit `q` shifts the frame of `q`; coupling channels that
/// drive at `q`'s frequency (those whose target is `q`) must shift with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualZPolicy {
    /// Every coupling the circuit uses anywhere.
    #[default]
    UsedCouplings,
    /// Only couplings whose first use precedes the `rz`.
    PrecedingCouplings,
    /// No correction.
    Disabled,
}

impl FromStr for VirtualZPolicy {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "used_couplings" | "used" => Ok(Self::UsedCouplings),
            "preceding_couplings" | "preceding" => Ok(Self::PrecedingCouplings),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(HalError::Configuration(format!(
                "unknown virtual-Z policy '{other}'"
            ))),
        }
    }
}

impl fmt::Display for VirtualZPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UsedCouplings => "used_couplings",
            Self::PrecedingCouplings => "preceding_couplings",
            Self::Disabled => "disabled",
        })
    }
}

/// A compiled pulse program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseProgram {
    pub schedule: PulseSchedule,
    /// Physical label of each virtual qubit the program touches, by index.
    pub qubits: Vec<Option<String>>,
}

impl PulseProgram {
    /// Virtual index of the qubit driven by `label`.
    pub fn qubit_index(&self, label: &str) -> Option<usize> {
        self.qubits.iter().position(|q| q.as_deref() == Some(label))
    }
}

/// A coupling the circuit drives, with the instruction index of its first use.
#[derive(Debug)]
struct UsedCoupling {
    label: String,
    target: String,
    first_use: usize,
}

/// Compiles circuits over the standard gate set into pulse schedules.
#[derive(Debug, Clone)]
pub struct PulseCompiler {
    gates: GateSet,
    policy: VirtualZPolicy,
    sampling_period_ns: f64,
}

impl PulseCompiler {
    pub fn new(gates: GateSet) -> Self {
        Self {
            gates,
            policy: VirtualZPolicy::default(),
            sampling_period_ns: DEFAULT_SAMPLING_PERIOD_NS,
        }
    }

    pub fn with_policy(mut self, policy: VirtualZPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sampling_period(mut self, ns: f64) -> Self {
        self.sampling_period_ns = ns;
        self
    }

    pub fn policy(&self) -> VirtualZPolicy {
        self.policy
    }

    pub fn sampling_period_ns(&self) -> f64 {
        self.sampling_period_ns
    }

    /// Resolve every coupling up front; an absent one aborts compilation.
    fn used_couplings(
        &self,
        circuit: &Circuit,
        ctx: &LoweringContext<'_>,
    ) -> CompileResult<Vec<UsedCoupling>> {
        let mut used: Vec<UsedCoupling> = Vec::new();
        for (index, inst) in circuit.instructions().iter().enumerate() {
            let is_cx = inst
                .as_gate()
                .and_then(|g| g.as_standard())
                .is_some_and(|g| matches!(g, StandardGate::CX));
            if !is_cx {
                continue;
            }
            let label = ctx.resolve_coupling(inst.qubits[0], inst.qubits[1])?;
            if used.iter().all(|c| c.label != label) {
                used.push(UsedCoupling {
                    label,
                    target: ctx.resolve(inst.qubits[1])?.to_string(),
                    first_use: index,
                });
            }
        }
        Ok(used)
    }

    /// Coupling channels an `rz` on `target` at instruction `index` must also rotate.
    fn corrections<'c>(
        &self,
        couplings: &'c [UsedCoupling],
        target: &str,
        index: usize,
    ) -> Vec<&'c str> {
        couplings
            .iter()
            .filter(|c| c.target == target)
            .filter(|c| match self.policy {
                VirtualZPolicy::UsedCouplings => true,
                VirtualZPolicy::PrecedingCouplings => c.first_use < index,
                VirtualZPolicy::Disabled => false,
            })
            .map(|c| c.label.as_str())
            .collect()
    }
}

impl Default for PulseCompiler {
    fn default() -> Self {
        Self::new(GateSet::standard())
    }
}

/// Tracks which virtual qubits the schedule touches.
struct Touched<'a> {
    qubits: Vec<Option<String>>,
    order: Vec<&'a str>,
}

impl<'a> Touched<'a> {
    fn new(num_qubits: usize) -> Self {
        Self {
            qubits: vec![None; num_qubits],
            order: Vec::new(),
        }
    }

    fn touch(&mut self, qubit: QubitId, label: &'a str) {
        let index = qubit.index();
        if index >= self.qubits.len() {
            self.qubits.resize(index + 1, None);
        }
        if self.qubits[index].is_none() {
            self.qubits[index] = Some(label.to_string());
            self.order.push(label);
        }
    }

    fn so_far(&self) -> Vec<String> {
        self.order.iter().map(|l| l.to_string()).collect()
    }
}

impl CircuitCompiler for PulseCompiler {
    type Output = PulseProgram;

    fn name(&self) -> &str {
        "pulse"
    }

    fn gate_set(&self) -> &GateSet {
        &self.gates
    }

    fn lower(&self, circuit: &Circuit, ctx: &mut LoweringContext<'_>) -> CompileResult<PulseProgram> {
        let couplings = self.used_couplings(circuit, ctx)?;

        let mut touched = Touched::new(circuit.num_qubits());
        for inst in circuit.instructions() {
            if matches!(inst.kind, InstructionKind::Barrier) {
                continue;
            }
            for q in &inst.qubits {
                touched.touch(*q, ctx.resolve(*q)?);
            }
        }

        let mut channels: Vec<String> = touched.qubits.iter().flatten().cloned().collect();
        let mut coupling_channels: Vec<String> = couplings.iter().map(|c| c.label.clone()).collect();
        coupling_channels.sort();
        channels.extend(coupling_channels);
        debug!(?channels, policy = %self.policy, "pulse schedule channels");

        let mut schedule = PulseSchedule::new(channels);
        let mut fenced = Touched::new(circuit.num_qubits());

        for (index, inst) in circuit.instructions().iter().enumerate() {
            match &inst.kind {
                InstructionKind::Measure => {
                    ctx.record_measure(inst.qubits[0], inst.clbits[0])?;
                }
                InstructionKind::Barrier => {
                    let channels = if inst.qubits.is_empty() {
                        fenced.so_far()
                    } else {
                        inst.qubits
                            .iter()
                            .map(|q| ctx.resolve(*q).map(str::to_string))
                            .collect::<CompileResult<Vec<_>>>()?
                    };
                    if !channels.is_empty() {
                        schedule.barrier(channels);
                    }
                }
                InstructionKind::Delay(duration) => {
                    let ticks = delay_to_ticks(duration, self.sampling_period_ns)?;
                    for q in &inst.qubits {
                        let label = ctx.resolve(*q)?;
                        fenced.touch(*q, label);
                        schedule.delay(label, ticks);
                    }
                }
                InstructionKind::Gate(gate) => {
                    let standard = gate.as_standard().ok_or_else(|| {
                        CompileError::UnsupportedInstruction {
                            name: gate.name().to_string(),
                        }
                    })?;
                    let label = ctx.resolve(inst.qubits[0])?;
                    fenced.touch(inst.qubits[0], label);

                    match standard {
                        StandardGate::X => {
                            schedule.play(label, Waveform::X180);
                        }
                        StandardGate::SX => {
                            schedule.play(label, Waveform::X90);
                        }
                        StandardGate::Rz(theta) => {
                            let theta = angle(theta)?;
                            let extra = self.corrections(&couplings, label, index);
                            if extra.is_empty() {
                                schedule.virtual_z(label, theta);
                            } else {
                                let fence: Vec<String> = std::iter::once(label)
                                    .chain(extra.iter().copied())
                                    .map(str::to_string)
                                    .collect();
                                schedule.barrier(fence.clone());
                                for channel in &fence {
                                    schedule.virtual_z(channel.as_str(), theta);
                                }
                                schedule.barrier(fence);
                            }
                        }
                        StandardGate::CX => {
                            let target = ctx.resolve(inst.qubits[1])?;
                            fenced.touch(inst.qubits[1], target);
                            let coupling = ctx.resolve_coupling(inst.qubits[0], inst.qubits[1])?;
                            schedule
                                .play(coupling, Waveform::Zx90)
                                .virtual_z(label, -FRAC_PI_2)
                                .play_scaled(target, Waveform::X90, -1.0);
                        }
                        StandardGate::Rx(_) => {
                            return Err(CompileError::UnsupportedInstruction {
                                name: standard.name().to_string(),
                            });
                        }
                    }
                    trace!(gate = standard.name(), qubit = label, "lowered");
                    schedule.barrier_all();
                }
                InstructionKind::Reset => {
                    return Err(CompileError::UnsupportedInstruction {
                        name: inst.name().to_string(),
                    });
                }
            }
        }

        Ok(PulseProgram {
            schedule,
            qubits: touched.qubits,
        })
    }
}

//! Channel-level pulse schedules.
//!
//! A schedule is an ordered list of operations on named channels. Qubit
//! drive channels carry the qubit label (`Q05`); cross-resonance channels
//! carry the coupling label (`Q05-Q06`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Calibrated waveforms the controller knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    /// π/2 rotation about X.
    X90,
    /// π rotation about X.
    X180,
    /// Cross-resonance drive producing a ZX(π/2) interaction.
    Zx90,
}

impl Waveform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::X90 => "x90",
            Waveform::X180 => "x180",
            Waveform::Zx90 => "zx90",
        }
    }
}

/// One schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScheduleOp {
    /// Play a waveform with an amplitude scale (`-1.0` inverts it).
    Play {
        channel: String,
        waveform: Waveform,
        scale: f64,
    },
    /// Frame change on a channel.
    VirtualZ { channel: String, angle: f64 },
    /// Idle for a number of sampling ticks.
    Delay { channel: String, ticks: u64 },
    /// Align the listed channels. Empty means every channel.
    Barrier { channels: Vec<String> },
}

impl fmt::Display for ScheduleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleOp::Play {
                channel,
                waveform,
                scale,
            } => {
                if *scale == 1.0 {
                    write!(f, "play {} {channel}", waveform.as_str())
                } else {
                    write!(f, "play {}*{scale} {channel}", waveform.as_str())
                }
            }
            ScheduleOp::VirtualZ { channel, angle } => write!(f, "vz({angle}) {channel}"),
            ScheduleOp::Delay { channel, ticks } => write!(f, "delay[{ticks}] {channel}"),
            ScheduleOp::Barrier { channels } if channels.is_empty() => write!(f, "barrier"),
            ScheduleOp::Barrier { channels } => write!(f, "barrier {}", channels.join(", ")),
        }
    }
}

/// An ordered pulse schedule over a fixed set of channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseSchedule {
    channels: Vec<String>,
    ops: Vec<ScheduleOp>,
}

impl PulseSchedule {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            ops: Vec::new(),
        }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn ops(&self) -> &[ScheduleOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn play(&mut self, channel: impl Into<String>, waveform: Waveform) -> &mut Self {
        self.play_scaled(channel, waveform, 1.0)
    }

    pub fn play_scaled(&mut self, channel: impl Into<String>, waveform: Waveform, scale: f64) -> &mut Self {
        self.ops.push(ScheduleOp::Play {
            channel: channel.into(),
            waveform,
            scale,
        });
        self
    }

    pub fn virtual_z(&mut self, channel: impl Into<String>, angle: f64) -> &mut Self {
        self.ops.push(ScheduleOp::VirtualZ {
            channel: channel.into(),
            angle,
        });
        self
    }

    pub fn delay(&mut self, channel: impl Into<String>, ticks: u64) -> &mut Self {
        self.ops.push(ScheduleOp::Delay {
            channel: channel.into(),
            ticks,
        });
        self
    }

    pub fn barrier(&mut self, channels: Vec<String>) -> &mut Self {
        self.ops.push(ScheduleOp::Barrier { channels });
        self
    }

    /// Barrier over every channel.
    pub fn barrier_all(&mut self) -> &mut Self {
        self.barrier(Vec::new())
    }

    /// Total delay ticks placed on `channel`.
    pub fn delay_ticks(&self, channel: &str) -> u64 {
        self.ops
            .iter()
            .filter_map(|op| match op {
                ScheduleOp::Delay { channel: c, ticks } if c == channel => Some(*ticks),
                _ => None,
            })
            .sum()
    }
}

impl fmt::Display for PulseSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "schedule [{}]", self.channels.join(", "))?;
        for op in &self.ops {
            writeln!(f, "  {op}")?;
        }
        Ok(())
    }
}

//! Durations for `delay` instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};

/// Unit of a duration literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Backend sampling ticks.
    Dt,
    /// Nanoseconds.
    Ns,
    /// Microseconds.
    Us,
    /// Milliseconds.
    Ms,
    /// Seconds.
    S,
}

impl TimeUnit {
    /// Parse a unit suffix (`ns`, `us`, `µs`, `ms`, `s`, `dt`).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "dt" => Some(TimeUnit::Dt),
            "ns" => Some(TimeUnit::Ns),
            "us" | "µs" => Some(TimeUnit::Us),
            "ms" => Some(TimeUnit::Ms),
            "s" => Some(TimeUnit::S),
            _ => None,
        }
    }

    /// Nanoseconds per unit, or `None` for device ticks.
    pub fn nanoseconds(self) -> Option<f64> {
        match self {
            TimeUnit::Dt => None,
            TimeUnit::Ns => Some(1.0),
            TimeUnit::Us => Some(1e3),
            TimeUnit::Ms => Some(1e6),
            TimeUnit::S => Some(1e9),
        }
    }

    /// The suffix used when printing.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Dt => "dt",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        }
    }
}

/// A non-negative duration with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    /// Magnitude.
    pub value: f64,
    /// Unit.
    pub unit: TimeUnit,
}

impl Duration {
    /// Create a duration, rejecting negative or non-finite magnitudes.
    pub fn new(value: f64, unit: TimeUnit) -> IrResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(IrError::InvalidDuration(format!("{value}{}", unit.suffix())));
        }
        Ok(Self { value, unit })
    }

    /// Shorthand for a nanosecond duration.
    pub fn ns(value: f64) -> IrResult<Self> {
        Self::new(value, TimeUnit::Ns)
    }

    /// Shorthand for a duration in device ticks.
    pub fn dt(ticks: u64) -> Self {
        Self {
            value: ticks as f64,
            unit: TimeUnit::Dt,
        }
    }

    /// Duration in nanoseconds. `None` when expressed in device ticks.
    pub fn as_nanoseconds(&self) -> Option<f64> {
        self.unit.nanoseconds().map(|scale| self.value * scale)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

//! Device operational status.
//!
//! Operators flip the device between states by editing a one-word text file;
//! it is read on every request.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Operational state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    /// Accepting jobs; calibration may run.
    Active,
    /// Rejecting jobs.
    Inactive,
    /// Accepting jobs without calibrating.
    Maintenance,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Active => "ACTIVE",
            DeviceStatus::Inactive => "INACTIVE",
            DeviceStatus::Maintenance => "MAINTENANCE",
        }
    }

    /// Read the status file at `path`.
    pub async fn read(path: impl AsRef<Path>) -> HalResult<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        text.parse()
    }
}

impl FromStr for DeviceStatus {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(DeviceStatus::Active),
            "inactive" => Ok(DeviceStatus::Inactive),
            "maintenance" => Ok(DeviceStatus::Maintenance),
            other => Err(HalError::Configuration(format!(
                "unrecognised device status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! External command templates.

use serde::{Deserialize, Serialize};

use devgw_hal::{HalError, HalResult};

/// Configured form of a command: one line or an argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// Split shell-style; quotes group words.
    Line(String),
    Args(Vec<String>),
}

/// A program plus arguments with `{shots}` and `{angle}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(parts: Vec<String>) -> HalResult<Self> {
        let mut parts = parts.into_iter();
        let program = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| HalError::Configuration("external command is empty".into()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn from_spec(spec: CommandSpec) -> HalResult<Self> {
        match spec {
            CommandSpec::Line(line) => {
                let parts = shlex::split(&line).ok_or_else(|| {
                    HalError::Configuration(format!("unbalanced quotes in external command '{line}'"))
                })?;
                Self::new(parts)
            }
            CommandSpec::Args(args) => Self::new(args),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with every placeholder substituted.
    pub fn render(&self, shots: u32, angle: f64) -> Vec<String> {
        let shots = shots.to_string();
        let angle = angle.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{shots}", &shots).replace("{angle}", &angle))
            .collect()
    }
}

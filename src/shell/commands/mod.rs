use anyhow::Result;
use std::io::Write;

pub mod cat;
pub mod cd;
pub mod ls;
pub mod mkdir;
pub mod output;
pub mod rm;
pub mod stat;
pub mod write;

use super::ShellState;

/// Trait for shell commands
pub trait Command: Send + Sync {
    /// Get the command name
    fn name(&self) -> &str;

    /// Get command usage help
    fn usage(&self) -> &str;

    /// Execute the command, writing its output to `out`
    fn execute(&self, state: &mut ShellState, args: &[String], out: &mut dyn Write) -> Result<()>;
}

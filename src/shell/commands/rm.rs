use anyhow::{Result, anyhow};
use std::io::Write;

use super::{Command, ShellState};
use crate::vfs::FileHandle;

pub struct RmCommand;

impl Command for RmCommand {
    fn name(&self) -> &str {
        "rm"
    }

    fn usage(&self) -> &str {
        "rm PATH          - Delete a file, or a directory and its files"
    }

    fn execute(&self, state: &mut ShellState, args: &[String], _out: &mut dyn Write) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: rm PATH"));
        }

        let result = args.iter().try_for_each(|path| -> Result<()> {
            let target = state.resolve(path)?;
            target.delete()?;
            Ok(())
        });

        state.invalidate_completions();
        result
    }
}

use anyhow::{Result, anyhow};
use std::io::Write;

use super::{Command, ShellState};
use crate::vfs::FileHandle;

pub struct MkdirCommand;

impl Command for MkdirCommand {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn usage(&self) -> &str {
        "mkdir PATH       - Create a directory"
    }

    fn execute(&self, state: &mut ShellState, args: &[String], _out: &mut dyn Write) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: mkdir PATH"));
        }

        for path in args {
            let target = state.absolute(path);
            let (parent, name) = target
                .trim_end_matches('/')
                .rsplit_once('/')
                .filter(|(_, name)| !name.is_empty())
                .ok_or_else(|| anyhow!("mkdir: cannot create {target}"))?;

            let parent = state.resolve_directory(if parent.is_empty() { "/" } else { parent })?;
            parent.create_directory(name)?;
        }

        state.invalidate_completions();
        Ok(())
    }
}

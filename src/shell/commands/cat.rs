use anyhow::{Context, Result, anyhow};
use std::io::Write;

use super::{Command, ShellState};
use crate::vfs::FileHandle;

pub struct CatCommand;

impl Command for CatCommand {
    fn name(&self) -> &str {
        "cat"
    }

    fn usage(&self) -> &str {
        "cat FILE         - Display file contents"
    }

    fn execute(&self, state: &mut ShellState, args: &[String], out: &mut dyn Write) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: cat FILE"));
        }

        for path in args {
            let file = state.resolve(path)?;
            let mut input = file.open_input_stream()?;
            match std::io::copy(&mut input, out) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
                Err(e) => return Err(e).with_context(|| format!("cat: reading {path}")),
            }
        }
        Ok(())
    }
}

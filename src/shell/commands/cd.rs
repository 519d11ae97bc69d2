use anyhow::{Result, anyhow};
use std::io::Write;

use super::{Command, ShellState};
use crate::vfs::FileHandle;

pub struct CdCommand;

impl Command for CdCommand {
    fn name(&self) -> &str {
        "cd"
    }

    fn usage(&self) -> &str {
        "cd [PATH]        - Change current directory"
    }

    fn execute(&self, state: &mut ShellState, args: &[String], _out: &mut dyn Write) -> Result<()> {
        // cd with no args goes back to the storage root
        let Some(path) = args.first() else {
            let root = state.factory().config().external_storage_root.display().to_string();
            state.set_cwd(crate::shell::resolve_path("/", &format!("{root}/")));
            return Ok(());
        };

        let target = state.resolve_directory(path)?;
        // catalog directories always exist; host directories must
        if !target.directories_are_synthetic() && !target.is_directory() {
            return Err(anyhow!("Not a directory: {path}"));
        }

        let mut cwd = state.absolute(path);
        if !cwd.ends_with('/') {
            cwd.push('/');
        }
        state.set_cwd(cwd);
        Ok(())
    }
}

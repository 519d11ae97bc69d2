use anyhow::{Context, Result, anyhow};
use std::io::Write;

use super::{Command, ShellState};
use crate::vfs::FileHandle;

/// `write` replaces the content of a file, `append` extends it.
/// Either creates the file when it does not exist.
pub struct WriteCommand {
    pub append: bool,
}

impl Command for WriteCommand {
    fn name(&self) -> &str {
        if self.append { "append" } else { "write" }
    }

    fn usage(&self) -> &str {
        if self.append {
            "append FILE TEXT - Append a line of text to a file"
        } else {
            "write FILE TEXT  - Replace a file's content with a line of text"
        }
    }

    fn execute(&self, state: &mut ShellState, args: &[String], _out: &mut dyn Write) -> Result<()> {
        let Some((path, words)) = args.split_first() else {
            return Err(anyhow!("Usage: {} FILE TEXT...", self.name()));
        };

        let file = state.resolve(path)?;
        if file.is_directory() {
            return Err(anyhow!("{}: {path} is a directory", self.name()));
        }

        let mut output = file.open_output_stream(self.append)?;
        writeln!(output, "{}", words.join(" "))
            .and_then(|()| output.flush())
            .with_context(|| format!("{}: writing {path}", self.name()))?;
        drop(output);

        state.invalidate_completions();
        Ok(())
    }
}

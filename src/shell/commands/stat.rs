use anyhow::{Result, anyhow};
use chrono::DateTime;
use std::io::Write;

use super::{Command, ShellState};
use crate::error::Quietly;
use crate::print_line;
use crate::vfs::{FileHandle, SafeFile};

pub struct StatCommand;

impl Command for StatCommand {
    fn name(&self) -> &str {
        "stat"
    }

    fn usage(&self) -> &str {
        "stat PATH        - Show what each backend knows about a path"
    }

    fn execute(&self, state: &mut ShellState, args: &[String], out: &mut dyn Write) -> Result<()> {
        let Some(path) = args.first() else {
            return Err(anyhow!("Usage: stat PATH"));
        };

        let file = state.resolve(path)?;
        if !file.exists()? {
            return Err(anyhow!("stat: {path}: not found"));
        }

        let backend = match &file {
            SafeFile::Media(media) => format!("media catalog ({})", media.collection()),
            SafeFile::Raw(_) => "host filesystem".to_string(),
            SafeFile::Generic(_) => "document provider".to_string(),
        };
        let kind = if file.is_directory() { "directory" } else { "file" };
        let unknown = || "-".to_string();

        print_line!(out, "  Path: {}", file.file_path().quietly().unwrap_or_else(unknown));
        print_line!(out, "  Kind: {kind}");
        print_line!(out, "  Backend: {backend}");
        print_line!(out, "  URI: {}", file.uri().quietly().map(|u| u.to_string()).unwrap_or_else(unknown));
        if file.is_file() {
            print_line!(out, "  Size: {}", file.length().quietly().map(|l| l.to_string()).unwrap_or_else(unknown));
            print_line!(
                out,
                "  Modified: {}",
                file.last_modified()
                    .quietly()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(unknown)
            );
            print_line!(out, "  Type: {}", file.file_type().quietly().unwrap_or_else(unknown));
        }
        Ok(())
    }
}

use anyhow::{Result, anyhow};
use chrono::DateTime;
use colored::*;
use std::io::Write;

use super::{Command, ShellState};
use crate::error::Quietly;
use crate::print_line;
use crate::vfs::{FileHandle, SafeFile};

pub struct LsCommand;

impl Command for LsCommand {
    fn name(&self) -> &str {
        "ls"
    }

    fn usage(&self) -> &str {
        "ls [-l] [PATH]   - List directory contents"
    }

    fn execute(&self, state: &mut ShellState, args: &[String], out: &mut dyn Write) -> Result<()> {
        let mut long_format = false;
        let mut path_arg: Option<&str> = None;

        for arg in args {
            if arg == "-l" {
                long_format = true;
            } else if arg.starts_with('-') {
                return Err(anyhow!("ls: unknown option {arg}"));
            } else {
                path_arg = Some(arg.as_str());
                break;
            }
        }

        let directory = state.resolve_directory(path_arg.unwrap_or(""))?;
        let mut entries = directory.list_files()?;
        entries.sort_by_key(|e| e.name().unwrap_or_default());

        if long_format {
            print_line!(out, "{:<40} {:>10} MODIFIED", "NAME", "SIZE");
            print_line!(out, "{}", "-".repeat(70));
            for entry in &entries {
                let (size, modified) = Self::details(entry);
                print_line!(out, "{:<40} {:>10} {}", Self::display_name(entry), size, modified);
            }
        } else {
            for entry in &entries {
                print_line!(out, "{}", Self::display_name(entry));
            }
        }
        Ok(())
    }
}

impl LsCommand {
    fn display_name(entry: &SafeFile) -> String {
        let name = entry.name().unwrap_or_else(|_| entry.to_string());
        if entry.is_directory() {
            format!("{name}/").blue().bold().to_string()
        } else {
            name
        }
    }

    /// Size and modification time columns, `-` where unknown
    fn details(entry: &SafeFile) -> (String, String) {
        if entry.is_directory() {
            return ("-".to_string(), "-".to_string());
        }
        let size = entry
            .length()
            .quietly()
            .map(|len| humansize::format_size(len, humansize::BINARY))
            .unwrap_or_else(|| "-".to_string());
        let modified = entry
            .last_modified()
            .quietly()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        (size, modified)
    }
}

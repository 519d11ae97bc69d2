pub mod commands;
pub mod completion;

use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::io::Write;
use std::process::{Command as ProcessCommand, Stdio};
use std::sync::Arc;

use crate::vfs::{HandleFactory, SafeFile};
use commands::Command;
pub use completion::{CompletionCache, ShellCompleter};

/// Returned by `exit` and `quit` to end the session
#[derive(Debug, thiserror::Error)]
#[error("exit requested")]
pub struct ExitRequested;

/// Whether `err` is the request to leave the shell
pub fn is_exit(err: &anyhow::Error) -> bool {
    err.is::<ExitRequested>()
}

/// Absolute, normalized form of `arg` seen from directory `cwd`.
///
/// `.` and `..` are folded away. The result keeps a trailing separator when
/// `arg` names a directory by spelling.
pub fn resolve_path(cwd: &str, arg: &str) -> String {
    let joined = if arg.starts_with('/') {
        arg.to_string()
    } else {
        format!("{}/{arg}", cwd.trim_end_matches('/'))
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let last = arg.rsplit('/').next().unwrap_or("");
    let directory_like = arg.is_empty() || matches!(last, "" | "." | "..");
    let mut path = format!("/{}", segments.join("/"));
    if directory_like && !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// Shell state - tracks the working directory and provides command execution
pub struct ShellState {
    /// Resolves shell paths to file handles
    factory: HandleFactory,
    /// Working directory, absolute and always ending with `/`
    cwd: String,
    /// Tab completion cache
    completion_cache: CompletionCache,
    /// Registered commands
    commands: HashMap<String, Arc<dyn Command>>,
}

impl ShellState {
    /// Start in the root of shared storage
    pub fn new(factory: HandleFactory) -> Self {
        let root = factory.config().external_storage_root.display().to_string();
        Self::with_cwd(factory, &root)
    }

    pub fn with_cwd(factory: HandleFactory, cwd: &str) -> Self {
        let cwd = resolve_path("/", &format!("{}/", cwd.trim_end_matches('/')));
        let completion_cache = CompletionCache::new(factory.clone(), cwd.clone());

        let mut state = ShellState {
            factory,
            cwd,
            completion_cache,
            commands: HashMap::new(),
        };

        state.register_command(Arc::new(commands::ls::LsCommand));
        state.register_command(Arc::new(commands::cd::CdCommand));
        state.register_command(Arc::new(commands::cat::CatCommand));
        state.register_command(Arc::new(commands::write::WriteCommand { append: false }));
        state.register_command(Arc::new(commands::write::WriteCommand { append: true }));
        state.register_command(Arc::new(commands::mkdir::MkdirCommand));
        state.register_command(Arc::new(commands::rm::RmCommand));
        state.register_command(Arc::new(commands::stat::StatCommand));

        state
    }

    fn register_command(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Execute a command line, printing to stdout
    pub fn execute(&mut self, line: &str) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        match Self::split_pipeline(line) {
            (command, Some(pipeline)) => self.execute_with_pipe(&command, &pipeline, None),
            (command, None) => self.execute_internal(&command, &mut std::io::stdout().lock()),
        }
    }

    /// Execute a command line, writing everything it prints to `out`
    pub fn execute_to(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        match Self::split_pipeline(line) {
            (command, Some(pipeline)) => self.execute_with_pipe(&command, &pipeline, Some(out)),
            (command, None) => self.execute_internal(&command, out),
        }
    }

    /// Run `command`, feeding its output to `sh -c pipeline`.
    ///
    /// The pipeline's output goes to `capture` when given, to the terminal
    /// otherwise.
    fn execute_with_pipe(
        &mut self,
        command: &str,
        pipeline: &str,
        capture: Option<&mut dyn Write>,
    ) -> Result<()> {
        let mut buffer = Vec::new();
        let result = self.execute_internal(command, &mut buffer);

        let mut child = ProcessCommand::new("sh")
            .arg("-c")
            .arg(pipeline)
            .stdin(Stdio::piped())
            .stdout(if capture.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .spawn()
            .context("Failed to spawn shell")?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to open stdin"))?;
        let writer = std::thread::spawn(move || {
            // the pipeline may stop reading early (head, grep -m)
            let _ = stdin.write_all(&buffer);
        });

        let output = child
            .wait_with_output()
            .context("Failed to wait for child")?;
        let _ = writer.join();

        if let Some(out) = capture {
            out.write_all(&output.stdout)?;
        }

        // The child's exit status is ignored: grep finding nothing is fine
        result
    }

    /// Internal execute for normal (non-piped) commands
    fn execute_internal(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let parts = Self::parse_command_line(line)?;

        let Some((cmd_name, args)) = parts.split_first() else {
            return Ok(());
        };

        match cmd_name.as_str() {
            "exit" | "quit" => return Err(ExitRequested.into()),
            "help" => return self.print_help(out),
            "pwd" => {
                writeln!(out, "{}", self.cwd)?;
                return Ok(());
            }
            _ => {}
        }

        if let Some(command) = self.commands.get(cmd_name) {
            let cmd = Arc::clone(command);
            cmd.execute(self, args, out)
        } else {
            Err(anyhow!("Unknown command: {cmd_name}"))
        }
    }

    pub fn factory(&self) -> &HandleFactory {
        &self.factory
    }

    /// Current working directory
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Change the working directory
    pub fn set_cwd(&mut self, cwd: String) {
        self.completion_cache.set_cwd(cwd.clone());
        self.cwd = cwd;
    }

    /// Absolute path of a command argument
    pub fn absolute(&self, arg: &str) -> String {
        resolve_path(&self.cwd, arg)
    }

    /// Handle for a command argument
    pub fn resolve(&self, arg: &str) -> Result<SafeFile> {
        let path = self.absolute(arg);
        self.factory
            .from_file(&path)
            .with_context(|| format!("cannot resolve {path}"))
    }

    /// Handle for a command argument naming a directory
    pub fn resolve_directory(&self, arg: &str) -> Result<SafeFile> {
        let mut path = self.absolute(arg);
        if !path.ends_with('/') {
            path.push('/');
        }
        self.factory
            .from_file(&path)
            .with_context(|| format!("cannot resolve {path}"))
    }

    pub fn completion_cache(&self) -> &CompletionCache {
        &self.completion_cache
    }

    /// Forget cached listings after a command changed the tree
    pub fn invalidate_completions(&self) {
        self.completion_cache.clear();
    }

    fn print_help(&self, out: &mut dyn Write) -> Result<()> {
        let mut usages: Vec<&str> = self.commands.values().map(|c| c.usage()).collect();
        usages.sort_unstable();

        crate::print_line!(out, "Available commands:");
        for usage in usages {
            crate::print_line!(out, "  {usage}");
        }
        crate::print_line!(out, "  pwd              - Print working directory");
        crate::print_line!(out, "  help             - Show this help");
        crate::print_line!(out, "  exit/quit        - Exit the shell");
        crate::print_line!(out, "");
        crate::print_line!(out, "Paths under the Download, Music, Movies and Pictures directories of");
        crate::print_line!(out, "shared storage are served by the media catalog; a trailing / names a");
        crate::print_line!(out, "directory there.");
        crate::print_line!(out, "");
        crate::print_line!(out, "Pipe support:");
        crate::print_line!(out, "  ls | grep pattern");
        crate::print_line!(out, "  cat notes.txt | wc -l");
        Ok(())
    }

    /// Get the prompt string
    pub fn prompt(&self) -> String {
        format!("safefile:{} $ ", self.cwd)
    }

    /// Split command line on first unquoted pipe character
    /// Returns (command, Some(pipeline)) or (command, None)
    fn split_pipeline(line: &str) -> (String, Option<String>) {
        let mut in_single_quote = false;
        let mut in_double_quote = false;
        let mut escape_next = false;

        for (i, ch) in line.char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }

            match ch {
                '\\' if !in_single_quote => escape_next = true,
                '\'' if !in_double_quote => in_single_quote = !in_single_quote,
                '"' if !in_single_quote => in_double_quote = !in_double_quote,
                '|' if !in_single_quote && !in_double_quote => {
                    let command = line[..i].trim().to_string();
                    let pipeline = line[i + 1..].trim().to_string();
                    return (command, Some(pipeline));
                }
                _ => {}
            }
        }

        (line.to_string(), None)
    }

    /// Parse command line respecting quotes (both single and double)
    fn parse_command_line(line: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        let mut current_arg = String::new();
        let mut in_single_quote = false;
        let mut in_double_quote = false;
        let mut escape_next = false;

        for ch in line.chars() {
            if escape_next {
                current_arg.push(ch);
                escape_next = false;
                continue;
            }

            match ch {
                '\\' if !in_single_quote => escape_next = true,
                '\'' if !in_double_quote => in_single_quote = !in_single_quote,
                '"' if !in_single_quote => in_double_quote = !in_double_quote,
                ' ' | '\t' if !in_single_quote && !in_double_quote => {
                    if !current_arg.is_empty() {
                        args.push(std::mem::take(&mut current_arg));
                    }
                }
                _ => current_arg.push(ch),
            }
        }

        if !current_arg.is_empty() {
            args.push(current_arg);
        }

        if in_single_quote {
            return Err(anyhow!("Unclosed single quote"));
        }
        if in_double_quote {
            return Err(anyhow!("Unclosed double quote"));
        }

        Ok(args)
    }
}

use clap::Parser;
use colored::*;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::Arc;

use safefile::catalog::MemoryCatalog;
use safefile::media::Volume;
use safefile::shell::{self, ShellState};
use safefile::{HandleFactory, StorageConfig};

/// Browse shared storage through the same handles an app would use.
///
/// Category directories (Download, Music, Movies, Pictures) under the storage
/// root are served by an in-memory media catalog that lives for the session;
/// every other path goes to the host filesystem.
#[derive(Parser, Debug)]
#[command(name = "safefile", version, about)]
struct Args {
    /// Root of shared external storage
    #[arg(long, env = "SAFEFILE_STORAGE_ROOT", default_value = "/storage/emulated/0")]
    storage_root: PathBuf,

    /// Platform API level; below 29 category paths bypass the catalog
    #[arg(long, env = "SAFEFILE_API_LEVEL", default_value_t = 33)]
    api_level: u32,

    /// Address the internal catalog volume instead of external storage
    #[arg(long)]
    internal: bool,

    /// Log catalog traffic at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Run a command and exit instead of starting the shell. Repeatable.
    #[arg(short, long = "command", value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let volume = if args.internal {
        Volume::Internal
    } else {
        Volume::External
    };
    let config = StorageConfig::new(&args.storage_root)
        .with_api_level(args.api_level)
        .with_volume(volume);
    let factory = HandleFactory::new(config, Arc::new(MemoryCatalog::new()));
    let mut state = ShellState::new(factory);

    if !args.command.is_empty() {
        for line in &args.command {
            match state.execute(line) {
                Ok(()) => {}
                Err(e) if shell::is_exit(&e) => break,
                Err(e) => {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                    std::process::exit(1);
                }
            }
        }
        return Ok(());
    }

    println!("{}", "=".repeat(60).cyan());
    println!("{}", "  safefile - shared storage shell".bold().cyan());
    println!("{}", "  Catalog-backed media directories, plain host paths".cyan());
    println!("{}", "=".repeat(60).cyan());
    println!();
    println!("Type 'help' for available commands or 'exit' to quit");
    println!();

    let completer = shell::ShellCompleter::new(state.completion_cache().clone());
    let mut rl = Editor::new()?;
    rl.set_helper(Some(completer));

    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".safefile_history");
        p
    });

    if let Some(path) = &history_file {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = state.prompt();

        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                match state.execute(&line) {
                    Ok(()) => {}
                    Err(e) if shell::is_exit(&e) => break,
                    Err(e) => eprintln!("{} {:#}", "Error:".red().bold(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red().bold(), err);
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = rl.save_history(path);
    }

    println!("Goodbye!");
    Ok(())
}

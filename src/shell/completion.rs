use rustyline::Context;
use rustyline::completion::{Completer, Pair};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::resolve_path;
use crate::error::Quietly;
use crate::vfs::{FileHandle, HandleFactory};

/// Entry in completion cache with metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Cache of directory listings used for tab completion, keyed by absolute
/// directory path
#[derive(Clone)]
pub struct CompletionCache {
    entries: Arc<RwLock<HashMap<String, Vec<CompletionEntry>>>>,
    commands: Vec<String>,
    cwd: Arc<RwLock<String>>,
    factory: HandleFactory,
}

impl CompletionCache {
    pub fn new(factory: HandleFactory, cwd: String) -> Self {
        CompletionCache {
            entries: Arc::new(RwLock::new(HashMap::new())),
            commands: [
                "ls", "cd", "cat", "write", "append", "mkdir", "rm", "stat", "pwd", "help", "exit",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            cwd: Arc::new(RwLock::new(cwd)),
            factory,
        }
    }

    pub fn set_cwd(&self, cwd: String) {
        if let Ok(mut current) = self.cwd.write() {
            *current = cwd;
        }
    }

    pub fn cwd(&self) -> String {
        self.cwd
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|_| "/".to_string())
    }

    pub fn update_entries(&self, path: String, entries: Vec<CompletionEntry>) {
        if let Ok(mut cache) = self.entries.write() {
            cache.insert(path, entries);
        }
    }

    pub fn get_entries(&self, path: &str) -> Option<Vec<CompletionEntry>> {
        self.entries
            .read()
            .ok()
            .and_then(|cache| cache.get(path).cloned())
    }

    /// Drop every cached listing
    pub fn clear(&self) {
        if let Ok(mut cache) = self.entries.write() {
            cache.clear();
        }
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.clone()
    }

    /// Entries of the directory at absolute `path`, cached after the first
    /// listing. Listing failures complete nothing.
    pub fn entries_for(&self, path: &str) -> Vec<CompletionEntry> {
        if let Some(cached) = self.get_entries(path) {
            return cached;
        }

        let Some(listing) = self
            .factory
            .from_file(path)
            .and_then(|dir| dir.list_files())
            .quietly()
        else {
            return Vec::new();
        };

        let entries: Vec<CompletionEntry> = listing
            .iter()
            .filter_map(|file| {
                Some(CompletionEntry {
                    name: file.name().quietly()?,
                    is_dir: file.is_directory(),
                })
            })
            .collect();
        self.update_entries(path.to_string(), entries.clone());
        entries
    }
}

/// Tab completion helper for the shell
pub struct ShellCompleter {
    cache: CompletionCache,
}

impl ShellCompleter {
    pub fn new(cache: CompletionCache) -> Self {
        ShellCompleter { cache }
    }

    /// Complete a command at the start of the line
    fn complete_command(&self, line: &str) -> Vec<Pair> {
        self.cache
            .get_commands()
            .into_iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd,
            })
            .collect()
    }

    /// Complete a path (file or directory)
    fn complete_path(&self, path: &str, command: &str) -> Vec<Pair> {
        // "Download/su" completes "su" inside "Download/"
        let (dir_path, file_prefix) = match path.rfind('/') {
            Some(last_slash) => path.split_at(last_slash + 1),
            None => ("", path),
        };

        let directory = resolve_path(&self.cache.cwd(), dir_path);
        self.cache
            .entries_for(&directory)
            .into_iter()
            .filter(|entry| entry.name.starts_with(file_prefix))
            // cd only shows directories
            .filter(|entry| command != "cd" || entry.is_dir)
            .map(|entry| {
                let suffix = if entry.is_dir { "/" } else { "" };
                Pair {
                    display: format!("{}{suffix}", entry.name),
                    replacement: format!("{dir_path}{}{suffix}", entry.name),
                }
            })
            .collect()
    }
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(command) = words.first().copied() else {
            return Ok((0, Vec::new()));
        };

        // If we're on the first word, complete commands
        if words.len() == 1 && !line.ends_with(char::is_whitespace) {
            let start = line.len() - command.len();
            return Ok((start, self.complete_command(command)));
        }

        // Otherwise complete the word under the cursor as a path
        let current = if line.ends_with(char::is_whitespace) {
            ""
        } else {
            words.last().copied().unwrap_or("")
        };
        let start = pos - current.len();
        Ok((start, self.complete_path(current, command)))
    }
}

impl rustyline::Helper for ShellCompleter {}
impl rustyline::highlight::Highlighter for ShellCompleter {}
impl rustyline::hint::Hinter for ShellCompleter {
    type Hint = String;
}
impl rustyline::validate::Validator for ShellCompleter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::StorageConfig;

    fn completer() -> ShellCompleter {
        let catalog = MemoryCatalog::new();
        let factory =
            HandleFactory::new(StorageConfig::new("/sd"), Arc::new(catalog.clone()));
        let downloads = factory.from_file("/sd/Download/").unwrap();
        downloads.create_file("notes.txt").unwrap();
        downloads.create_file("news.md").unwrap();
        downloads.create_file("photo.png").unwrap();
        ShellCompleter::new(CompletionCache::new(factory, "/sd/".to_string()))
    }

    #[test]
    fn test_complete_command() {
        let names: Vec<_> = completer()
            .complete_command("ca")
            .into_iter()
            .map(|p| p.replacement)
            .collect();
        assert_eq!(names, vec!["cat"]);
    }

    #[test]
    fn test_complete_path_in_catalog_directory() {
        let mut names: Vec<_> = completer()
            .complete_path("Download/ne", "cat")
            .into_iter()
            .map(|p| p.replacement)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Download/news.md"]);
    }

    #[test]
    fn test_cd_skips_files() {
        assert!(completer().complete_path("Download/", "cd").is_empty());
    }

    #[test]
    fn test_listing_is_cached_until_cleared() {
        let completer = completer();
        assert_eq!(completer.cache.entries_for("/sd/Download/").len(), 3);
        assert!(completer.cache.get_entries("/sd/Download/").is_some());
        completer.cache.clear();
        assert!(completer.cache.get_entries("/sd/Download/").is_none());
    }
}

use std::sync::Arc;

use safefile::catalog::MemoryCatalog;
use safefile::shell::{self, ShellState};
use safefile::{HandleFactory, StorageConfig};
use tempfile::TempDir;

/// Shell rooted at a temporary shared-storage directory
fn create_test_shell() -> (ShellState, TempDir) {
    let root = TempDir::new().unwrap();
    let factory = HandleFactory::new(StorageConfig::new(root.path()), Arc::new(MemoryCatalog::new()));
    (ShellState::new(factory), root)
}

fn run(state: &mut ShellState, line: &str) -> String {
    let mut out = Vec::new();
    state
        .execute_to(line, &mut out)
        .unwrap_or_else(|e| panic!("{line}: {e:#}"));
    String::from_utf8(out).unwrap()
}

#[test]
fn test_pwd_starts_at_storage_root() {
    let (mut state, root) = create_test_shell();
    let expected = format!("{}/\n", root.path().display());
    assert_eq!(run(&mut state, "pwd"), expected);
}

#[test]
fn test_write_cat_in_catalog_directory() {
    let (mut state, _root) = create_test_shell();

    run(&mut state, "cd Download");
    assert!(state.cwd().ends_with("/Download/"));

    run(&mut state, "write hello.txt Hello, World!");
    assert_eq!(run(&mut state, "cat hello.txt"), "Hello, World!\n");

    run(&mut state, "append hello.txt again");
    assert_eq!(run(&mut state, "cat hello.txt"), "Hello, World!\nagain\n");

    assert_eq!(run(&mut state, "ls"), "hello.txt\n");
}

#[test]
fn test_catalog_directories_are_synthetic() {
    let (mut state, root) = create_test_shell();

    // no host directory is needed for catalog paths
    run(&mut state, "cd Music/albums/live");
    run(&mut state, "write setlist.txt 'one two'");
    assert_eq!(run(&mut state, "ls"), "setlist.txt\n");
    assert!(!root.path().join("Music").exists());

    run(&mut state, "cd ..");
    assert_eq!(run(&mut state, "ls"), "");
    assert!(state.cwd().ends_with("/Music/albums/"));
}

#[test]
fn test_rm_directory_in_catalog() {
    let (mut state, _root) = create_test_shell();
    run(&mut state, "write Download/junk/a.txt a");
    run(&mut state, "write Download/junk/b.txt b");
    assert_eq!(run(&mut state, "ls Download/junk"), "a.txt\nb.txt\n");

    run(&mut state, "rm Download/junk/");
    assert_eq!(run(&mut state, "ls Download/junk"), "");
}

#[test]
fn test_host_filesystem_commands() {
    let (mut state, root) = create_test_shell();

    run(&mut state, "mkdir notes");
    assert!(root.path().join("notes").is_dir());

    run(&mut state, "cd notes");
    run(&mut state, "write todo.txt milk");
    assert_eq!(
        std::fs::read_to_string(root.path().join("notes/todo.txt")).unwrap(),
        "milk\n"
    );

    let stat = run(&mut state, "stat todo.txt");
    assert!(stat.contains("Backend: host filesystem"));
    assert!(stat.contains("Size: 5"));
    assert!(stat.contains("Type: text/plain"));

    run(&mut state, "rm todo.txt");
    assert!(!root.path().join("notes/todo.txt").exists());
}

#[test]
fn test_stat_catalog_file() {
    let (mut state, _root) = create_test_shell();
    run(&mut state, "write Pictures/cat.png meow");

    let stat = run(&mut state, "stat Pictures/cat.png");
    assert!(stat.contains("Path: Pictures/cat.png"));
    assert!(stat.contains("Backend: media catalog (content://media/external_primary/images/media)"));
    assert!(stat.contains("URI: content://media/external_primary/images/media/"));
    assert!(stat.contains("Size: 5"));
    assert!(stat.contains("Type: -"));
}

#[test]
fn test_errors() {
    let (mut state, _root) = create_test_shell();
    let mut out = Vec::new();

    assert!(state.execute_to("cat Download/missing.txt", &mut out).is_err());
    assert!(state.execute_to("cd /definitely/not/here", &mut out).is_err());
    assert!(state.execute_to("frobnicate", &mut out).is_err());
    assert!(state.execute_to("cat 'unclosed", &mut out).is_err());

    let exit = state.execute_to("exit", &mut out).unwrap_err();
    assert!(shell::is_exit(&exit));
    assert!(shell::is_exit(&state.execute_to("quit", &mut out).unwrap_err()));
}

#[test]
fn test_only_exit_command_ends_the_session() {
    let (mut state, _root) = create_test_shell();
    assert!(!shell::is_exit(&anyhow::anyhow!("exit")));

    let mut out = Vec::new();
    let err = state.execute_to("cat Download/exit", &mut out).unwrap_err();
    assert!(!shell::is_exit(&err));

    run(&mut state, "write Download/exit exit");
    assert_eq!(run(&mut state, "cat Download/exit"), "exit\n");
}

#[test]
fn test_help_lists_commands() {
    let (mut state, _root) = create_test_shell();
    let help = run(&mut state, "help");
    for command in ["ls", "cd", "cat", "write", "append", "mkdir", "rm", "stat", "pwd"] {
        assert!(help.contains(&format!("  {command}")), "{command} missing from help");
    }
}

#[cfg(unix)]
#[test]
fn test_pipe_to_shell() {
    let (mut state, _root) = create_test_shell();
    run(&mut state, "write Download/a.txt x");
    run(&mut state, "write Download/b.md y");

    assert_eq!(run(&mut state, "ls Download | grep md"), "b.md\n");
    assert_eq!(run(&mut state, "cat Download/a.txt | wc -c").trim(), "2");
}

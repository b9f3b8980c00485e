use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn jsearch_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("jsearch");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let journal_dir = root.join("journal");
    fs::create_dir_all(journal_dir.join("2024")).unwrap();
    fs::write(
        journal_dir.join("2024/2024-01-01.md"),
        "---\nmood: calm\n---\n# Monday\n\nI went for a walk. It rained later.\n\n- [ ] buy umbrella\nTea by the window.",
    )
    .unwrap();
    fs::write(
        journal_dir.join("2024/2024-01-02.md"),
        "Quiet day at home. Read a book about gardens.\n\nCalled Dr. Smith about the appointment.",
    )
    .unwrap();
    fs::write(journal_dir.join("notes.txt"), "Not a journal entry.").unwrap();

    let config_content = format!(
        r#"[corpus]
path = "{root}/journal"

[cache]
path = "{root}/data/index.sqlite"

[server]
bind = "127.0.0.1:7341"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("jsearch.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_jsearch(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = jsearch_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run jsearch binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_index_reports_counts_and_caches() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_jsearch(&config_path, &["index"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("entries: 2"), "got: {}", stdout);
    assert!(stdout.contains("journals: 2"), "got: {}", stdout);
    assert!(stdout.contains("cache: miss"), "got: {}", stdout);

    let (stdout, _, success) = run_jsearch(&config_path, &["index"]);
    assert!(success);
    assert!(stdout.contains("cache: hit"), "got: {}", stdout);

    let (stdout, _, success) = run_jsearch(&config_path, &["index", "--rebuild"]);
    assert!(success);
    assert!(stdout.contains("cache: rebuilt"), "got: {}", stdout);
}

#[test]
fn test_index_clear() {
    let (_tmp, config_path) = setup_test_env();

    run_jsearch(&config_path, &["index"]);
    let (stdout, _, success) = run_jsearch(&config_path, &["index", "--clear"]);
    assert!(success);
    assert!(stdout.contains("cleared"));

    let (stdout, _, _) = run_jsearch(&config_path, &["index"]);
    assert!(stdout.contains("cache: miss"), "got: {}", stdout);
}

#[test]
fn test_search_sentences_finds_rain() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_jsearch(
        &config_path,
        &["search", "rain", "--granularity", "sentences"],
    );
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);

    let first = stdout.lines().next().unwrap_or_default();
    assert!(first.starts_with("1. [2024-01-01]"), "got: {}", stdout);
    assert!(stdout.contains("It rained later."));
    // Task lines and front matter never reach the index.
    assert!(!stdout.contains("umbrella"));
    assert!(!stdout.contains("mood"));
}

#[test]
fn test_search_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_jsearch(
        &config_path,
        &["search", "day", "--granularity", "sentences", "--limit", "2"],
    );
    assert!(success);
    assert!(stdout.contains("1. ["));
    assert!(stdout.contains("2. ["));
    assert!(!stdout.contains("3. ["));
}

#[test]
fn test_search_date_range() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_jsearch(
        &config_path,
        &["search", "rain", "--granularity", "journals", "--since", "2024-01-02"],
    );
    assert!(success);
    assert!(stdout.contains("1. [2024-01-02]"));
    assert!(!stdout.contains("[2024-01-01]"));

    let (stdout, _, success) = run_jsearch(
        &config_path,
        &["search", "rain", "--since", "2025-01-01"],
    );
    assert!(success);
    assert!(stdout.contains("No results."));

    let (_, stderr, success) = run_jsearch(
        &config_path,
        &["search", "rain", "--since", "2024-01-02", "--until", "2024-01-01"],
    );
    assert!(!success);
    assert!(stderr.contains("after"), "got: {}", stderr);
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout1, _, _) = run_jsearch(&config_path, &["search", "walk in the rain"]);
    let (stdout2, _, _) = run_jsearch(&config_path, &["search", "walk in the rain"]);
    assert_eq!(stdout1, stdout2);
}

#[test]
fn test_search_empty_query_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_jsearch(&config_path, &["search", "   "]);
    assert!(!success);
    assert!(stderr.contains("query"), "got: {}", stderr);
}

#[test]
fn test_search_invalid_granularity_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_jsearch(
        &config_path,
        &["search", "rain", "--granularity", "chapters"],
    );
    assert!(!success);
    assert!(stderr.contains("chapters"), "got: {}", stderr);
}

#[test]
fn test_get_entry() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_jsearch(
        &config_path,
        &["get", "2024/2024-01-02.md", "--granularity", "sentences"],
    );
    assert!(success, "get failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("date:   2024-01-02"));
    assert!(stdout.contains("Called Dr. Smith about the appointment."));
    assert!(stdout.contains("--- Chunks (3) ---"), "got: {}", stdout);
}

#[test]
fn test_get_unknown_entry_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_jsearch(&config_path, &["get", "missing.md"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_missing_corpus_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("jsearch.toml");
    fs::write(
        &config_path,
        format!("[corpus]\npath = \"{}/nowhere\"\n", tmp.path().display()),
    )
    .unwrap();

    let (_, stderr, success) = run_jsearch(&config_path, &["search", "rain"]);
    assert!(!success);
    assert!(stderr.contains("corpus"), "got: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_jsearch(&tmp.path().join("absent.toml"), &["index"]);
    assert!(!success);
    assert!(stderr.contains("config"));
}

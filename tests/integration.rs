/// Integration tests for the `ext-reload` binary.
///
/// All tests invoke the compiled binary via subprocess against a throwaway
/// project in a temp directory. `CARGO_BIN_EXE_ext-reload` is set by Cargo
/// during `cargo test` to point at the binary for the current profile.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ext-reload"))
}

/// A bot-like project: two cogs, an `__init__.py`, an entry point, and a
/// stale bytecode cache.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    fs::write(root.join("main.py"), "bot.run()").unwrap();
    fs::write(root.join("simple_cog.py"), "def setup(bot): pass").unwrap();
    let cogs = root.join("cogs");
    fs::create_dir(&cogs).unwrap();
    fs::write(cogs.join("__init__.py"), "").unwrap();
    fs::write(cogs.join("music.py"), "def setup(bot): pass").unwrap();
    fs::write(cogs.join("README.md"), "# cogs").unwrap();
    let cache = cogs.join("__pycache__");
    fs::create_dir(&cache).unwrap();
    fs::write(cache.join("music.cpython-312.pyc"), "").unwrap();
    dir
}

/// Run an ext-reload command and assert it exits successfully.
/// Returns stdout as a String.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke ext-reload binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run an ext-reload command and assert it exits with a non-zero status.
/// Returns stderr as a String.
fn run_failure(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke ext-reload binary");
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstderr: {}",
        args,
        stderr
    );
    stderr
}

fn list_json(args: &[&str]) -> serde_json::Value {
    let mut full = vec!["list", "--json"];
    full.extend_from_slice(args);
    let stdout = run_success(&full);
    serde_json::from_str(&stdout).expect("list --json output is not valid JSON")
}

fn modules(report: &serde_json::Value) -> Vec<String> {
    let mut names: Vec<String> = report["tracked"]
        .as_array()
        .expect("JSON missing 'tracked' array")
        .iter()
        .map(|e| e["module"].as_str().unwrap_or("?").to_string())
        .collect();
    names.sort();
    names
}

fn s(p: &Path) -> &str {
    p.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

/// A directory spec expands to its immediate source files only.
#[test]
fn test_list_root_is_not_recursive() {
    let dir = fixture();
    let report = list_json(&["--root", s(dir.path())]);
    assert_eq!(modules(&report), vec!["main", "simple_cog"]);
}

/// A single file spec tracks exactly that file.
#[test]
fn test_list_single_file() {
    let dir = fixture();
    let file = dir.path().join("simple_cog.py");
    let report = list_json(&[s(&file), "--root", s(dir.path())]);
    assert_eq!(modules(&report), vec!["simple_cog"]);
}

/// Directory + file + missing path: union of the existing ones, no error.
#[test]
fn test_list_mixed_spec() {
    let dir = fixture();
    let cogs = dir.path().join("cogs");
    let file = dir.path().join("simple_cog.py");
    let missing = dir.path().join("nope");
    let report = list_json(&[s(&cogs), s(&file), s(&missing), "--root", s(dir.path())]);
    assert_eq!(
        modules(&report),
        vec!["cogs.__init__", "cogs.music", "simple_cog"]
    );
}

/// `--ignore` removes files from the tracked set.
#[test]
fn test_list_ignore() {
    let dir = fixture();
    let cogs = dir.path().join("cogs");
    let init = cogs.join("__init__.py");
    let report = list_json(&[s(&cogs), "--root", s(dir.path()), "--ignore", s(&init)]);
    assert_eq!(modules(&report), vec!["cogs.music"]);
    assert_eq!(report["ignored"].as_array().unwrap().len(), 1);
}

/// `--separator` changes how nested identifiers are joined.
#[test]
fn test_list_custom_separator() {
    let dir = fixture();
    let music = dir.path().join("cogs").join("music.py");
    let report = list_json(&[s(&music), "--root", s(dir.path()), "--separator", "/"]);
    assert_eq!(modules(&report), vec!["cogs/music"]);
}

/// Paths and ignores from `ext-reload.toml` are relative to the root.
#[test]
fn test_list_reads_config_file() {
    let dir = fixture();
    fs::write(
        dir.path().join("ext-reload.toml"),
        "paths = [\"cogs\", \"simple_cog.py\"]\nignore = [\"cogs/__init__.py\"]\n",
    )
    .unwrap();
    let report = list_json(&["--root", s(dir.path())]);
    assert_eq!(modules(&report), vec!["cogs.music", "simple_cog"]);
}

/// Human-readable output mentions each identifier.
#[test]
fn test_list_text_output() {
    let dir = fixture();
    let stdout = run_success(&["list", "--root", s(dir.path())]);
    assert!(stdout.contains("Tracking 2 file(s)"), "stdout: {}", stdout);
    assert!(stdout.contains("simple_cog"), "stdout: {}", stdout);
}

/// A nonexistent project root is a hard error.
#[test]
fn test_list_missing_root_fails() {
    let dir = fixture();
    let missing = dir.path().join("missing");
    let stderr = run_failure(&["list", "--root", s(&missing)]);
    assert!(stderr.contains("not accessible"), "stderr: {}", stderr);
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

/// Editing a tracked file runs the load command with its identifier.
#[cfg(unix)]
#[test]
fn test_watch_loads_changed_file() {
    let dir = fixture();
    let out_dir = tempfile::tempdir().unwrap();
    let log = out_dir.path().join("calls.log");
    let file = dir.path().join("simple_cog.py");

    let load_cmd = format!("echo load {{module}} >> {}", log.display());
    let mut child = Command::new(binary())
        .args([
            "watch",
            s(&file),
            "--root",
            s(dir.path()),
            "--load-cmd",
            &load_cmd,
        ])
        .spawn()
        .expect("failed to spawn ext-reload watch");

    // Keep touching the file until the watcher has picked it up.
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut seen = String::new();
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(500));
        fs::write(&file, "def setup(bot): return None").unwrap();
        if let Ok(contents) = fs::read_to_string(&log) {
            seen = contents;
            if seen.contains("load simple_cog") {
                break;
            }
        }
    }

    let _ = child.kill();
    let _ = child.wait();

    assert!(seen.contains("load simple_cog"), "calls: {:?}", seen);
    assert!(!seen.contains("reload"), "calls: {:?}", seen);
}

use std::path::PathBuf;

use serde::Serialize;

use crate::registry::ExtensionRegistry;
use crate::watcher::ExtensionReloader;

/// One tracked file and the identifier the host registry knows it by.
#[derive(Debug, Serialize)]
pub struct TrackedEntry {
    pub path: PathBuf,
    /// `None` when the file lies outside the project root.
    pub module: Option<String>,
}

/// Everything `list` reports about a resolved reloader.
#[derive(Debug, Serialize)]
pub struct TrackedReport {
    pub project_root: PathBuf,
    pub tracked: Vec<TrackedEntry>,
    pub ignored: Vec<PathBuf>,
}

impl TrackedReport {
    pub fn from_reloader<R: ExtensionRegistry>(reloader: &ExtensionReloader<R>) -> Self {
        let tracked = reloader
            .tracked()
            .iter()
            .map(|path| TrackedEntry {
                path: path.clone(),
                module: reloader.module_id(path).ok().map(|m| m.to_string()),
            })
            .collect();

        Self {
            project_root: reloader.project_root().to_path_buf(),
            tracked,
            ignored: reloader.ignored().iter().cloned().collect(),
        }
    }
}

/// Print the tracked set.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: one `module  path` line per file.
///
/// Files without an identifier are flagged on **stderr** so that stdout
/// stays clean for downstream consumers.
pub fn print_report(report: &TrackedReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising report: {}", e),
        }
        return;
    }

    println!(
        "Tracking {} file(s) under {}",
        report.tracked.len(),
        report.project_root.display()
    );
    let mut unnamed = 0;
    for entry in &report.tracked {
        match &entry.module {
            Some(module) => println!("  {}  {}", module, entry.path.display()),
            None => {
                unnamed += 1;
                println!("  ?  {}", entry.path.display());
            }
        }
    }
    if !report.ignored.is_empty() {
        println!("  {} file(s) ignored", report.ignored.len());
    }

    if unnamed > 0 {
        eprintln!("  {} file(s) lie outside the project root and can never be loaded", unnamed);
    }
}

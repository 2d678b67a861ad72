//! The reconciliation loop: decides load, reload, or nothing for each change.
//!
//! A tracked file is either inactive (its identifier is not in the host
//! registry) or active. The loop never caches that state; it asks the
//! registry on every matched event and calls `load` or `reload` accordingly.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::module_id::{self, IdentifierError, IdentifierRules, ModuleId};
use crate::registry::ExtensionRegistry;
use crate::resolver::{self, FileIdentity, PathSpec, TrackedFiles};

use super::error::WatchError;
use super::event::ChangeEvent;
use super::{BatchReceiver, DEFAULT_DEBOUNCE, start_watcher};

/// Directory names whose contents are build or cache artifacts.
pub const DEFAULT_ARTIFACT_DIRS: &[&str] = &["__pycache__"];

/// Which events of a batch are examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchPolicy {
    /// Only the first event; the rest of the batch is discarded.
    #[serde(rename = "first")]
    FirstEvent,
    /// Every event, with at most one registry call per identifier.
    #[default]
    All,
}

/// Registry operation issued for a matched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Load,
    Reload,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Load => f.write_str("load"),
            Op::Reload => f.write_str("reload"),
        }
    }
}

/// Result of handling one matched file within a batch.
#[derive(Debug)]
pub enum Outcome {
    Loaded(ModuleId),
    Reloaded(ModuleId),
    /// The registry call failed; the loop carries on.
    Failed {
        module: ModuleId,
        op: Op,
        error: anyhow::Error,
    },
    /// A tracked file matched but has no identifier under the project root.
    Underivable {
        path: PathBuf,
        error: IdentifierError,
    },
}

/// Keeps a host registry in sync with on-disk changes to tracked files.
pub struct ExtensionReloader<R> {
    paths: PathSpec,
    ignore: Option<PathSpec>,
    project_root: PathBuf,
    tracked: TrackedFiles,
    ignored: TrackedFiles,
    rules: IdentifierRules,
    artifact_dirs: Vec<String>,
    policy: BatchPolicy,
    debounce: Duration,
    debug: bool,
    /// Set after the first successful load of this loop's lifetime.
    first_load_done: bool,
    registry: R,
}

impl ExtensionReloader<()> {
    /// Start configuring a reloader; the registry is bound by
    /// [`ExtensionReloaderBuilder::build`].
    pub fn builder() -> ExtensionReloaderBuilder {
        ExtensionReloaderBuilder::new()
    }
}

impl<R: ExtensionRegistry> ExtensionReloader<R> {
    /// Track every source file directly inside the current directory,
    /// using it as the project root.
    pub fn default_dir(registry: R) -> Result<Self, WatchError> {
        ExtensionReloader::builder()
            .paths("./")
            .project_root("./")
            .build(registry)
    }

    pub fn tracked(&self) -> &TrackedFiles {
        &self.tracked
    }

    pub fn ignored(&self) -> &TrackedFiles {
        &self.ignored
    }

    /// Canonical project root used for identifier derivation.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn rules(&self) -> &IdentifierRules {
        &self.rules
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn into_registry(self) -> R {
        self.registry
    }

    /// Identifier the registry knows `path` by. `path` must be canonical.
    pub fn module_id(&self, path: &Path) -> Result<ModuleId, IdentifierError> {
        module_id::derive(&self.project_root, path, &self.rules)
    }

    /// Watch the project root and reconcile until the source fails.
    ///
    /// Registry calls run inline on the current task, so a hung call
    /// stalls the loop.
    pub async fn watch(mut self) -> Result<(), WatchError> {
        let (_handle, batches) = start_watcher(&self.project_root, self.debounce)?;
        self.run(batches).await
    }

    /// Consume batches until the channel closes or delivers an error.
    ///
    /// Registry failures are reported and never end the loop; a source
    /// error is returned because the watch can no longer proceed.
    pub async fn run(&mut self, mut batches: BatchReceiver) -> Result<(), WatchError> {
        if self.tracked.is_empty() {
            tracing::warn!("[reloader] no tracked files - nothing will be loaded");
        } else {
            crate::log_event!(
                "reloader",
                "monitoring",
                "{} files under {}",
                self.tracked.len(),
                self.project_root.display()
            );
        }

        while let Some(next) = batches.recv().await {
            let batch = next?;
            self.handle_batch(&batch);
        }

        crate::debug_event!("reloader", "source closed");
        Ok(())
    }

    /// Handle one batch of change events and report what was done.
    pub fn handle_batch(&mut self, batch: &[ChangeEvent]) -> Vec<Outcome> {
        let events = match self.policy {
            BatchPolicy::FirstEvent => &batch[..batch.len().min(1)],
            BatchPolicy::All => batch,
        };

        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();

        for event in events {
            if self.is_artifact(&event.path) {
                crate::debug_event!("reloader", "artifact", "{}", event.path.display());
                continue;
            }

            let Some(path) = self.match_tracked(&event.path) else {
                crate::debug_event!("reloader", "untracked", "{}", event.path.display());
                continue;
            };

            let module = match self.module_id(&path) {
                Ok(module) => module,
                Err(error) => {
                    tracing::error!("[reloader] cannot name {}: {error}", path.display());
                    outcomes.push(Outcome::Underivable { path, error });
                    continue;
                }
            };

            if seen.insert(module.clone()) {
                outcomes.push(self.apply(module));
            }
        }

        outcomes
    }

    /// Load or reload `module` depending on whether the registry has it.
    fn apply(&mut self, module: ModuleId) -> Outcome {
        if self.registry.contains(&module) {
            return match self.registry.reload(&module) {
                Ok(()) => {
                    crate::log_event!("reloader", "reloaded", "{module}");
                    Outcome::Reloaded(module)
                }
                Err(error) => {
                    tracing::error!("[reloader] reload of '{module}' failed: {error:#}");
                    Outcome::Failed {
                        module,
                        op: Op::Reload,
                        error,
                    }
                }
            };
        }

        match self.registry.load(&module) {
            Ok(()) => {
                crate::log_event!("reloader", "loaded", "{module}");
                if !self.first_load_done {
                    self.first_load_done = true;
                    if self.debug {
                        tracing::info!(
                            "[reloader] '{module}' was not loaded yet, so it was loaded \
                             for the first time. This tool is meant to reload extensions \
                             the host already loaded on startup; this notice is shown once."
                        );
                    }
                }
                Outcome::Loaded(module)
            }
            Err(error) => {
                tracing::error!("[reloader] load of '{module}' failed: {error:#}");
                Outcome::Failed {
                    module,
                    op: Op::Load,
                    error,
                }
            }
        }
    }

    /// Returns true if `path` lies inside an artifact directory.
    fn is_artifact(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        parent.components().any(|c| {
            self.artifact_dirs
                .iter()
                .any(|dir| c.as_os_str() == dir.as_str())
        })
    }

    /// Find the tracked file that is the same file on disk as `path`.
    ///
    /// Tries the canonical path against the set first and only scans
    /// identities when that misses (hard links, replaced inodes).
    fn match_tracked(&self, path: &Path) -> Option<PathBuf> {
        if let Ok(canonical) = std::fs::canonicalize(path)
            && self.tracked.contains(&canonical)
        {
            return Some(canonical);
        }

        let target = FileIdentity::of(path).ok()?;
        self.tracked
            .iter()
            .find(|tracked| FileIdentity::of(tracked).is_ok_and(|id| id == target))
            .cloned()
    }
}

impl<R> fmt::Debug for ExtensionReloader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionReloader")
            .field("paths", &self.paths)
            .field("project_root", &self.project_root)
            .field("ignore", &self.ignore)
            .field("tracked", &self.tracked)
            .field("policy", &self.policy)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

/// Builder for `ExtensionReloader`.
#[derive(Debug)]
pub struct ExtensionReloaderBuilder {
    paths: PathSpec,
    project_root: PathBuf,
    ignore: Option<PathSpec>,
    rules: IdentifierRules,
    artifact_dirs: Vec<String>,
    policy: BatchPolicy,
    debounce: Duration,
    debug: bool,
}

impl Default for ExtensionReloaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionReloaderBuilder {
    pub fn new() -> Self {
        Self {
            paths: PathSpec::from("./"),
            project_root: PathBuf::from("./"),
            ignore: None,
            rules: IdentifierRules::default(),
            artifact_dirs: DEFAULT_ARTIFACT_DIRS.iter().map(|s| s.to_string()).collect(),
            policy: BatchPolicy::default(),
            debounce: DEFAULT_DEBOUNCE,
            debug: false,
        }
    }

    /// Files and directories to track. Relative paths resolve against the
    /// current directory.
    pub fn paths(mut self, paths: impl Into<PathSpec>) -> Self {
        self.paths = paths.into();
        self
    }

    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Files and directories to exclude from the tracked set.
    pub fn ignore(mut self, ignore: impl Into<PathSpec>) -> Self {
        self.ignore = Some(ignore.into());
        self
    }

    pub fn rules(mut self, rules: IdentifierRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn artifact_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.artifact_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Resolve the tracked and ignored sets and bind the registry.
    pub fn build<R: ExtensionRegistry>(
        self,
        registry: R,
    ) -> Result<ExtensionReloader<R>, WatchError> {
        let project_root = std::fs::canonicalize(&self.project_root)
            .map_err(|e| WatchError::InvalidRoot {
                path: self.project_root.clone(),
                reason: e.to_string(),
            })?;
        if !project_root.is_dir() {
            return Err(WatchError::InvalidRoot {
                path: self.project_root,
                reason: "not a directory".to_string(),
            });
        }

        let (tracked, ignored) =
            resolver::resolve_tracked(&self.paths, self.ignore.as_ref(), &self.rules.extension);
        crate::debug_event!(
            "reloader",
            "resolved",
            "{} tracked, {} ignored",
            tracked.len(),
            ignored.len()
        );

        Ok(ExtensionReloader {
            paths: self.paths,
            ignore: self.ignore,
            project_root,
            tracked,
            ignored,
            rules: self.rules,
            artifact_dirs: self.artifact_dirs,
            policy: self.policy,
            debounce: self.debounce,
            debug: self.debug,
            first_load_done: false,
            registry,
        })
    }
}

//! Turns user-supplied path specifications into the set of tracked files.
//!
//! A spec is one path or a list of paths, each naming a file or a directory.
//! Directories contribute the files directly inside them that carry the
//! tracked extension; files contribute themselves whatever their extension.
//! Paths that exist as neither are dropped without error.

pub mod identity;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub use identity::{FileIdentity, same_file};

/// Canonical absolute paths of files eligible to trigger a load or reload.
pub type TrackedFiles = BTreeSet<PathBuf>;

/// One path or a list of paths, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    Single(PathBuf),
    Many(Vec<PathBuf>),
}

impl PathSpec {
    /// All paths in the spec, in the order given.
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Single(p) => std::slice::from_ref(p),
            Self::Many(ps) => ps,
        }
    }
}

impl From<&str> for PathSpec {
    fn from(p: &str) -> Self {
        Self::Single(PathBuf::from(p))
    }
}

impl From<PathBuf> for PathSpec {
    fn from(p: PathBuf) -> Self {
        Self::Single(p)
    }
}

impl From<&Path> for PathSpec {
    fn from(p: &Path) -> Self {
        Self::Single(p.to_path_buf())
    }
}

impl<P: Into<PathBuf>> From<Vec<P>> for PathSpec {
    fn from(ps: Vec<P>) -> Self {
        Self::Many(ps.into_iter().map(Into::into).collect())
    }
}

/// Shape of a spec, decided once before any expansion happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecShape {
    SingleDir,
    SingleFile,
    AllDirs,
    AllFiles,
    /// Some directories, some files, some neither. A single path that is
    /// neither a file nor a directory also lands here.
    Mixed,
}

impl SpecShape {
    /// Classify a spec by inspecting the filesystem.
    ///
    /// An empty list counts as `AllDirs` and resolves to nothing.
    pub fn classify(spec: &PathSpec) -> Self {
        match spec {
            PathSpec::Single(p) if p.is_dir() => Self::SingleDir,
            PathSpec::Single(p) if p.is_file() => Self::SingleFile,
            PathSpec::Single(_) => Self::Mixed,
            PathSpec::Many(ps) if ps.iter().all(|p| p.is_dir()) => Self::AllDirs,
            PathSpec::Many(ps) if ps.iter().all(|p| p.is_file()) => Self::AllFiles,
            PathSpec::Many(_) => Self::Mixed,
        }
    }
}

/// Resolve a spec into canonical absolute file paths.
///
/// `extension` is matched without the leading dot and only filters files
/// found by directory expansion. Directory expansion is non-recursive.
pub fn resolve(spec: &PathSpec, extension: &str) -> TrackedFiles {
    let paths = spec.paths();
    let shape = SpecShape::classify(spec);
    tracing::debug!("[resolver] {shape:?} spec with {} path(s)", paths.len());

    let mut out = TrackedFiles::new();
    match shape {
        SpecShape::SingleDir | SpecShape::AllDirs => {
            files_from_dirs(paths, extension, &mut out);
        }
        SpecShape::SingleFile | SpecShape::AllFiles => {
            existing_files(paths, &mut out);
        }
        SpecShape::Mixed => {
            existing_files(paths, &mut out);
            files_from_dirs(paths, extension, &mut out);
        }
    }
    out
}

/// Resolve the tracked spec and subtract the resolved ignore spec from it.
///
/// Returns `(tracked, ignored)`; the two sets are disjoint.
pub fn resolve_tracked(
    paths: &PathSpec,
    ignore: Option<&PathSpec>,
    extension: &str,
) -> (TrackedFiles, TrackedFiles) {
    let mut tracked = resolve(paths, extension);
    let ignored = match ignore {
        Some(spec) => resolve(spec, extension),
        None => return (tracked, TrackedFiles::new()),
    };

    tracked.retain(|p| !ignored.contains(p));
    (tracked, ignored)
}

/// Add every path that is an existing file, canonicalized.
fn existing_files(paths: &[PathBuf], out: &mut TrackedFiles) {
    for path in paths {
        if !path.is_file() {
            continue;
        }
        if let Ok(canonical) = std::fs::canonicalize(path) {
            out.insert(canonical);
        }
    }
}

/// Add the files directly inside each existing directory that carry `extension`.
fn files_from_dirs(paths: &[PathBuf], extension: &str, out: &mut TrackedFiles) {
    for dir in paths.iter().filter(|p| p.is_dir()) {
        let walker = ignore::WalkBuilder::new(dir)
            .standard_filters(false)
            .max_depth(Some(1))
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!("[resolver] {err}");
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }
            let path = entry.path();
            if !path.is_file() || !has_extension(path, extension) {
                continue;
            }
            if let Ok(canonical) = std::fs::canonicalize(path) {
                out.insert(canonical);
            }
        }
    }
}

/// Returns true if the file name of `path` ends in `.{extension}`.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

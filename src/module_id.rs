//! Derives the logical name a host registry uses for a unit from its file path.
//!
//! `root/cogs/admin/ban.py` becomes `cogs.admin.ban`: the root prefix is
//! removed component-wise, the tracked extension is dropped from the file
//! name, and the remaining components are joined with the namespace separator.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Logical identifier of a unit, as understood by the host registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Naming rules shared by path resolution and identifier derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRules {
    /// Tracked source extension, without the leading dot.
    pub extension: String,
    /// Namespace separator placed between path components.
    pub separator: String,
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self {
            extension: "py".to_string(),
            separator: ".".to_string(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("{path} is not under project root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{path} contains a component that is not valid UTF-8")]
    NonUtf8 { path: PathBuf },

    #[error("{path} names the project root itself, not a unit")]
    Empty { path: PathBuf },
}

/// Compute the identifier of `path` relative to `root`.
///
/// Both paths are expected in the same normalized form (the reloader passes
/// canonical paths for both). Prefix removal works on whole components, so
/// a root of `/srv/bot` never strips anything from `/srv/bot2/cog.py`.
pub fn derive(
    root: &Path,
    path: &Path,
    rules: &IdentifierRules,
) -> Result<ModuleId, IdentifierError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| IdentifierError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let mut parts: Vec<&str> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| IdentifierError::NonUtf8 {
                    path: path.to_path_buf(),
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            // A `..` after the root prefix means the path escapes it.
            _ => {
                return Err(IdentifierError::OutsideRoot {
                    path: path.to_path_buf(),
                    root: root.to_path_buf(),
                });
            }
        }
    }

    let Some(last) = parts.pop() else {
        return Err(IdentifierError::Empty {
            path: path.to_path_buf(),
        });
    };

    let suffix = format!(".{}", rules.extension);
    let stem = match last.strip_suffix(&suffix) {
        Some(stem) if !stem.is_empty() => stem,
        _ => last,
    };
    parts.push(stem);

    Ok(ModuleId(parts.join(&rules.separator)))
}

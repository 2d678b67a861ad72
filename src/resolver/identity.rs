use std::io;
use std::path::Path;

/// Filesystem identity of a file, independent of the string used to reach it.
///
/// Two paths with equal identities name the same file on disk even when one
/// goes through a symlink or carries `.`/`..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentity(Inner);

#[cfg(unix)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Inner {
    dev: u64,
    ino: u64,
}

#[cfg(not(unix))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Inner(std::path::PathBuf);

impl FileIdentity {
    /// Stat `path` (following symlinks) and capture its identity.
    #[cfg(unix)]
    pub fn of(path: &Path) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let meta = std::fs::metadata(path)?;
        Ok(Self(Inner {
            dev: meta.dev(),
            ino: meta.ino(),
        }))
    }

    /// Canonicalize `path` and use the result as its identity.
    #[cfg(not(unix))]
    pub fn of(path: &Path) -> io::Result<Self> {
        Ok(Self(Inner(std::fs::canonicalize(path)?)))
    }
}

/// Returns true if `a` and `b` name the same file on disk.
///
/// A path that cannot be stat'ed is never the same file as anything.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (FileIdentity::of(a), FileIdentity::of(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_same_path_is_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cog.py");
        fs::write(&file, "").unwrap();
        assert!(same_file(&file, &file));
    }

    #[test]
    fn test_dot_segments_do_not_break_identity() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let file = dir.path().join("cog.py");
        fs::write(&file, "").unwrap();

        let aliased = dir.path().join("sub").join("..").join(".").join("cog.py");
        assert!(same_file(&file, &aliased));
    }

    #[test]
    fn test_distinct_files_differ() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.py");
        let b = dir.path().join("b.py");
        fs::write(&a, "x").unwrap();
        fs::write(&b, "x").unwrap();
        assert!(!same_file(&a, &b));
    }

    #[test]
    fn test_missing_file_has_no_identity() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileIdentity::of(&dir.path().join("gone.py")).is_err());
    }

    #[test]
    fn test_missing_side_is_never_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cog.py");
        fs::write(&file, "").unwrap();
        let gone = dir.path().join("gone.py");

        assert!(!same_file(&file, &gone));
        assert!(!same_file(&gone, &file));
        assert!(!same_file(&gone, &gone));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_matches_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("cog.py");
        fs::write(&target, "").unwrap();
        let link = dir.path().join("alias.py");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(
            FileIdentity::of(&target).unwrap(),
            FileIdentity::of(&link).unwrap()
        );
        assert!(same_file(&link, &target));
    }
}

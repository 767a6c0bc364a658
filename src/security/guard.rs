/// Path safety checks run before anything is destroyed
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{ShredError, Stage};

/// Refuse targets that do not exist, are symlinks, or share their inode
///
/// The path itself is inspected with `symlink_metadata`, so a link is
/// never resolved to whatever it points at.
pub fn validate_for_shred(path: &Path) -> Result<fs::Metadata, ShredError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ShredError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(ShredError::io(Stage::Metadata, path, e)),
    };

    if meta.file_type().is_symlink() {
        return Err(ShredError::SymlinkRefused(path.to_path_buf()));
    }

    // directories always carry several links on Unix
    let links = link_count(&meta);
    if !meta.is_dir() && links > 1 {
        return Err(ShredError::HardlinkRefused {
            path: path.to_path_buf(),
            links,
        });
    }

    Ok(meta)
}

#[cfg(unix)]
fn link_count(meta: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.nlink()
}

// Stable std has no link count on Windows; directories and files are treated
// as singly linked there.
#[cfg(not(unix))]
fn link_count(_meta: &fs::Metadata) -> u64 {
    1
}

/// True when `candidate` equals `root` or lives somewhere below it
pub fn is_contained(candidate: &Path, root: &Path) -> bool {
    let candidate = normalize(candidate);
    let root = normalize(root);
    candidate.starts_with(&root)
}

/// Absolute, symlink-resolved form of a path that may not exist yet
///
/// The longest existing ancestor is canonicalized and the remaining
/// components are appended lexically.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut existing = absolute.clone();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        if let Ok(mut resolved) = existing.canonicalize() {
            for part in tail.iter().rev() {
                match Path::new(part).components().next() {
                    Some(Component::ParentDir) => {
                        resolved.pop();
                    }
                    Some(Component::CurDir) | None => {}
                    Some(_) => resolved.push(part),
                }
            }
            return resolved;
        }
        match existing.components().next_back() {
            Some(last @ (Component::Normal(_) | Component::ParentDir | Component::CurDir)) => {
                tail.push(last.as_os_str().to_os_string());
                existing.pop();
            }
            _ => return absolute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = validate_for_shred(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ShredError::NotFound(_)));
    }

    #[test]
    fn test_regular_file_passes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, b"data").unwrap();
        let meta = validate_for_shred(&path).unwrap();
        assert_eq!(meta.len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_refused() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.txt");
        let link = dir.path().join("link.txt");
        fs::write(&target, b"data").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let err = validate_for_shred(&link).unwrap_err();
        assert!(matches!(err, ShredError::SymlinkRefused(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlink_refused() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("a.txt");
        fs::write(&original, b"shared").unwrap();
        fs::hard_link(&original, dir.path().join("b.txt")).unwrap();

        match validate_for_shred(&original).unwrap_err() {
            ShredError::HardlinkRefused { links, .. } => assert_eq!(links, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_containment() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tree");
        fs::create_dir(&root).unwrap();

        assert!(is_contained(&root, &root));
        assert!(is_contained(&root.join("kept/deeper"), &root));
        assert!(is_contained(&root.join("x/../y"), &root));
        assert!(!is_contained(&dir.path().join("tree-sibling"), &root));
        assert!(!is_contained(&root.join(".."), &root));
    }
}

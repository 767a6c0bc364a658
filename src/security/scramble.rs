/// Rename a file to a random sibling name before it is overwritten
use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::error::{ShredError, Stage};

/// Random bytes behind each scrambled name (16 hex characters)
pub const NAME_BYTES: usize = 8;

/// Leading marker of every scrambled name
pub const NAME_PREFIX: char = '~';

const MAX_ATTEMPTS: usize = 8;

/// Draw a fresh scrambled file name, e.g. `~3fa4c0917be2d865`
pub fn random_name() -> String {
    let mut bytes = [0u8; NAME_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("{}{}", NAME_PREFIX, hex::encode(bytes))
}

/// Atomically rename `path` to a random name in the same directory
///
/// Names already taken in the directory are skipped so the rename never
/// replaces an existing entry.
pub fn scramble(path: &Path) -> Result<PathBuf, ShredError> {
    for _ in 0..MAX_ATTEMPTS {
        let candidate = path.with_file_name(random_name());
        if fs::symlink_metadata(&candidate).is_ok() {
            continue;
        }

        fs::rename(path, &candidate).map_err(|e| ShredError::io(Stage::Rename, path, e))?;
        tracing::debug!(from = %path.display(), to = %candidate.display(), "scrambled file name");
        return Ok(candidate);
    }

    Err(ShredError::io(
        Stage::Rename,
        path,
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "no free scrambled name in directory",
        ),
    ))
}

/// True if `name` has the shape produced by [`random_name`]
pub fn is_scrambled_name(name: &str) -> bool {
    name.strip_prefix(NAME_PREFIX).is_some_and(|rest| {
        rest.len() == NAME_BYTES * 2 && rest.bytes().all(|b| b.is_ascii_hexdigit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_random_name_shape() {
        let name = random_name();
        assert!(is_scrambled_name(&name), "bad name {name}");
        assert_ne!(random_name(), random_name());
    }

    #[test]
    fn test_scramble_moves_content_to_sibling() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("secret-plans.docx");
        fs::write(&original, b"the plans").unwrap();

        let scrambled = scramble(&original).unwrap();

        assert!(!original.exists());
        assert_eq!(scrambled.parent(), original.parent());
        let name = scrambled.file_name().unwrap().to_str().unwrap();
        assert!(is_scrambled_name(name));
        assert_eq!(fs::read(&scrambled).unwrap(), b"the plans");
    }

    #[test]
    fn test_scramble_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = scramble(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, ShredError::Io { stage: Stage::Rename, .. }));
    }
}

/// Configuration loader
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::schema::Config;
use crate::error::ConfigError;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "KC_SHRED_CONFIG";

/// Load configuration
///
/// Lookup order:
/// 1. `explicit` path, if given
/// 2. `$KC_SHRED_CONFIG`
/// 3. `<executable>.config` next to the binary; defaults if it is absent
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return load_from(path);
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return load_from(Path::new(&path));
    }

    let adjacent = adjacent_config_path()?;
    match load_from(&adjacent) {
        Err(ConfigError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %adjacent.display(), "no config file, using defaults");
            Ok(Config::default())
        }
        other => other,
    }
}

/// `<executable>.config`, e.g. `kc-shred.config`
pub fn adjacent_config_path() -> Result<PathBuf, ConfigError> {
    let exe_path = std::env::current_exe().map_err(ConfigError::Executable)?;
    Ok(PathBuf::from(format!("{}.config", exe_path.display())))
}

/// Read, parse and validate one config file
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "passes": 5, "log_level": "debug" }}"#).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.passes, 5);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ invalid json }}").unwrap();

        let result = load_from(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "passes": 99 }}"#).unwrap();

        assert!(matches!(load_from(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load_config(Some(&dir.path().join("absent.config")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}

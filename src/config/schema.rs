/// Configuration schema for the shredder
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::security::{DEFAULT_BUFFER_SIZE, DEFAULT_PASSES, MAX_BUFFER_SIZE, MAX_PASSES, MIN_BUFFER_SIZE, MIN_PASSES};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Overwrite passes for explicit shred requests (1-35)
    #[serde(default = "default_passes")]
    pub passes: u32,

    /// Chunk size used while overwriting, in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Log level: "trace", "debug", "info", "warn", "error", "none"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Exit-time cleanup policy
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// What the cleanup manager does when the process goes down
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Shred registered paths on wipe. Off unless asked for.
    #[serde(default)]
    pub shred_paths: bool,

    /// Passes used when shredding registered paths
    #[serde(default = "default_passes")]
    pub passes: u32,

    /// Use a single random pass on SSD/flash, `passes` on spinning disks
    #[serde(default = "default_true")]
    pub adaptive_passes: bool,

    /// Clear the system clipboard (and its history where supported)
    #[serde(default = "default_true")]
    pub clear_clipboard: bool,

    /// Terminate the process after a panic has triggered the wipe
    #[serde(default = "default_true")]
    pub exit_on_panic: bool,

    /// Extra paths registered for wiping at startup
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            passes: default_passes(),
            buffer_size: default_buffer_size(),
            log_level: default_log_level(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            shred_paths: false,
            passes: default_passes(),
            adaptive_passes: true,
            clear_clipboard: true,
            exit_on_panic: true,
            paths: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_passes() -> u32 {
    DEFAULT_PASSES
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pass_range = MIN_PASSES..=MAX_PASSES;

        if !pass_range.contains(&self.passes) {
            return Err(ConfigError::Invalid(format!(
                "passes must be {MIN_PASSES}-{MAX_PASSES}, got {}",
                self.passes
            )));
        }

        if !pass_range.contains(&self.cleanup.passes) {
            return Err(ConfigError::Invalid(format!(
                "cleanup.passes must be {MIN_PASSES}-{MAX_PASSES}, got {}",
                self.cleanup.passes
            )));
        }

        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(ConfigError::Invalid(format!(
                "buffer_size must be {MIN_BUFFER_SIZE}-{MAX_BUFFER_SIZE} bytes, got {}",
                self.buffer_size
            )));
        }

        if crate::logging::parse_level(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level {:?}",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// Error types for shredding and cleanup
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Step of the shred pipeline an I/O failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Open,
    Write,
    Sync,
    Rename,
    Move,
    Remove,
    Walk,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Metadata => "metadata",
            Stage::Open => "open",
            Stage::Write => "write",
            Stage::Sync => "sync",
            Stage::Rename => "rename",
            Stage::Move => "move",
            Stage::Remove => "remove",
            Stage::Walk => "walk",
        };
        f.write_str(name)
    }
}

/// Everything that can stop a shred
#[derive(Debug, thiserror::Error)]
pub enum ShredError {
    #[error("target does not exist: {0}")]
    NotFound(PathBuf),

    #[error("refusing to shred symbolic link: {0}")]
    SymlinkRefused(PathBuf),

    #[error("refusing to shred hard-linked file ({links} links): {path}")]
    HardlinkRefused { path: PathBuf, links: u64 },

    #[error("passes must be 1-{max}, got {passes}", max = crate::security::MAX_PASSES)]
    InvalidPassCount { passes: u32 },

    #[error("keep_root must be set when keep_bytes is enabled")]
    MissingDestination,

    #[error("keep_root {keep_root} cannot be inside target directory {target}")]
    ContainmentViolation { keep_root: PathBuf, target: PathBuf },

    #[error("target is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("target is not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("{stage} failed on {path}: {source}")]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed on {path}: {source}")]
    PartialDirectoryFailure {
        path: PathBuf,
        #[source]
        source: Box<ShredError>,
    },
}

impl ShredError {
    pub fn io(stage: Stage, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ShredError::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    /// True for failures raised before any byte of the target was touched
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            ShredError::Io { .. } | ShredError::PartialDirectoryFailure { .. }
        )
    }
}

/// Configuration loading and validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to get executable path: {0}")]
    Executable(#[source] io::Error),
}

/// Failures while installing termination hooks
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("termination hooks already installed")]
    AlreadyInstalled,

    #[error("failed to install signal handling: {0}")]
    Signal(String),

    #[error("failed to register exit hook")]
    AtExit,

    #[error("failed to spawn signal thread: {0}")]
    Thread(#[source] io::Error),
}

/// Clipboard scrubbing failures
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("no clipboard tool available")]
    Unavailable,

    #[error("clipboard command {command} failed: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("clipboard command {command} exited with {status}")]
    Status {
        command: &'static str,
        status: std::process::ExitStatus,
    },

    #[error("clipboard API call failed: {0}")]
    Api(&'static str),
}

/// Secure shredding of files and directory trees
///
/// A single file goes through:
/// 1. Validate (path guard, pass count, destination, device warning)
/// 2. Scramble the name
/// 3. Overwrite every pass, syncing after each
/// 4. Delete it, or move the garbled bytes under `keep_root`
///
/// A failure at any step stops the file where it is. Nothing is retried, so
/// a file can be left renamed but only partly overwritten.
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::guard::{is_contained, normalize, validate_for_shred};
use super::overwrite::overwrite;
use super::scramble::{random_name, scramble};
use super::{check_passes, DEFAULT_BUFFER_SIZE, DEFAULT_PASSES};
use crate::error::{ShredError, Stage};
use crate::utils::device::{platform_oracle, DeviceOracle};

/// Progress callback receiving `(completed, total)` pass counts
pub type Progress<'a> = Box<dyn FnMut(u64, u64) + 'a>;

/// What to shred and how
pub struct ShredRequest<'a> {
    pub target: PathBuf,
    pub passes: u32,
    pub keep_bytes: bool,
    pub keep_root: Option<PathBuf>,
    pub progress: Option<Progress<'a>>,
}

impl<'a> ShredRequest<'a> {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            passes: DEFAULT_PASSES,
            keep_bytes: false,
            keep_root: None,
            progress: None,
        }
    }

    pub fn passes(mut self, passes: u32) -> Self {
        self.passes = passes;
        self
    }

    pub fn keep_bytes(mut self, keep: bool) -> Self {
        self.keep_bytes = keep;
        self
    }

    /// Keep the garbled bytes under `root` instead of deleting them
    pub fn keep_bytes_in(mut self, root: impl Into<PathBuf>) -> Self {
        self.keep_bytes = true;
        self.keep_root = Some(root.into());
        self
    }

    pub fn progress(mut self, progress: impl FnMut(u64, u64) + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    fn destination(&self) -> Result<Option<&Path>, ShredError> {
        match (self.keep_bytes, self.keep_root.as_deref()) {
            (false, _) => Ok(None),
            (true, Some(root)) => Ok(Some(root)),
            (true, None) => Err(ShredError::MissingDestination),
        }
    }
}

/// Result of a shred, as shown to the caller
#[derive(Debug)]
pub struct ShredOutcome {
    pub success: bool,
    pub detail: String,
    /// Target looked like it sits on non-rotational storage
    pub non_rotational: bool,
    /// Final location of the garbled file when bytes were kept
    pub kept_at: Option<PathBuf>,
    error: Option<ShredError>,
}

impl ShredOutcome {
    fn done(detail: String, non_rotational: bool, kept_at: Option<PathBuf>) -> Self {
        Self {
            success: true,
            detail,
            non_rotational,
            kept_at,
            error: None,
        }
    }

    fn failed(prefix: &str, error: ShredError, non_rotational: bool) -> Self {
        Self {
            success: false,
            detail: format!("{prefix}: {error}"),
            non_rotational,
            kept_at: None,
            error: Some(error),
        }
    }

    /// The error behind a failed outcome
    pub fn error(&self) -> Option<&ShredError> {
        self.error.as_ref()
    }
}

/// Where kept bytes go
#[derive(Clone, Copy)]
struct Destination<'p> {
    root: &'p Path,
    /// Directory being shredded; relative layout is taken from here
    base: Option<&'p Path>,
}

impl Destination<'_> {
    fn path_for(&self, scrambled: &Path) -> PathBuf {
        let name = scrambled.file_name().unwrap_or_default();
        let parent = scrambled.parent().unwrap_or(Path::new(""));

        let relative_dir = match self.base {
            Some(base) => parent.strip_prefix(base).unwrap_or(Path::new("")).to_path_buf(),
            None if normalize(parent) == normalize(self.root) => PathBuf::new(),
            None => strip_root(&normalize(parent)),
        };

        self.root.join(relative_dir).join(name)
    }
}

/// Drop prefix and root components so an absolute path can be nested
fn strip_root(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// Shreds files and directories using one device oracle and chunk size
pub struct Shredder {
    buffer_size: usize,
    oracle: Box<dyn DeviceOracle>,
}

impl Default for Shredder {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl Shredder {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            oracle: platform_oracle(),
        }
    }

    pub fn with_oracle(mut self, oracle: impl DeviceOracle + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }

    /// Best-effort: does `path` live on SSD/flash?
    pub fn is_non_rotational(&self, path: &Path) -> bool {
        self.oracle.is_non_rotational(path)
    }

    /// Shred one file; never panics, failures come back in the outcome
    pub fn shred_file(&self, mut request: ShredRequest<'_>) -> ShredOutcome {
        let mut progress = request.progress.take();
        let mut report = |done: u64, total: u64| {
            if let Some(cb) = progress.as_mut() {
                cb(done, total);
            }
        };

        let mut non_rotational = false;
        let result = (|| -> Result<Option<PathBuf>, ShredError> {
            check_passes(request.passes)?;
            let destination = request.destination()?.map(|root| Destination { root, base: None });

            non_rotational = self.warn_if_non_rotational(&request.target);
            self.run_file(&request.target, request.passes, destination, &mut report)
        })();

        match result {
            Ok(Some(dst)) => {
                let detail = format!("shredded and moved to {}", dst.display());
                ShredOutcome::done(detail, non_rotational, Some(dst))
            }
            Ok(None) => ShredOutcome::done("shredded & deleted".to_string(), non_rotational, None),
            Err(e) => {
                log_failure("shred_file", &request.target, &e);
                ShredOutcome::failed("shred error", e, non_rotational)
            }
        }
    }

    /// Shred every regular file below a directory, then remove the tree
    ///
    /// Total progress is `files × passes`, fixed before the first file is
    /// touched. The first failing file aborts the whole directory.
    pub fn shred_directory(&self, mut request: ShredRequest<'_>) -> ShredOutcome {
        let mut progress = request.progress.take();
        let mut report = |done: u64, total: u64| {
            if let Some(cb) = progress.as_mut() {
                cb(done, total);
            }
        };

        let mut non_rotational = false;
        let result = (|| -> Result<usize, ShredError> {
            check_passes(request.passes)?;
            let keep_root = request.destination()?;
            check_directory(&request.target)?;
            if let Some(root) = keep_root {
                if is_contained(root, &request.target) {
                    return Err(ShredError::ContainmentViolation {
                        keep_root: root.to_path_buf(),
                        target: request.target.clone(),
                    });
                }
            }

            non_rotational = self.warn_if_non_rotational(&request.target);
            self.run_directory(&request.target, request.passes, keep_root, &mut report)
        })();

        match result {
            Ok(files) => {
                tracing::info!(directory = %request.target.display(), files, "directory shredded");
                ShredOutcome::done("directory shredded".to_string(), non_rotational, None)
            }
            Err(e) => {
                log_failure("shred_directory", &request.target, &e);
                ShredOutcome::failed("dir-shred error", e, non_rotational)
            }
        }
    }

    /// Shred whatever is at `path`, file or directory; missing paths are skipped
    pub fn shred_path(&self, path: &Path, passes: u32) -> Result<(), ShredError> {
        check_passes(passes)?;
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "nothing to shred");
                return Ok(());
            }
            Err(e) => return Err(ShredError::io(Stage::Metadata, path, e)),
        };

        if meta.is_dir() {
            self.run_directory(path, passes, None, &mut |_, _| {})?;
        } else {
            self.run_file(path, passes, None, &mut |_, _| {})?;
        }
        Ok(())
    }

    fn warn_if_non_rotational(&self, path: &Path) -> bool {
        let non_rotational = self.oracle.is_non_rotational(path);
        if non_rotational {
            tracing::warn!(
                path = %path.display(),
                "device looks like SSD; overwrite may be ineffective"
            );
        }
        non_rotational
    }

    fn run_file(
        &self,
        path: &Path,
        passes: u32,
        destination: Option<Destination<'_>>,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Option<PathBuf>, ShredError> {
        let meta = validate_for_shred(path)?;
        if !meta.is_file() {
            return Err(ShredError::NotAFile(path.to_path_buf()));
        }

        let scrambled = scramble(path)?;
        overwrite(&scrambled, passes, self.buffer_size, progress)?;

        match destination {
            None => {
                fs::remove_file(&scrambled).map_err(|e| ShredError::io(Stage::Remove, &scrambled, e))?;
                tracing::debug!(path = %path.display(), passes, "shredded & deleted");
                Ok(None)
            }
            Some(destination) => {
                let dst = relocate(&scrambled, &destination.path_for(&scrambled))?;
                tracing::debug!(path = %path.display(), to = %dst.display(), "shredded and moved");
                Ok(Some(dst))
            }
        }
    }

    fn run_directory(
        &self,
        directory: &Path,
        passes: u32,
        keep_root: Option<&Path>,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<usize, ShredError> {
        let files = collect_files(directory)?;
        let passes_per_file = passes as u64;
        let total = files.len() as u64 * passes_per_file;
        let destination = keep_root.map(|root| Destination {
            root,
            base: Some(directory),
        });

        tracing::info!(directory = %directory.display(), files = files.len(), passes, "shredding directory");

        for (index, file) in files.iter().enumerate() {
            let done_before = index as u64 * passes_per_file;
            self.run_file(file, passes, destination, &mut |pass, _| {
                progress(done_before + pass, total)
            })
            .map_err(|e| ShredError::PartialDirectoryFailure {
                path: file.clone(),
                source: Box::new(e),
            })?;
        }

        if keep_root.is_none() {
            fs::remove_dir_all(directory).map_err(|e| ShredError::io(Stage::Remove, directory, e))?;
        } else {
            prune_empty_dirs(directory);
        }
        Ok(files.len())
    }
}

/// Shred one file with a default [`Shredder`]
pub fn shred_file(request: ShredRequest<'_>) -> ShredOutcome {
    Shredder::default().shred_file(request)
}

/// Shred a directory tree with a default [`Shredder`]
pub fn shred_directory(request: ShredRequest<'_>) -> ShredOutcome {
    Shredder::default().shred_directory(request)
}

fn log_failure(operation: &str, target: &Path, error: &ShredError) {
    if error.is_rejection() {
        tracing::warn!(operation, target_path = %target.display(), %error, "shred refused");
    } else {
        tracing::error!(operation, target_path = %target.display(), %error, "shred failed");
    }
}

fn check_directory(path: &Path) -> Result<(), ShredError> {
    let meta = validate_for_shred(path)?;
    if !meta.is_dir() {
        return Err(ShredError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Every regular file below `root`, depth first, in name order
///
/// Symlinks are neither followed nor collected.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>, ShredError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .map_err(|e| ShredError::io(Stage::Walk, &dir, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ShredError::io(Stage::Walk, &dir, e))?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| ShredError::io(Stage::Walk, &path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            } else {
                tracing::debug!(path = %path.display(), "skipping non-regular entry");
            }
        }
    }

    Ok(files)
}

/// Move the garbled file to `dst`, creating parents; never overwrites an existing entry
fn relocate(from: &Path, dst: &Path) -> Result<PathBuf, ShredError> {
    let parent = dst.parent().unwrap_or(Path::new(""));
    fs::create_dir_all(parent).map_err(|e| ShredError::io(Stage::Move, parent, e))?;

    if dst == from {
        return Ok(dst.to_path_buf());
    }

    let mut dst = dst.to_path_buf();
    while fs::symlink_metadata(&dst).is_ok() {
        dst.set_file_name(random_name());
    }

    match fs::rename(from, &dst) {
        Ok(()) => Ok(dst),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            // content is already garbled, so a copy leaves nothing readable behind
            fs::copy(from, &dst).map_err(|e| ShredError::io(Stage::Move, &dst, e))?;
            fs::File::open(&dst)
                .and_then(|f| f.sync_all())
                .map_err(|e| ShredError::io(Stage::Sync, &dst, e))?;
            fs::remove_file(from).map_err(|e| ShredError::io(Stage::Remove, from, e))?;
            Ok(dst)
        }
        Err(e) => Err(ShredError::io(Stage::Move, from, e)),
    }
}

/// Remove directories left empty after files were moved out
fn prune_empty_dirs(dir: &Path) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                prune_empty_dirs(&entry.path());
            }
        }
    }
    if fs::remove_dir(dir).is_err() {
        tracing::debug!(dir = %dir.display(), "left non-empty directory in place");
    }
}

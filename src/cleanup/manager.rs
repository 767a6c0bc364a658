/// Process-wide secret registry and exactly-once wipe
///
/// Application code registers paths and secret buffers from any thread.
/// Every termination path (signal, panic, exit, explicit user action)
/// converges on [`CleanupManager::raise`], which runs the wipe body at most
/// once per manager: `Idle -> Running -> Done`, with `Done` absorbing every
/// later trigger.
use std::cell::Cell;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, ReentrantMutex};

use super::clipboard::{system_clipboard, ClipboardScrubber};
use super::secret::SecretBuffer;
use crate::config::{CleanupConfig, Config};
use crate::security::{Shredder, DEFAULT_PASSES};

/// What set the wipe off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Termination signal or console control event, by number
    Signal(i32),
    Panic,
    Exit,
    User,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Signal(signum) => write!(f, "signal {signum}"),
            Trigger::Panic => f.write_str("panic"),
            Trigger::Exit => f.write_str("exit"),
            Trigger::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipePhase {
    Idle,
    Running,
    Done,
}

/// Which wipe steps run
#[derive(Debug, Clone)]
pub struct WipePolicy {
    pub shred_paths: bool,
    pub passes: u32,
    pub adaptive_passes: bool,
    pub clear_clipboard: bool,
}

impl Default for WipePolicy {
    fn default() -> Self {
        Self {
            shred_paths: false,
            passes: DEFAULT_PASSES,
            adaptive_passes: true,
            clear_clipboard: true,
        }
    }
}

impl From<&CleanupConfig> for WipePolicy {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            shred_paths: config.shred_paths,
            passes: config.passes,
            adaptive_passes: config.adaptive_passes,
            clear_clipboard: config.clear_clipboard,
        }
    }
}

/// What the one executed wipe did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeReport {
    pub trigger: Trigger,
    pub paths_shredded: usize,
    pub paths_failed: usize,
    pub secrets_scrubbed: usize,
    pub bytes_scrubbed: usize,
    pub clipboard_cleared: bool,
}

impl WipeReport {
    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            paths_shredded: 0,
            paths_failed: 0,
            secrets_scrubbed: 0,
            bytes_scrubbed: 0,
            clipboard_cleared: false,
        }
    }
}

#[derive(Default)]
struct Registry {
    paths: BTreeSet<PathBuf>,
    secrets: Vec<SecretBuffer>,
}

/// Registry of wipe targets plus the one-shot wipe
///
/// Build one in the composition root, share it as `Arc<CleanupManager>`
/// with the termination hooks.
pub struct CleanupManager {
    registry: Mutex<Registry>,
    // reentrant so a panic raised inside the wipe body sees `Running`
    // instead of deadlocking in the panic hook
    gate: ReentrantMutex<Cell<WipePhase>>,
    policy: WipePolicy,
    shredder: Shredder,
    clipboard: Box<dyn ClipboardScrubber>,
}

impl CleanupManager {
    pub fn new(policy: WipePolicy) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            gate: ReentrantMutex::new(Cell::new(WipePhase::Idle)),
            policy,
            shredder: Shredder::default(),
            clipboard: system_clipboard(),
        }
    }

    /// Manager for a loaded config, with the configured paths registered
    pub fn from_config(config: &Config) -> Self {
        let manager = Self::new(WipePolicy::from(&config.cleanup))
            .with_shredder(Shredder::new(config.buffer_size));
        manager.add_paths(config.cleanup.paths.iter().cloned());
        manager
    }

    pub fn with_clipboard(mut self, clipboard: impl ClipboardScrubber + 'static) -> Self {
        self.clipboard = Box::new(clipboard);
        self
    }

    pub fn with_shredder(mut self, shredder: Shredder) -> Self {
        self.shredder = shredder;
        self
    }

    pub fn policy(&self) -> &WipePolicy {
        &self.policy
    }

    /// Register paths to shred on wipe (when the policy allows it)
    pub fn add_paths<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        // caller code may panic, and the panic hook wipes; never run it under the lock
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        self.registry.lock().paths.extend(paths);
    }

    /// Hand a secret over; it is zero-filled when the wipe runs
    ///
    /// Once the wipe is done the secret is zero-filled right here instead.
    pub fn add_secret(&self, secret: impl Into<SecretBuffer>) {
        let secret = secret.into();
        let gate = self.gate.lock();
        if gate.get() == WipePhase::Done {
            let bytes = secret.release();
            tracing::debug!(bytes, "secret registered after wipe, released immediately");
            return;
        }
        self.registry.lock().secrets.push(secret);
    }

    pub fn registered_paths(&self) -> Vec<PathBuf> {
        self.registry.lock().paths.iter().cloned().collect()
    }

    pub fn pending_secrets(&self) -> usize {
        self.registry.lock().secrets.len()
    }

    /// Current phase; blocks while another thread is wiping
    pub fn phase(&self) -> WipePhase {
        self.gate.lock().get()
    }

    /// Explicit user-initiated wipe
    pub fn wipe(&self) -> Option<WipeReport> {
        self.raise(Trigger::User)
    }

    /// Run the wipe if nothing has run it yet
    ///
    /// Returns the report for the call that executed the body and `None`
    /// for every other call. Concurrent callers wait until the running
    /// wipe is finished.
    pub fn raise(&self, trigger: Trigger) -> Option<WipeReport> {
        let gate = self.gate.lock();
        match gate.get() {
            WipePhase::Idle => {}
            WipePhase::Running => {
                tracing::debug!(%trigger, "wipe already running on this thread");
                return None;
            }
            WipePhase::Done => {
                tracing::debug!(%trigger, "wipe already done");
                return None;
            }
        }
        gate.set(WipePhase::Running);
        tracing::info!(%trigger, "wipe started");

        // snapshot, so registration keeps working while we iterate
        let (paths, secrets) = {
            let mut registry = self.registry.lock();
            let paths: Vec<PathBuf> = registry.paths.iter().cloned().collect();
            (paths, std::mem::take(&mut registry.secrets))
        };

        let mut report = WipeReport::new(trigger);

        // secrets and clipboard before paths: under `panic = "abort"` a
        // panicking step ends the process and no later step runs
        for secret in secrets {
            report.bytes_scrubbed += secret.release();
            report.secrets_scrubbed += 1;
        }

        if self.policy.clear_clipboard {
            match guarded("clear clipboard", || self.clipboard.clear()) {
                Some(Ok(())) => report.clipboard_cleared = true,
                Some(Err(e)) => tracing::warn!(error = %e, "failed to clear clipboard"),
                None => {}
            }
            if let Some(Err(e)) = guarded("clear clipboard history", || self.clipboard.clear_history()) {
                tracing::warn!(error = %e, "failed to clear clipboard history");
            }
        }

        if self.policy.shred_paths {
            for path in &paths {
                let outcome = guarded("shred path", || {
                    self.shredder.shred_path(path, self.passes_for(path))
                });
                match outcome {
                    Some(Ok(())) => report.paths_shredded += 1,
                    Some(Err(e)) => {
                        report.paths_failed += 1;
                        tracing::error!(path = %path.display(), error = %e, "failed to shred registered path");
                    }
                    None => report.paths_failed += 1,
                }
            }
        } else if !paths.is_empty() {
            tracing::debug!(count = paths.len(), "path shredding disabled, leaving registered paths");
        }

        gate.set(WipePhase::Done);
        tracing::info!(
            %trigger,
            shredded = report.paths_shredded,
            failed = report.paths_failed,
            secrets = report.secrets_scrubbed,
            clipboard = report.clipboard_cleared,
            "wipe finished"
        );
        Some(report)
    }

    /// Single random pass on SSD/flash when adaptive, configured passes otherwise
    fn passes_for(&self, path: &Path) -> u32 {
        if self.policy.adaptive_passes && self.shredder.is_non_rotational(path) {
            1
        } else {
            self.policy.passes
        }
    }
}

/// Run one wipe step, swallowing a panic so the remaining steps still run
fn guarded<T>(step: &str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!(step, "wipe step panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClipboardError;
    use crate::utils::device::{AssumeRotational, DeviceOracle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct CountingClipboard {
        clears: Arc<AtomicUsize>,
        histories: Arc<AtomicUsize>,
    }

    impl ClipboardScrubber for CountingClipboard {
        fn clear(&self) -> Result<(), ClipboardError> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn clear_history(&self) -> Result<(), ClipboardError> {
            self.histories.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl ClipboardScrubber for BrokenClipboard {
        fn clear(&self) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable)
        }
    }

    struct AlwaysSsd;

    impl DeviceOracle for AlwaysSsd {
        fn is_non_rotational(&self, _path: &Path) -> bool {
            true
        }
    }

    fn manager(policy: WipePolicy, clipboard: CountingClipboard) -> CleanupManager {
        CleanupManager::new(policy)
            .with_shredder(Shredder::new(4096).with_oracle(AssumeRotational))
            .with_clipboard(clipboard)
    }

    #[test]
    fn test_wipe_runs_once() {
        let clipboard = CountingClipboard::default();
        let mgr = manager(WipePolicy::default(), clipboard.clone());
        mgr.add_secret(vec![1u8; 32]);

        let report = mgr.wipe().unwrap();
        assert_eq!(report.trigger, Trigger::User);
        assert_eq!(report.secrets_scrubbed, 1);
        assert_eq!(report.bytes_scrubbed, 32);
        assert!(report.clipboard_cleared);

        assert!(mgr.wipe().is_none());
        assert!(mgr.raise(Trigger::Exit).is_none());
        assert_eq!(mgr.phase(), WipePhase::Done);
        assert_eq!(clipboard.clears.load(Ordering::SeqCst), 1);
        assert_eq!(clipboard.histories.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_wipe_executes_once() {
        let clipboard = CountingClipboard::default();
        let mgr = Arc::new(manager(WipePolicy::default(), clipboard.clone()));
        mgr.add_secret(vec![7u8; 16]);

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let mgr = Arc::clone(&mgr);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let trigger = if i % 2 == 0 { Trigger::Signal(15) } else { Trigger::Panic };
                    mgr.raise(trigger)
                })
            })
            .collect();

        let reports: Vec<WipeReport> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].secrets_scrubbed, 1);
        assert_eq!(clipboard.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_path_shredding_is_off_by_default() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("chat.log");
        std::fs::write(&log, b"who said what").unwrap();

        let mgr = manager(WipePolicy::default(), CountingClipboard::default());
        mgr.add_paths([&log]);
        let report = mgr.wipe().unwrap();

        assert_eq!(report.paths_shredded, 0);
        assert!(log.exists());
    }

    #[test]
    fn test_policy_shreds_paths_and_survives_failures() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("chat.log");
        let tmp = dir.path().join("tmp");
        std::fs::write(&log, b"who said what").unwrap();
        std::fs::create_dir(&tmp).unwrap();
        std::fs::write(tmp.join("draft"), b"draft").unwrap();

        let policy = WipePolicy {
            shred_paths: true,
            passes: 2,
            ..WipePolicy::default()
        };
        let mgr = CleanupManager::new(policy)
            .with_shredder(Shredder::new(4096).with_oracle(AlwaysSsd))
            .with_clipboard(BrokenClipboard);
        mgr.add_paths([log.clone(), tmp.clone(), dir.path().join("missing")]);
        mgr.add_secret(&b"k"[..]);

        #[cfg(unix)]
        {
            let shared = dir.path().join("shared");
            std::fs::write(&shared, b"x").unwrap();
            std::fs::hard_link(&shared, dir.path().join("shared-2")).unwrap();
            mgr.add_paths([shared]);
        }

        let report = mgr.wipe().unwrap();

        assert!(!log.exists());
        assert!(!tmp.exists());
        assert_eq!(report.paths_shredded, 3);
        #[cfg(unix)]
        assert_eq!(report.paths_failed, 1);
        assert_eq!(report.secrets_scrubbed, 1);
        assert!(!report.clipboard_cleared);
    }

    #[test]
    fn test_adaptive_passes() {
        let policy = WipePolicy {
            passes: 7,
            ..WipePolicy::default()
        };
        let ssd = CleanupManager::new(policy.clone())
            .with_shredder(Shredder::new(4096).with_oracle(AlwaysSsd));
        let hdd = CleanupManager::new(policy.clone())
            .with_shredder(Shredder::new(4096).with_oracle(AssumeRotational));
        let fixed = CleanupManager::new(WipePolicy {
            adaptive_passes: false,
            ..policy
        })
        .with_shredder(Shredder::new(4096).with_oracle(AlwaysSsd));

        let path = Path::new("/anywhere");
        assert_eq!(ssd.passes_for(path), 1);
        assert_eq!(hdd.passes_for(path), 7);
        assert_eq!(fixed.passes_for(path), 7);
    }

    #[test]
    fn test_late_secret_is_released_immediately() {
        let mgr = manager(WipePolicy::default(), CountingClipboard::default());
        mgr.wipe();
        mgr.add_secret(vec![9u8; 4]);
        mgr.add_paths(["/var/tmp/late"]);

        assert_eq!(mgr.pending_secrets(), 0);
        assert_eq!(mgr.registered_paths(), vec![PathBuf::from("/var/tmp/late")]);
    }

    #[test]
    fn test_wipe_from_inside_add_paths() {
        // the panic hook calls `raise` on the registering thread
        let mgr = manager(WipePolicy::default(), CountingClipboard::default());
        mgr.add_secret(vec![5u8; 8]);

        let mut report = None;
        mgr.add_paths(["/tmp/one", "/tmp/two"].into_iter().enumerate().map(|(i, p)| {
            if i == 1 {
                report = mgr.raise(Trigger::Panic);
            }
            p
        }));

        let report = report.unwrap();
        assert_eq!(report.secrets_scrubbed, 1);
        assert_eq!(mgr.phase(), WipePhase::Done);
        assert_eq!(mgr.registered_paths().len(), 2);
    }

    struct RaisesOnConvert<'a>(&'a CleanupManager);

    impl From<RaisesOnConvert<'_>> for SecretBuffer {
        fn from(value: RaisesOnConvert<'_>) -> Self {
            value.0.raise(Trigger::Panic);
            SecretBuffer::from(vec![1u8; 3])
        }
    }

    #[test]
    fn test_wipe_from_inside_add_secret() {
        let mgr = manager(WipePolicy::default(), CountingClipboard::default());
        mgr.add_secret(RaisesOnConvert(&mgr));

        assert_eq!(mgr.phase(), WipePhase::Done);
        assert_eq!(mgr.pending_secrets(), 0);
    }

    /// Panics when asked, after noting how many clipboard clears happened first
    struct PanickingOracle {
        clears: Arc<AtomicUsize>,
        seen: Arc<AtomicUsize>,
    }

    impl DeviceOracle for PanickingOracle {
        fn is_non_rotational(&self, _path: &Path) -> bool {
            self.seen.store(self.clears.load(Ordering::SeqCst), Ordering::SeqCst);
            panic!("device query blew up");
        }
    }

    #[test]
    fn test_secrets_and_clipboard_go_before_paths() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("chat.log");
        std::fs::write(&log, b"who said what").unwrap();

        let clipboard = CountingClipboard::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let oracle = PanickingOracle {
            clears: Arc::clone(&clipboard.clears),
            seen: Arc::clone(&seen),
        };
        let mgr = CleanupManager::new(WipePolicy {
            shred_paths: true,
            ..WipePolicy::default()
        })
        .with_shredder(Shredder::new(4096).with_oracle(oracle))
        .with_clipboard(clipboard);
        mgr.add_paths([&log]);
        mgr.add_secret(vec![2u8; 6]);

        let report = mgr.wipe().unwrap();

        // the oracle ran after exactly one clipboard clear
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(report.secrets_scrubbed, 1);
        assert!(report.clipboard_cleared);
        assert_eq!(report.paths_failed, 1);
        assert!(log.exists());
    }

    #[test]
    fn test_from_config_registers_paths() {
        let mut config = Config::default();
        config.cleanup.paths = vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")];
        config.cleanup.clear_clipboard = false;

        let mgr = CleanupManager::from_config(&config).with_clipboard(CountingClipboard::default());
        assert_eq!(mgr.registered_paths().len(), 2);
        assert!(!mgr.policy().clear_clipboard);
        assert_eq!(mgr.phase(), WipePhase::Idle);
    }
}

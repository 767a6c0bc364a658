/// Termination hooks that all converge on one wipe
///
/// Installed once, from `main`, before any other thread is spawned:
/// - Unix: SIGINT, SIGTERM, SIGHUP, SIGQUIT are blocked and collected by a
///   dedicated signal thread, so the wipe never runs inside a signal handler
/// - Windows: console control events (Ctrl-C, close, logoff, shutdown)
/// - panics on any thread, chained in front of the previous panic hook
/// - `exit()` via `atexit`, and the returned [`ExitGuard`] for a normal
///   return from `main`
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use super::manager::{CleanupManager, Trigger, WipePhase};
use crate::error::HookError;

static INSTALLED: AtomicBool = AtomicBool::new(false);

// C callbacks (atexit, console handler) cannot capture, so they reach the
// manager through this slot. Everything else holds its own Arc.
static EXIT_TARGET: OnceLock<Arc<CleanupManager>> = OnceLock::new();

/// Exit code used after a panic-triggered wipe
pub const PANIC_EXIT_CODE: i32 = 101;

/// Raises the exit trigger when dropped
///
/// Keep it alive for the whole of `main`.
#[must_use = "dropping the guard runs the wipe immediately"]
pub struct ExitGuard {
    manager: Arc<CleanupManager>,
}

impl ExitGuard {
    pub fn new(manager: Arc<CleanupManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<CleanupManager> {
        &self.manager
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.manager.raise(Trigger::Exit);
    }
}

/// Install every termination hook for `manager`
///
/// The panic hook runs for every panic, including ones a caller later
/// stops with `catch_unwind`: such a panic still wipes and, with
/// `exit_on_panic`, still exits with [`PANIC_EXIT_CODE`]. Pass
/// `exit_on_panic = false` when the process catches panics it means to
/// survive.
pub fn install(manager: &Arc<CleanupManager>, exit_on_panic: bool) -> Result<ExitGuard, HookError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(HookError::AlreadyInstalled);
    }
    let _ = EXIT_TARGET.set(Arc::clone(manager));

    install_signal_handlers(Arc::clone(manager))?;
    install_panic_hook(Arc::clone(manager), exit_on_panic);
    install_exit_hook()?;

    tracing::debug!("termination hooks installed");
    Ok(ExitGuard::new(Arc::clone(manager)))
}

fn install_panic_hook(manager: Arc<CleanupManager>, exit_on_panic: bool) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        previous(info);

        let thread = std::thread::current();
        tracing::error!(thread = thread.name().unwrap_or("<unnamed>"), "uncaught panic, wiping");
        manager.raise(Trigger::Panic);

        // a panic inside the wipe body itself leaves the phase at Running;
        // let it unwind into the step guard instead of exiting mid-wipe
        if exit_on_panic && manager.phase() == WipePhase::Done {
            std::process::exit(PANIC_EXIT_CODE);
        }
    }));
}

#[cfg(unix)]
fn install_signal_handlers(manager: Arc<CleanupManager>) -> Result<(), HookError> {
    use nix::sys::signal::{SigSet, Signal};

    let mut signals = SigSet::empty();
    for signal in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGQUIT] {
        signals.add(signal);
    }
    signals
        .thread_block()
        .map_err(|e| HookError::Signal(e.to_string()))?;

    std::thread::Builder::new()
        .name("kc-shred-signals".to_string())
        .spawn(move || match signals.wait() {
            Ok(signal) => {
                let signum = signal as i32;
                tracing::warn!(signal = signal.as_str(), "signal caught, wiping");
                manager.raise(Trigger::Signal(signum));
                std::process::exit(128 + signum);
            }
            Err(e) => tracing::error!(error = %e, "signal wait failed, signal wipe disabled"),
        })
        .map_err(HookError::Thread)?;

    Ok(())
}

#[cfg(windows)]
fn install_signal_handlers(_manager: Arc<CleanupManager>) -> Result<(), HookError> {
    use winapi::shared::minwindef::{BOOL, DWORD, TRUE};
    use winapi::um::consoleapi::SetConsoleCtrlHandler;

    // runs on a thread the system creates for the event
    unsafe extern "system" fn on_console_event(ctrl_type: DWORD) -> BOOL {
        if let Some(manager) = EXIT_TARGET.get() {
            tracing::warn!(ctrl_type, "console event caught, wiping");
            manager.raise(Trigger::Signal(ctrl_type as i32));
        }
        std::process::exit(1)
    }

    if unsafe { SetConsoleCtrlHandler(Some(on_console_event), TRUE) } == 0 {
        return Err(HookError::Signal(std::io::Error::last_os_error().to_string()));
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn install_signal_handlers(_manager: Arc<CleanupManager>) -> Result<(), HookError> {
    Ok(())
}

extern "C" fn wipe_at_exit() {
    if let Some(manager) = EXIT_TARGET.get() {
        manager.raise(Trigger::Exit);
    }
}

fn install_exit_hook() -> Result<(), HookError> {
    if unsafe { libc::atexit(wipe_at_exit) } != 0 {
        return Err(HookError::AtExit);
    }
    Ok(())
}

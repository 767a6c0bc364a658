/// System clipboard scrubbing
///
/// Clears the live clipboard slot and, where the OS keeps one, the
/// clipboard history. Every backend is best effort.
use std::process::{Command, Stdio};

use crate::error::ClipboardError;
use crate::utils::platform::{detect_platform, Platform};

/// Something that can empty a clipboard
pub trait ClipboardScrubber: Send + Sync {
    /// Empty the live clipboard slot
    fn clear(&self) -> Result<(), ClipboardError>;

    /// Drop any clipboard history the OS keeps
    fn clear_history(&self) -> Result<(), ClipboardError> {
        Ok(())
    }
}

/// Does nothing; for headless hosts and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl ClipboardScrubber for NoClipboard {
    fn clear(&self) -> Result<(), ClipboardError> {
        Ok(())
    }
}

/// The clipboard of the running desktop session
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

/// Clipboard backend for the running platform
pub fn system_clipboard() -> Box<dyn ClipboardScrubber> {
    match detect_platform() {
        Platform::Unknown => Box::new(NoClipboard),
        _ => Box::new(SystemClipboard),
    }
}

#[cfg(target_os = "linux")]
impl ClipboardScrubber for SystemClipboard {
    fn clear(&self) -> Result<(), ClipboardError> {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();
        let x11 = std::env::var_os("DISPLAY").is_some();

        let mut tools: Vec<(&'static str, &'static [&'static str])> = Vec::new();
        if wayland {
            tools.push(("wl-copy", &["--clear"]));
        }
        if x11 {
            tools.push(("xsel", &["--clipboard", "--clear"]));
            tools.push(("xclip", &["-selection", "clipboard", "-i", "/dev/null"]));
        }

        for (command, args) in tools {
            match run(command, args) {
                Ok(()) => {
                    tracing::debug!(command, "clipboard cleared");
                    return Ok(());
                }
                Err(ClipboardError::Command { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(ClipboardError::Unavailable)
    }
}

#[cfg(target_os = "macos")]
impl ClipboardScrubber for SystemClipboard {
    fn clear(&self) -> Result<(), ClipboardError> {
        // pbcopy with empty input replaces the pasteboard contents
        run("pbcopy", &[])
    }
}

#[cfg(windows)]
impl ClipboardScrubber for SystemClipboard {
    fn clear(&self) -> Result<(), ClipboardError> {
        use winapi::um::winuser::{CloseClipboard, EmptyClipboard, OpenClipboard};

        unsafe {
            if OpenClipboard(std::ptr::null_mut()) == 0 {
                return Err(ClipboardError::Api("OpenClipboard"));
            }
            let emptied = EmptyClipboard();
            CloseClipboard();
            if emptied == 0 {
                return Err(ClipboardError::Api("EmptyClipboard"));
            }
        }
        Ok(())
    }

    fn clear_history(&self) -> Result<(), ClipboardError> {
        run(
            "reg",
            &[
                "add",
                r"HKCU\Software\Microsoft\Clipboard",
                "/v",
                "ClearAllHistory",
                "/t",
                "REG_DWORD",
                "/d",
                "1",
                "/f",
            ],
        )
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
impl ClipboardScrubber for SystemClipboard {
    fn clear(&self) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable)
    }
}

/// Run a helper tool with no input and no output
#[allow(dead_code)]
fn run(command: &'static str, args: &[&str]) -> Result<(), ClipboardError> {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let status = cmd
        .status()
        .map_err(|source| ClipboardError::Command { command, source })?;
    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::Status { command, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_clipboard_is_silent() {
        assert!(NoClipboard.clear().is_ok());
        assert!(NoClipboard.clear_history().is_ok());
    }

    #[test]
    fn test_missing_tool_reports_command_error() {
        let err = run("kc-shred-no-such-tool", &[]).unwrap_err();
        assert!(matches!(err, ClipboardError::Command { .. }));
    }
}

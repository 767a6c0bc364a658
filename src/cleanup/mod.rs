/// Cleanup module - Secret registry, clipboard scrubbing and termination hooks
pub mod clipboard;
pub mod hooks;
pub mod manager;
pub mod secret;

pub use clipboard::{system_clipboard, ClipboardScrubber, NoClipboard, SystemClipboard};
pub use hooks::{install, ExitGuard};
pub use manager::{CleanupManager, Trigger, WipePhase, WipePolicy, WipeReport};
pub use secret::SecretBuffer;

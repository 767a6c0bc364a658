//! KillCode shredder
//!
//! Makes file and directory contents unrecoverable, and makes sure secrets
//! held in memory and the clipboard are scrubbed however the process ends.
//!
//! ```no_run
//! use kc_shred::{shred_file, ShredRequest};
//!
//! let outcome = shred_file(ShredRequest::new("secret.docx").passes(3));
//! assert!(outcome.success, "{}", outcome.detail);
//! ```

pub mod cleanup;
pub mod config;
pub mod error;
pub mod logging;
pub mod security;
pub mod utils;

pub use cleanup::{CleanupManager, ExitGuard, SecretBuffer, Trigger, WipePolicy, WipeReport};
pub use config::Config;
pub use error::{ShredError, Stage};
pub use security::{shred_directory, shred_file, ShredOutcome, ShredRequest, Shredder};

/// Configuration module - Load and validate shredder configuration
pub mod loader;
pub mod schema;

pub use loader::{load_config, load_from};
pub use schema::{CleanupConfig, Config};

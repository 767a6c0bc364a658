/// Utilities - Platform detection and storage device heuristics
pub mod device;
pub mod platform;

pub use device::{platform_oracle, AssumeRotational, DeviceOracle};
pub use platform::{detect_platform, Platform};

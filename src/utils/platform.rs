/// Platform detection
///
/// Decides which best-effort backends (device query, clipboard) are worth
/// trying on the running OS.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    MacOS,
    Unknown,
}

/// Detect current platform
pub fn detect_platform() -> Platform {
    #[cfg(target_os = "linux")]
    return Platform::Linux;

    #[cfg(target_os = "windows")]
    return Platform::Windows;

    #[cfg(target_os = "macos")]
    return Platform::MacOS;

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    return Platform::Unknown;
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::MacOS => "macos",
            Platform::Unknown => "unknown",
        }
    }

    /// Storage topology can be queried for rotational vs solid-state
    pub fn has_device_query(&self) -> bool {
        matches!(self, Platform::Linux | Platform::Windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform() {
        let platform = detect_platform();
        #[cfg(target_os = "linux")]
        assert_eq!(platform, Platform::Linux);
        assert!(!platform.name().is_empty());
    }

    #[test]
    fn test_capabilities() {
        assert!(Platform::Linux.has_device_query());
        assert!(!Platform::MacOS.has_device_query());
        assert!(!Platform::Unknown.has_device_query());
    }
}

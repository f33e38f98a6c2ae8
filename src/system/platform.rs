// src/system/platform.rs

use serde::Serialize;
use std::fmt;

/// Operating system family the launcher runs on.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Windows.
    Windows,
    /// Linux.
    Linux,
    /// macOS.
    MacOs,
    /// Anything else.
    Unknown,
}

impl Platform {
    /// Platform of the running build.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Unknown
        }
    }

    /// Name sent to the remote catalog.
    pub fn os_name(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Unknown => "unknown",
        }
    }

    /// Whether engines can be managed on this platform at all.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.os_name())
    }
}

/// Whether the running build targets 64-bit x86.
pub fn is_arch_x64() -> bool {
    cfg!(target_arch = "x86_64")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_platform_on_linux() {
        assert_eq!(Platform::current(), Platform::Linux);
        assert_eq!(Platform::current().to_string(), "linux");
    }

    #[test]
    fn test_unknown_is_unsupported() {
        assert!(!Platform::Unknown.is_supported());
        assert!(Platform::MacOs.is_supported());
    }
}

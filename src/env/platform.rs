//! Host platform classification.

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    /// BSDs and other Unix-like systems
    OtherUnix,
    Unsupported,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(unix) {
            Platform::OtherUnix
        } else {
            Platform::Unsupported
        }
    }

    pub fn is_windows(&self) -> bool {
        *self == Platform::Windows
    }

    pub fn is_linux(&self) -> bool {
        *self == Platform::Linux
    }

    pub fn is_unix_like(&self) -> bool {
        matches!(self, Platform::Linux | Platform::MacOs | Platform::OtherUnix)
    }

    /// File name of an executable on this platform (`cmake` / `cmake.exe`).
    pub fn exe_name(&self, stem: &str) -> String {
        if self.is_windows() {
            format!("{}.exe", stem)
        } else {
            stem.to_string()
        }
    }
}

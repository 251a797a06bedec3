/// Which family of OS-specific collection strategies to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Posix,
    /// Neither family matched; only OS-agnostic strategies apply.
    Generic,
}

impl Platform {
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "linux" | "macos" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" | "solaris"
            | "illumos" => Platform::Posix,
            _ => Platform::Generic,
        }
    }
}

use std::path::PathBuf;

/// Host the client talks to when nothing else is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1:8081";

/// Environment variable overriding `[server] host`.
pub const HOST_ENV: &str = "JUKE_HOST";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/juke/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("juke")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("juke")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("juke")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("juke")
    }
}

/// `JUKE_HOST`, when set to something non-empty.
pub fn host_override() -> Option<String> {
    std::env::var(HOST_ENV)
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

/// Platform-specific locations for git-wayback's config file, snapshot store and clones
///
/// Follows the XDG Base Directory specification on Linux/Unix.
use std::path::PathBuf;

const APP_DIR: &str = "git-wayback";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Resolve a base directory from the given variables
    ///
    /// `xdg_var` is consulted first on Linux/Unix, then `$HOME/<home_suffix>`.
    fn resolve(windows_var: &str, xdg_var: &str, mac_suffix: &str, home_suffix: &str) -> PathBuf {
        let home_join = |suffix: &str| {
            std::env::var("HOME").map(|home| PathBuf::from(home).join(suffix))
        };

        let resolved = if cfg!(target_os = "windows") {
            std::env::var(windows_var).map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            home_join(mac_suffix)
        } else {
            std::env::var(xdg_var)
                .map(PathBuf::from)
                .or_else(|_| home_join(home_suffix))
        };

        resolved.unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Data directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        Self::resolve(
            "LOCALAPPDATA",
            "XDG_DATA_HOME",
            "Library/Application Support",
            ".local/share",
        )
    }

    /// Config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        Self::resolve(
            "APPDATA",
            "XDG_CONFIG_HOME",
            "Library/Application Support",
            ".config",
        )
    }

    /// Returns: {data_dir}/git-wayback
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/git-wayback/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join(APP_DIR).join("config.toml")
    }

    /// Directory holding local clones, laid out as `<owner>/<repo>`
    ///
    /// Returns: {data_dir}/git-wayback/repos
    pub fn default_repos_dir() -> PathBuf {
        Self::project_data_dir().join("repos")
    }
}

// Shelfmark platform paths
// Config: ~/.config/shelfmark, ~/Library/Application Support/Shelfmark, %APPDATA%/Shelfmark
// Data:   ~/.local/share/shelfmark, ~/Library/Application Support/Shelfmark, %APPDATA%/Shelfmark
//
// `SHELFMARK_DATA_DIR` overrides the data directory on every platform.

use std::env;
use std::path::PathBuf;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "SHELFMARK_DATA_DIR";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Picks `$xdg_var/shelfmark` if set, otherwise `~/<fallback>/shelfmark`.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn xdg_dir(xdg_var: &str, fallback: &[&str]) -> PathBuf {
    match env::var(xdg_var) {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("shelfmark"),
        _ => fallback
            .iter()
            .fold(home_dir(), |path, part| path.join(part))
            .join("shelfmark"),
    }
}

#[cfg(target_os = "macos")]
fn app_support_dir() -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join("Shelfmark")
}

#[cfg(target_os = "windows")]
fn appdata_dir() -> PathBuf {
    let appdata =
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("Shelfmark")
}

/// Returns the platform-specific configuration directory for Shelfmark.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        appdata_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_CONFIG_HOME", &[".config"])
    }
}

/// Returns the directory holding `shelfmark.db`.
pub fn get_data_dir() -> PathBuf {
    resolve_data_dir(env::var(DATA_DIR_ENV).ok(), platform_data_dir())
}

fn platform_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        app_support_dir()
    }
    #[cfg(target_os = "windows")]
    {
        appdata_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_DATA_HOME", &[".local", "share"])
    }
}

fn resolve_data_dir(override_dir: Option<String>, platform_dir: PathBuf) -> PathBuf {
    match override_dir {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => platform_dir,
    }
}

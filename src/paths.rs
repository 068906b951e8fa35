//! Path utilities for d1kit.
//!
//! - [`get_d1kit_dir`] - `~/.d1kit/` (base directory for all d1kit data)
//! - [`get_databases_dir`] - `~/.d1kit/databases/` (local emulator storage)
//! - [`get_config_path`] - `~/.d1kit/config.toml` (default configuration)

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Get the d1kit base directory.
///
/// Resolution order:
/// 1. `D1KIT_HOME` environment variable (if set)
/// 2. `~/.d1kit/` (default)
pub fn get_d1kit_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("D1KIT_HOME")
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    let home = dirs::home_dir().ok_or_else(|| Error::config("failed to get home directory"))?;
    Ok(home.join(".d1kit"))
}

/// Get the local database directory: `~/.d1kit/databases/`
pub fn get_databases_dir() -> Result<PathBuf> {
    Ok(get_d1kit_dir()?.join("databases"))
}

/// Get the default configuration file path: `~/.d1kit/config.toml`
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_d1kit_dir()?.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_d1kit_home_override() {
        // SAFETY: serialized with every other test that touches the environment.
        unsafe { std::env::set_var("D1KIT_HOME", "/tmp/d1kit-home") };
        assert_eq!(get_d1kit_dir().unwrap(), PathBuf::from("/tmp/d1kit-home"));
        assert_eq!(
            get_databases_dir().unwrap(),
            PathBuf::from("/tmp/d1kit-home/databases")
        );
        assert_eq!(
            get_config_path().unwrap(),
            PathBuf::from("/tmp/d1kit-home/config.toml")
        );
        unsafe { std::env::remove_var("D1KIT_HOME") };
    }
}

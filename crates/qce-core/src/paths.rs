//! Per-user configuration locations.
//!
//! The service writes its credentials to a hidden directory under the
//! user's home (or profile) directory. `QCE_CONFIG_DIR` relocates the whole
//! directory, which is mainly useful for tests and portable installs.

use std::env;
use std::path::PathBuf;

/// Name of the hidden per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".qq-chat-exporter";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "QCE_CONFIG_DIR";

const SECURITY_FILE: &str = "security.json";
const EXPORT_CONFIG_FILE: &str = "export_config.json";
const EXPORTS_DIR: &str = "exports";

/// Root of the per-user configuration directory.
///
/// Falls back to a relative directory when no home directory is known.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir().map_or_else(
        || PathBuf::from(CONFIG_DIR_NAME),
        |home| home.join(CONFIG_DIR_NAME),
    )
}

/// Location of `security.json` (access token and server host).
pub fn security_config_path() -> PathBuf {
    config_dir().join(SECURITY_FILE)
}

/// Location of the persisted export preferences.
pub fn export_config_path() -> PathBuf {
    config_dir().join(EXPORT_CONFIG_FILE)
}

/// Where exports land when no output directory is configured.
pub fn default_exports_dir() -> PathBuf {
    config_dir().join(EXPORTS_DIR)
}

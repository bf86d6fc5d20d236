//! Local credential lookup.
//!
//! Resolution order is explicit value, then environment variable, then the
//! service's `security.json`. Nothing here touches the network.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{QceError, QceResult};
use crate::paths::security_config_path;

/// Environment variable holding the access token.
pub const TOKEN_ENV_VAR: &str = "NAPCAT_QCE_TOKEN";

/// Contents of the service-written `security.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    pub access_token: Option<String>,
    pub server_host: Option<String>,
}

/// Read `security.json`.
///
/// A missing file yields `None`. An unreadable or malformed file is logged
/// and also yields `None`.
pub fn load_security_config(path: &Path) -> Option<SecurityConfig> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read security config");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed security config");
            None
        }
    }
}

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Explicit,
    Environment,
    ConfigFile,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit argument",
            Self::Environment => "environment variable",
            Self::ConfigFile => "config file",
        })
    }
}

/// Locates an access credential from local state.
#[derive(Debug, Clone)]
pub struct TokenResolver {
    env_var: String,
    config_path: PathBuf,
}

impl Default for TokenResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenResolver {
    /// Resolver using `NAPCAT_QCE_TOKEN` and the per-user `security.json`.
    pub fn new() -> Self {
        Self {
            env_var: TOKEN_ENV_VAR.to_string(),
            config_path: security_config_path(),
        }
    }

    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolve a token, failing with guidance when every source is empty.
    pub fn resolve(&self, explicit: Option<&str>) -> QceResult<String> {
        self.resolve_with_source(explicit).map(|(token, _)| token)
    }

    /// Like [`resolve`](Self::resolve) but also reports which source won.
    pub fn resolve_with_source(&self, explicit: Option<&str>) -> QceResult<(String, TokenSource)> {
        if let Some(token) = explicit.filter(|t| !t.is_empty()) {
            return Ok((token.to_string(), TokenSource::Explicit));
        }

        if let Ok(token) = env::var(&self.env_var) {
            if !token.is_empty() {
                debug!(var = %self.env_var, "using access token from environment");
                return Ok((token, TokenSource::Environment));
            }
        }

        if let Some(token) = self.config_token() {
            debug!(path = %self.config_path.display(), "using access token from config file");
            return Ok((token, TokenSource::ConfigFile));
        }

        Err(QceError::authentication(format!(
            "no access token found; provide one of: (1) an explicit token argument, \
             (2) the {} environment variable, (3) accessToken in {}",
            self.env_var,
            self.config_path.display()
        )))
    }

    /// Token stored in the config file, if any.
    pub fn config_token(&self) -> Option<String> {
        load_security_config(&self.config_path)
            .and_then(|c| c.access_token)
            .filter(|t| !t.is_empty())
    }

    /// Server host recorded in the config file, if any.
    pub fn server_host(&self) -> Option<String> {
        load_security_config(&self.config_path)
            .and_then(|c| c.server_host)
            .filter(|h| !h.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ENV_LOCK, EnvVarGuard};
    use tempfile::TempDir;

    const TEST_VAR: &str = "QCE_TEST_TOKEN_RESOLVER";

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("security.json");
        fs::write(&path, body).unwrap();
        path
    }

    fn resolver(path: PathBuf) -> TokenResolver {
        TokenResolver::new()
            .with_env_var(TEST_VAR)
            .with_config_path(path)
    }

    #[test]
    fn test_explicit_wins_over_env_and_file() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = EnvVarGuard::set(TEST_VAR, "from-env");
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"accessToken": "from-file"}"#);

        let (token, source) = resolver(path)
            .resolve_with_source(Some("explicit"))
            .unwrap();
        assert_eq!(token, "explicit");
        assert_eq!(source, TokenSource::Explicit);
    }

    #[test]
    fn test_env_wins_over_file() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = EnvVarGuard::set(TEST_VAR, "from-env");
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"accessToken": "from-file"}"#);

        let (token, source) = resolver(path).resolve_with_source(None).unwrap();
        assert_eq!(token, "from-env");
        assert_eq!(source, TokenSource::Environment);
    }

    #[test]
    fn test_file_used_when_env_missing() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = EnvVarGuard::remove(TEST_VAR);
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"accessToken": "from-file", "serverHost": "192.168.1.20"}"#,
        );

        let resolver = resolver(path);
        assert_eq!(resolver.resolve(Some("")).unwrap(), "from-file");
        assert_eq!(resolver.server_host().as_deref(), Some("192.168.1.20"));
    }

    #[test]
    fn test_exhaustion_is_authentication_error() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = EnvVarGuard::remove(TEST_VAR);
        let dir = TempDir::new().unwrap();

        let err = resolver(dir.path().join("missing.json"))
            .resolve(None)
            .unwrap_err();
        assert!(matches!(err, QceError::Authentication { .. }));
        let msg = err.to_string();
        assert!(msg.contains(TEST_VAR));
        assert!(msg.contains("missing.json"));
    }

    #[test]
    fn test_malformed_file_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json");
        assert_eq!(load_security_config(&path), None);
    }
}

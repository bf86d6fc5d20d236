//! Launch configuration and install discovery.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use qce_core::LauncherError;
use tracing::debug;

/// Overrides the NapCat-QCE install directory.
pub const NAPCAT_PATH_ENV: &str = "NAPCAT_QCE_PATH";
/// Overrides the QQ executable location.
pub const QQ_PATH_ENV: &str = "QQ_PATH";

const INSTALL_DIR_NAME: &str = "NapCat-QCE-Windows-x64";
const BOOT_BINARY: &str = "NapCatWinBootMain.exe";

const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(2);
const DEFAULT_READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How to spawn and supervise the service process.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Time between SIGTERM and a forced kill.
    pub grace_period: Duration,
    /// Pause between stop and start on restart.
    pub restart_cooldown: Duration,
    pub ready_poll_interval: Duration,
}

impl LaunchConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
            restart_cooldown: DEFAULT_RESTART_COOLDOWN,
            ready_poll_interval: DEFAULT_READY_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    #[must_use]
    pub const fn with_restart_cooldown(mut self, cooldown: Duration) -> Self {
        self.restart_cooldown = cooldown;
        self
    }

    #[must_use]
    pub const fn with_ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    /// Build the launch for a NapCat-QCE install.
    ///
    /// The install directory comes from `options.napcat_path`, then
    /// `NAPCAT_QCE_PATH`, then a handful of common locations. The QQ
    /// executable must also be present, although only its existence is
    /// checked: the launch script finds QQ on its own.
    pub fn discover(options: &DiscoverOptions) -> Result<Self, LauncherError> {
        let napcat_dir = options
            .napcat_path
            .clone()
            .or_else(find_napcat_dir)
            .ok_or(LauncherError::NapcatDirNotFound)?;
        let qq = options
            .qq_path
            .clone()
            .or_else(find_qq_executable)
            .ok_or(LauncherError::QqNotFound)?;
        debug!(napcat = %napcat_dir.display(), qq = %qq.display(), "discovered install");

        Self::for_install(&napcat_dir, options.user_mode, options.auto_login_uin.as_deref())
    }

    /// Launch of the script inside `napcat_dir`, without any lookup.
    pub fn for_install(
        napcat_dir: &Path,
        user_mode: bool,
        auto_login_uin: Option<&str>,
    ) -> Result<Self, LauncherError> {
        let script = launch_script(napcat_dir, user_mode);
        if !script.is_file() {
            return Err(LauncherError::ScriptMissing(script));
        }

        let resource = |name: &str| napcat_dir.join(name).to_string_lossy().into_owned();
        let mut config = Self::new(script)
            .with_working_dir(napcat_dir)
            .with_env("NAPCAT_PATCH_PACKAGE", resource("qqnt.json"))
            .with_env("NAPCAT_LOAD_PATH", resource("loadNapCat.js"))
            .with_env("NAPCAT_INJECT_PATH", resource("NapCatWinBootHook.dll"))
            .with_env("NAPCAT_LAUNCHER_PATH", resource(BOOT_BINARY))
            .with_env("NAPCAT_MAIN_PATH", resource("napcat.mjs"));
        if let Some(uin) = auto_login_uin {
            config = config.with_arg(uin);
        }
        Ok(config)
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Inputs to [`LaunchConfig::discover`].
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub napcat_path: Option<PathBuf>,
    pub qq_path: Option<PathBuf>,
    /// Use the launch script that does not need administrator rights.
    pub user_mode: bool,
    pub auto_login_uin: Option<String>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            napcat_path: None,
            qq_path: None,
            user_mode: true,
            auto_login_uin: None,
        }
    }
}

fn launch_script(napcat_dir: &Path, user_mode: bool) -> PathBuf {
    if !user_mode {
        return napcat_dir.join("launcher.bat");
    }
    let primary = napcat_dir.join("launcher-user.bat");
    if primary.is_file() {
        primary
    } else {
        napcat_dir.join("launcher-win10-user.bat")
    }
}

/// Locate the NapCat-QCE install directory.
pub fn find_napcat_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(NAPCAT_PATH_ENV).map(PathBuf::from) {
        if dir.exists() {
            return Some(dir);
        }
        debug!(path = %dir.display(), "{NAPCAT_PATH_ENV} does not exist, searching defaults");
    }

    let cwd = env::current_dir().ok();
    let mut roots: Vec<PathBuf> = Vec::new();
    roots.extend(cwd.clone());
    roots.extend(dirs::home_dir());
    roots.extend(cwd.as_deref().and_then(Path::parent).map(Path::to_path_buf));
    roots.push(PathBuf::from("D:/readqq"));
    roots.push(PathBuf::from("D:/"));

    roots
        .into_iter()
        .map(|root| root.join(INSTALL_DIR_NAME))
        .find(|dir| dir.join(BOOT_BINARY).is_file())
}

/// Locate the QQ executable.
pub fn find_qq_executable() -> Option<PathBuf> {
    if let Some(path) = env::var_os(QQ_PATH_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Some(path);
        }
    }

    let qq_in = |var: &str, prefix: &[&str]| {
        env::var_os(var).map(|base| {
            let mut path = PathBuf::from(base);
            path.extend(prefix);
            path.extend(["Tencent", "QQNT", "QQ.exe"]);
            path
        })
    };

    [
        qq_in("ProgramFiles", &[]),
        qq_in("ProgramFiles(x86)", &[]),
        qq_in("LOCALAPPDATA", &["Programs"]),
    ]
    .into_iter()
    .flatten()
    .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use qce_core::test_utils::{ENV_LOCK, EnvVarGuard};
    use tempfile::TempDir;

    use super::*;

    fn fake_install(scripts: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(BOOT_BINARY), b"").unwrap();
        for script in scripts {
            fs::write(dir.path().join(script), b"@echo off").unwrap();
        }
        dir
    }

    #[test]
    fn test_user_mode_prefers_launcher_user() {
        let install = fake_install(&["launcher-user.bat", "launcher-win10-user.bat"]);
        let config = LaunchConfig::for_install(install.path(), true, None).unwrap();
        assert_eq!(config.program, install.path().join("launcher-user.bat"));
        assert_eq!(config.working_dir.as_deref(), Some(install.path()));
    }

    #[test]
    fn test_user_mode_falls_back_to_win10_script() {
        let install = fake_install(&["launcher-win10-user.bat"]);
        let config = LaunchConfig::for_install(install.path(), true, None).unwrap();
        assert_eq!(config.program, install.path().join("launcher-win10-user.bat"));
    }

    #[test]
    fn test_admin_mode_requires_launcher_bat() {
        let install = fake_install(&["launcher-user.bat"]);
        let err = LaunchConfig::for_install(install.path(), false, None).unwrap_err();
        assert!(matches!(err, LauncherError::ScriptMissing(p) if p.ends_with("launcher.bat")));
    }

    #[test]
    fn test_env_and_uin_are_set() {
        let install = fake_install(&["launcher.bat"]);
        let config = LaunchConfig::for_install(install.path(), false, Some("10001")).unwrap();

        assert_eq!(config.args, vec!["10001"]);
        let inject = config.env_value("NAPCAT_INJECT_PATH").unwrap();
        assert!(inject.ends_with("NapCatWinBootHook.dll"));
        for key in [
            "NAPCAT_PATCH_PACKAGE",
            "NAPCAT_LOAD_PATH",
            "NAPCAT_LAUNCHER_PATH",
            "NAPCAT_MAIN_PATH",
        ] {
            assert!(config.env_value(key).is_some(), "{key} missing");
        }
    }

    #[test]
    fn test_discover_uses_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let install = fake_install(&["launcher-user.bat"]);
        let qq_dir = TempDir::new().unwrap();
        let qq = qq_dir.path().join("QQ.exe");
        fs::write(&qq, b"").unwrap();

        let _napcat = EnvVarGuard::set(NAPCAT_PATH_ENV, install.path().to_str().unwrap());
        let _qq = EnvVarGuard::set(QQ_PATH_ENV, qq.to_str().unwrap());

        let config = LaunchConfig::discover(&DiscoverOptions::default()).unwrap();
        assert_eq!(config.program, install.path().join("launcher-user.bat"));
    }

    #[test]
    fn test_discover_reports_missing_qq() {
        let _lock = ENV_LOCK.lock().unwrap();
        let install = fake_install(&["launcher-user.bat"]);
        let _qq = EnvVarGuard::set(QQ_PATH_ENV, "/nonexistent/QQ.exe");
        let _pf = EnvVarGuard::remove("ProgramFiles");
        let _pf86 = EnvVarGuard::remove("ProgramFiles(x86)");
        let _local = EnvVarGuard::remove("LOCALAPPDATA");

        let options = DiscoverOptions {
            napcat_path: Some(install.path().to_path_buf()),
            ..DiscoverOptions::default()
        };
        let err = LaunchConfig::discover(&options).unwrap_err();
        assert!(matches!(err, LauncherError::QqNotFound));
    }

    #[test]
    fn test_defaults() {
        let config = LaunchConfig::new("svc");
        assert_eq!(config.grace_period, Duration::from_secs(5));
        assert_eq!(config.restart_cooldown, Duration::from_secs(2));
        assert_eq!(config.ready_poll_interval, Duration::from_millis(500));
    }
}

//! Lifecycle control for the service process.

use std::future::Future;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use qce_client::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT, DefaultQceClient};
use qce_core::{LauncherError, QceError, QceResult, TokenResolver};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::LaunchConfig;
use crate::output::{Callbacks, LineSource, RunState, pump};
use crate::shutdown::stop_child;

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// One spawned process and its reader tasks.
struct ServiceRun {
    child: Child,
    state: Arc<RunState>,
    readers: Vec<JoinHandle<()>>,
}

enum Probe {
    Stopped,
    Starting,
    Ready,
}

/// Supervises a single service process.
///
/// States run `stopped → running (not ready) → running (ready) → stopped`.
/// Readiness is driven by output classification on background reader
/// tasks; callers poll it through [`Launcher::wait_for_ready`].
pub struct Launcher {
    config: LaunchConfig,
    callbacks: Callbacks,
    resolver: TokenResolver,
    run: Mutex<Option<ServiceRun>>,
}

impl Launcher {
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            callbacks: Callbacks::default(),
            resolver: TokenResolver::new(),
            run: Mutex::new(None),
        }
    }

    /// Called with every non-empty output line.
    #[must_use]
    pub fn on_output<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_output = Some(Arc::new(f));
        self
    }

    /// Called each time a token is announced or the started marker appears.
    #[must_use]
    pub fn on_ready<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        self.callbacks.on_ready = Some(Arc::new(f));
        self
    }

    /// Called with error lines and side-channel failures.
    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    /// Resolver consulted by [`token`](Self::token) when the process has
    /// not announced one.
    #[must_use]
    pub fn with_token_resolver(mut self, resolver: TokenResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub const fn config(&self) -> &LaunchConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Option<ServiceRun>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn the service.
    ///
    /// Returns `true` immediately if it is already running. With
    /// `wait_for_ready`, returns whether readiness was reached within
    /// `timeout`; the process is left running either way.
    pub async fn start(&self, wait_for_ready: bool, timeout: Duration) -> QceResult<bool> {
        {
            let mut run = self.lock();
            if let Some(current) = run.as_mut() {
                if matches!(current.child.try_wait(), Ok(None)) {
                    debug!("service already running");
                    return Ok(true);
                }
            }
            if let Some(stale) = run.take() {
                stale.state.shut_down();
                stale.readers.iter().for_each(JoinHandle::abort);
            }
            *run = Some(self.spawn()?);
        }

        if wait_for_ready {
            return Ok(self.wait_for_ready(timeout).await);
        }
        Ok(true)
    }

    fn spawn(&self) -> Result<ServiceRun, LauncherError> {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .envs(self.config.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        #[cfg(windows)]
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);

        let mut child = command.spawn()?;
        let state = RunState::new(self.callbacks.clone());

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump(stdout, LineSource::Stdout, Arc::clone(&state))));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump(stderr, LineSource::Stderr, Arc::clone(&state))));
        }

        info!(
            pid = child.id(),
            program = %self.config.program.display(),
            "service process started"
        );
        Ok(ServiceRun {
            child,
            state,
            readers,
        })
    }

    fn probe(&self) -> Probe {
        let mut run = self.lock();
        let Some(current) = run.as_mut() else {
            return Probe::Stopped;
        };
        match current.child.try_wait() {
            Ok(None) if current.state.is_ready() => Probe::Ready,
            Ok(None) => Probe::Starting,
            Ok(Some(status)) => {
                debug!(?status, "service process exited");
                Probe::Stopped
            }
            Err(e) => {
                warn!(error = %e, "failed to query service process");
                Probe::Stopped
            }
        }
    }

    /// Poll readiness until it is reached, the process exits, or `timeout`
    /// elapses.
    pub async fn wait_for_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.probe() {
                Probe::Ready => return true,
                Probe::Stopped => return false,
                Probe::Starting => {}
            }
            if Instant::now() >= deadline {
                warn!(?timeout, "service did not become ready in time");
                return false;
            }
            sleep(self.config.ready_poll_interval).await;
        }
    }

    /// Stop the service. Safe to call when nothing is running.
    ///
    /// Without `force` the process gets the configured grace period to
    /// exit before it is killed.
    pub async fn stop(&self, force: bool) {
        let Some(mut run) = self.lock().take() else {
            debug!("stop requested but service is not running");
            return;
        };

        run.state.shut_down();
        match stop_child(&mut run.child, self.config.grace_period, force).await {
            Ok(status) => info!(?status, "service process stopped"),
            Err(e) => warn!(error = %e, "error while stopping service process"),
        }
        for reader in run.readers {
            reader.abort();
        }
    }

    /// Stop, wait out the cooldown, then start again.
    pub async fn restart(&self, wait_for_ready: bool, timeout: Duration) -> QceResult<bool> {
        self.stop(false).await;
        sleep(self.config.restart_cooldown).await;
        self.start(wait_for_ready, timeout).await
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.probe(), Probe::Stopped)
    }

    /// Ready and still running.
    pub fn is_ready(&self) -> bool {
        matches!(self.probe(), Probe::Ready)
    }

    /// Token announced by the process, else the one in the security config.
    pub fn token(&self) -> Option<String> {
        let announced = self.lock().as_ref().and_then(|run| run.state.token());
        announced.or_else(|| self.resolver.config_token())
    }

    pub fn pid(&self) -> Option<u32> {
        self.lock().as_ref().and_then(|run| run.child.id())
    }

    /// Name of the side channel the process redirected its output to.
    pub fn side_channel(&self) -> Option<String> {
        self.lock()
            .as_ref()
            .and_then(|run| run.state.side_channel_name())
    }

    /// Client for the running service, authenticated with [`token`](Self::token).
    pub fn get_client(&self, host: &str, port: u16) -> QceResult<DefaultQceClient> {
        let token = self.token().ok_or(LauncherError::NoToken)?;
        let config = ClientConfig::new()
            .with_host(host)
            .with_port(port)
            .with_token(token);
        DefaultQceClient::new(&config)
    }
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("config", &self.config)
            .field("callbacks", &self.callbacks)
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

/// Start the service, run `f` with a client, and stop the service.
///
/// The service is stopped whether `f` succeeds or not. Fails with a
/// timeout error when readiness is not reached within `timeout`.
pub async fn run_with_service<F, Fut, T>(
    launcher: &Launcher,
    timeout: Duration,
    f: F,
) -> QceResult<T>
where
    F: FnOnce(DefaultQceClient) -> Fut,
    Fut: Future<Output = QceResult<T>>,
{
    let ready = match launcher.start(true, timeout).await {
        Ok(ready) => ready,
        Err(e) => {
            launcher.stop(false).await;
            return Err(e);
        }
    };
    if !ready {
        launcher.stop(false).await;
        return Err(QceError::timeout(
            "service did not become ready",
            timeout,
        ));
    }

    let result = match launcher.get_client(DEFAULT_HOST, DEFAULT_PORT) {
        Ok(client) => f(client).await,
        Err(e) => Err(e),
    };
    launcher.stop(false).await;
    result
}

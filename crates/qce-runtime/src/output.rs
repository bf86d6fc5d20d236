//! Shared state between the supervisor and its output readers.
//!
//! One [`RunState`] exists per spawned process. Reader tasks write the
//! readiness flag and token; the supervisor polls them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classify::classify_line;
use crate::lines::LineBuffer;
use crate::side_channel;

const READ_CHUNK: usize = 4096;

/// Callback receiving a raw output or error line.
pub type LineCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback receiving the current token when the service becomes ready.
pub type ReadyCallback = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// User callbacks invoked from reader tasks.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_output: Option<LineCallback>,
    pub on_ready: Option<ReadyCallback>,
    pub on_error: Option<LineCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_output", &self.on_output.is_some())
            .field("on_ready", &self.on_ready.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Callbacks {
    pub(crate) fn error(&self, line: &str) {
        if let Some(cb) = &self.on_error {
            cb(line);
        }
    }
}

/// Where an output line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    Stdout,
    Stderr,
    SideChannel,
}

impl LineSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::SideChannel => "side-channel",
        }
    }
}

/// Per-process state shared with reader tasks.
#[derive(Debug)]
pub struct RunState {
    running: AtomicBool,
    ready: AtomicBool,
    token: RwLock<Option<String>>,
    side_channel_name: RwLock<Option<String>>,
    side_channel_task: Mutex<Option<JoinHandle<()>>>,
    callbacks: Callbacks,
}

impl RunState {
    pub fn new(callbacks: Callbacks) -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(true),
            ready: AtomicBool::new(false),
            token: RwLock::new(None),
            side_channel_name: RwLock::new(None),
            side_channel_task: Mutex::new(None),
            callbacks,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn side_channel_name(&self) -> Option<String> {
        self.side_channel_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) const fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Stop reader work: clear flags and abort the side-channel reader.
    pub(crate) fn shut_down(&self) {
        self.running.store(false, Ordering::Release);
        self.ready.store(false, Ordering::Release);
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self
            .side_channel_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(task) = self
            .side_channel_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }

    /// Classify one decoded line and fire the matching callbacks.
    pub fn handle_line(self: &Arc<Self>, raw: &str, source: LineSource) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }
        debug!(source = source.as_str(), "{line}");

        let class = classify_line(line);

        if let Some(name) = class.side_channel {
            self.open_side_channel(name);
        }

        if let Some(token) = class.token {
            *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
            self.mark_ready();
            if let Some(cb) = &self.callbacks.on_ready {
                cb(Some(&token));
            }
        }

        if class.started {
            self.mark_ready();
            if let Some(cb) = &self.callbacks.on_ready {
                cb(self.token().as_deref());
            }
        }

        if class.error {
            self.callbacks.error(line);
        }

        if let Some(cb) = &self.callbacks.on_output {
            cb(line);
        }
    }

    fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::AcqRel) {
            info!("service is ready");
        }
    }

    /// Spawn the side-channel reader unless one was already spawned.
    fn open_side_channel(self: &Arc<Self>, name: String) {
        let mut task = self
            .side_channel_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            debug!(channel = %name, "side channel already open, ignoring announcement");
            return;
        }
        info!(channel = %name, "service output redirected to side channel");
        *self
            .side_channel_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(name.clone());
        *task = Some(tokio::spawn(side_channel::read(name, Arc::clone(self))));
    }
}

/// Read `stream` to its end, feeding every line through `state`.
pub async fn pump<R>(mut stream: R, source: LineSource, state: Arc<RunState>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = LineBuffer::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for line in lines.push(&chunk[..n]) {
                    state.handle_line(&line, source);
                }
            }
            Err(e) => {
                warn!(source = source.as_str(), error = %e, "output reader exiting due to read error");
                break;
            }
        }
        if !state.is_running() {
            break;
        }
    }

    if let Some(rest) = lines.finish() {
        state.handle_line(&rest, source);
    }
    debug!(source = source.as_str(), "output reader task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        ready: Mutex<Vec<Option<String>>>,
        errors: Mutex<Vec<String>>,
        output: Mutex<Vec<String>>,
    }

    fn recording_state() -> (Arc<RunState>, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let (r1, r2, r3) = (rec.clone(), rec.clone(), rec.clone());
        let callbacks = Callbacks {
            on_output: Some(Arc::new(move |l: &str| {
                r1.output.lock().unwrap().push(l.to_string());
            })),
            on_ready: Some(Arc::new(move |t: Option<&str>| {
                r2.ready.lock().unwrap().push(t.map(str::to_string));
            })),
            on_error: Some(Arc::new(move |l: &str| {
                r3.errors.lock().unwrap().push(l.to_string());
            })),
        };
        (RunState::new(callbacks), rec)
    }

    #[test]
    fn test_token_line_sets_ready_and_fires_once() {
        let (state, rec) = recording_state();
        state.handle_line("  访问令牌: abc123  ", LineSource::Stdout);

        assert!(state.is_ready());
        assert_eq!(state.token().as_deref(), Some("abc123"));
        assert_eq!(*rec.ready.lock().unwrap(), vec![Some("abc123".to_string())]);
        assert_eq!(*rec.output.lock().unwrap(), vec!["访问令牌: abc123".to_string()]);
    }

    #[test]
    fn test_repeated_token_fires_again() {
        let (state, rec) = recording_state();
        state.handle_line("Access Token: one", LineSource::Stdout);
        state.handle_line("Access Token: two", LineSource::Stderr);
        assert_eq!(rec.ready.lock().unwrap().len(), 2);
        assert_eq!(state.token().as_deref(), Some("two"));
    }

    #[test]
    fn test_started_marker_reports_current_token() {
        let (state, rec) = recording_state();
        state.handle_line("QQ聊天记录导出工具已启动", LineSource::Stdout);
        assert!(state.is_ready());
        assert_eq!(*rec.ready.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_error_line_does_not_stop_processing() {
        let (state, rec) = recording_state();
        state.handle_line("Error: hook failed", LineSource::Stdout);
        state.handle_line("Access Token: t", LineSource::Stdout);
        assert_eq!(*rec.errors.lock().unwrap(), vec!["Error: hook failed".to_string()]);
        assert!(state.is_ready());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let (state, rec) = recording_state();
        state.handle_line("   \r", LineSource::Stdout);
        assert!(rec.output.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_side_channel_spawned_once() {
        let (state, rec) = recording_state();
        let line = r"已重定向到命名管道: \\.\pipe\qce_missing_pipe";
        for _ in 0..3 {
            state.handle_line(line, LineSource::Stdout);
        }
        assert_eq!(
            state.side_channel_name().as_deref(),
            Some(r"\\.\pipe\qce_missing_pipe")
        );

        // The pipe does not exist; the single reader reports one open failure.
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        let errors = rec.errors.lock().unwrap().clone();
        assert_eq!(errors.len(), 1, "errors: {errors:?}");
        assert!(errors[0].contains("side channel"));
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_pump_reads_until_eof() {
        let (state, rec) = recording_state();
        let input: &[u8] = b"booting\nAccess Token: from-pump\ntrailing";
        pump(input, LineSource::Stdout, state.clone()).await;

        assert_eq!(state.token().as_deref(), Some("from-pump"));
        assert_eq!(
            *rec.output.lock().unwrap(),
            vec!["booting", "Access Token: from-pump", "trailing"]
        );
    }

    #[test]
    fn test_shut_down_clears_state() {
        let (state, _rec) = recording_state();
        state.handle_line("Access Token: x", LineSource::Stdout);
        state.shut_down();
        assert!(!state.is_running());
        assert!(!state.is_ready());
        assert_eq!(state.token(), None);
    }
}

//! Push-based export tracking on top of [`EventStream`].
//!
//! Export progress, completion and error events update a per-task
//! snapshot. Waiters block on a per-task signal that is released by the
//! completion or error event for that exact task id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use qce_core::{QceError, QceResult, TaskStatus};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::event::Event;
use crate::stream::{EventStream, EventStreamConfig};

/// Cadence of progress callbacks during [`ExportMonitor::wait_for_task`].
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Receives the latest snapshot while a wait is in progress.
pub type ProgressCallback = Box<dyn FnMut(&TaskSnapshot) + Send>;

/// Last known state of an export task, as reported by events.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub message: String,
    pub message_count: u64,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl TaskSnapshot {
    fn new(task_id: String, status: TaskStatus) -> Self {
        Self {
            task_id,
            status,
            progress: 0.0,
            message: String::new(),
            message_count: 0,
            file_name: None,
            file_path: None,
            download_url: None,
            error: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ExportEventData {
    task_id: Option<Value>,
    progress: Option<f64>,
    message: Option<String>,
    message_count: Option<u64>,
    file_name: Option<String>,
    file_path: Option<String>,
    download_url: Option<String>,
    error: Option<Value>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Progress,
    Complete,
    Error,
}

impl ExportEventData {
    fn parse(event: &Event) -> Option<(String, Self)> {
        let data: Self = match serde_json::from_value(event.data.clone()) {
            Ok(data) => data,
            Err(e) => {
                warn!(event_type = %event.event_type, error = %e, "malformed export event");
                return None;
            }
        };
        let task_id = match &data.task_id {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };
        Some((task_id, data))
    }

    fn into_snapshot(self, task_id: String, phase: Phase) -> TaskSnapshot {
        match phase {
            Phase::Progress => TaskSnapshot {
                progress: self.progress.unwrap_or(0.0),
                message: self.message.unwrap_or_default(),
                message_count: self.message_count.unwrap_or(0),
                ..TaskSnapshot::new(task_id, TaskStatus::Running)
            },
            Phase::Complete => TaskSnapshot {
                progress: 100.0,
                message: "export complete".to_string(),
                message_count: self.message_count.unwrap_or(0),
                file_name: self.file_name,
                file_path: self.file_path,
                download_url: self.download_url,
                ..TaskSnapshot::new(task_id, TaskStatus::Completed)
            },
            Phase::Error => {
                let error = match self.error {
                    Some(Value::String(s)) => s,
                    Some(Value::Null) | None => "unknown error".to_string(),
                    Some(other) => other.to_string(),
                };
                TaskSnapshot {
                    error: Some(error),
                    ..TaskSnapshot::new(task_id, TaskStatus::Failed)
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct Tracked {
    tasks: HashMap<String, TaskSnapshot>,
    waiters: HashMap<String, watch::Sender<Option<TaskSnapshot>>>,
}

#[derive(Debug, Default)]
struct TaskBoard {
    inner: Mutex<Tracked>,
}

impl TaskBoard {
    fn lock(&self) -> MutexGuard<'_, Tracked> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, event: &Event, phase: Phase) {
        let Some((task_id, data)) = ExportEventData::parse(event) else {
            return;
        };
        let snapshot = data.into_snapshot(task_id.clone(), phase);

        let mut tracked = self.lock();
        let settled = tracked
            .tasks
            .get(&task_id)
            .is_some_and(|s| s.status.is_terminal());
        if settled && !snapshot.status.is_terminal() {
            debug!(task_id = %task_id, status = %snapshot.status, "ignoring event for finished task");
            return;
        }
        debug!(task_id = %task_id, status = %snapshot.status, "export event");

        if snapshot.status.is_terminal() {
            if let Some(signal) = tracked.waiters.get(&task_id) {
                signal.send_replace(Some(snapshot.clone()));
            }
        }
        tracked.tasks.insert(task_id, snapshot);
    }

    fn get(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.lock().tasks.get(task_id).cloned()
    }
}

/// Tracks export tasks through the event stream.
#[derive(Debug)]
pub struct ExportMonitor {
    stream: EventStream,
    board: Arc<TaskBoard>,
}

impl ExportMonitor {
    pub fn new(config: EventStreamConfig) -> Self {
        Self::with_stream(EventStream::new(config))
    }

    /// Track exports on an existing stream; registers three handlers on it.
    pub fn with_stream(stream: EventStream) -> Self {
        let board = Arc::new(TaskBoard::default());

        let progress = Arc::clone(&board);
        stream.on_export_progress(move |event| progress.apply(event, Phase::Progress));
        let complete = Arc::clone(&board);
        stream.on_export_complete(move |event| complete.apply(event, Phase::Complete));
        let failed = Arc::clone(&board);
        stream.on_export_error(move |event| failed.apply(event, Phase::Error));

        Self { stream, board }
    }

    pub const fn stream(&self) -> &EventStream {
        &self.stream
    }

    pub async fn start(&self) {
        self.stream.connect().await;
    }

    pub async fn stop(&self) {
        self.stream.disconnect().await;
    }

    /// Last snapshot seen for the task.
    pub fn task_status(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.board.get(task_id)
    }

    /// Wait until the task completes or fails.
    ///
    /// `on_progress` is called with the latest snapshot every
    /// [`PROGRESS_INTERVAL`] until the wait ends. A failed task is
    /// returned as [`QceError::TaskFailed`].
    pub async fn wait_for_task(
        &self,
        task_id: &str,
        timeout: Duration,
        on_progress: Option<ProgressCallback>,
    ) -> QceResult<TaskSnapshot> {
        let mut signal = {
            let mut tracked = self.board.lock();
            if let Some(done) = tracked.tasks.get(task_id).filter(|s| s.status.is_terminal()) {
                return settle(done.clone());
            }
            tracked
                .waiters
                .entry(task_id.to_string())
                .or_insert_with(|| watch::channel(None).0)
                .subscribe()
        };

        let poller = on_progress.map(|callback| {
            tokio::spawn(report_progress(
                Arc::clone(&self.board),
                task_id.to_string(),
                callback,
            ))
        });

        let released = tokio::time::timeout(timeout, async {
            signal
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|done| done.clone())
        })
        .await;

        if let Some(poller) = poller {
            poller.abort();
        }
        drop(signal);

        {
            let mut tracked = self.board.lock();
            if tracked
                .waiters
                .get(task_id)
                .is_some_and(|s| s.receiver_count() == 0)
            {
                tracked.waiters.remove(task_id);
            }
        }

        match released {
            Ok(Some(done)) => settle(done),
            _ => Err(QceError::timeout(
                format!("timed out waiting for task {task_id}"),
                timeout,
            )),
        }
    }

    #[cfg(test)]
    fn waiter_count(&self) -> usize {
        self.board.lock().waiters.len()
    }
}

fn settle(snapshot: TaskSnapshot) -> QceResult<TaskSnapshot> {
    match snapshot.status {
        TaskStatus::Failed => Err(QceError::TaskFailed {
            task_id: snapshot.task_id,
            error: snapshot.error.unwrap_or_else(|| "unknown error".to_string()),
        }),
        TaskStatus::Cancelled => Err(QceError::TaskCancelled {
            task_id: snapshot.task_id,
        }),
        _ => Ok(snapshot),
    }
}

async fn report_progress(board: Arc<TaskBoard>, task_id: String, mut callback: ProgressCallback) {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Some(snapshot) = board.get(&task_id) {
            callback(&snapshot);
        }
    }
}

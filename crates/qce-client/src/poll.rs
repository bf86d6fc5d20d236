//! Polling-based task completion.
//!
//! Repeatedly fetches a task snapshot until it reaches a terminal state.
//! The progress callback always sees the snapshot that decides the next
//! step, including the final one.

use std::time::Duration;

use qce_core::{ExportTask, QceError, QceResult, TaskSource, TaskStatus};
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Progress callback invoked with every fetched snapshot.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(&ExportTask) + Send);

/// Budget for a polling wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl WaitOptions {
    /// Defaults used by the one-call export helpers.
    pub fn for_export() -> Self {
        Self::default().with_timeout(Duration::from_secs(600))
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Poll `source` until `task_id` completes, fails, is cancelled, or the budget runs out.
///
/// A wait gives up before a poll that would start at or past the budget, so
/// a task stuck in a non-terminal state is fetched at most
/// `ceil(timeout / poll_interval)` times.
pub async fn wait_for_completion<S>(
    source: &S,
    task_id: &str,
    options: WaitOptions,
    mut on_progress: Option<ProgressFn<'_>>,
) -> QceResult<ExportTask>
where
    S: TaskSource + ?Sized,
{
    let started = Instant::now();
    let mut polls = 0u32;

    loop {
        let task = source.fetch_task(task_id).await?;
        polls += 1;

        if let Some(callback) = on_progress.as_mut() {
            callback(&task);
        }

        match task.status {
            TaskStatus::Completed => {
                debug!(task_id, polls, "task completed");
                return Ok(task);
            }
            TaskStatus::Failed => {
                return Err(QceError::TaskFailed {
                    task_id: task_id.to_string(),
                    error: task.error.unwrap_or_else(|| "unknown error".to_string()),
                });
            }
            TaskStatus::Cancelled => {
                return Err(QceError::TaskCancelled {
                    task_id: task_id.to_string(),
                });
            }
            TaskStatus::Pending | TaskStatus::Running | TaskStatus::Paused => {}
        }

        if started.elapsed() + options.poll_interval >= options.timeout {
            debug!(task_id, polls, "giving up on task");
            return Err(QceError::timeout(
                format!("timed out waiting for task {task_id}"),
                options.timeout,
            ));
        }

        sleep(options.poll_interval).await;
    }
}

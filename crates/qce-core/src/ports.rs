//! Port definitions (trait abstractions) consumed across crate boundaries.

use async_trait::async_trait;

use crate::domain::ExportTask;
use crate::error::QceResult;

/// Anything that can report the current snapshot of an export task.
///
/// The HTTP client implements this; the polling synchronizer only depends on
/// the trait so it can be driven by fakes in tests.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn fetch_task(&self, task_id: &str) -> QceResult<ExportTask>;
}

use async_trait::async_trait;
use qce_core::{ExportTask, QceResult, TaskSource};

use super::{QceClient, decode_as, decode_list};
use crate::http::{HttpBackend, Method};
use crate::poll::{self, ProgressFn, WaitOptions};

impl<B: HttpBackend> QceClient<B> {
    /// All export tasks known to the service.
    pub async fn tasks(&self) -> QceResult<Vec<ExportTask>> {
        let data = self
            .send(Method::Get, &self.endpoint(&["api", "tasks"]), None)
            .await?;
        decode_list(data, "tasks")
    }

    pub async fn task(&self, task_id: &str) -> QceResult<ExportTask> {
        let data = self
            .send(Method::Get, &self.endpoint(&["api", "tasks", task_id]), None)
            .await?;
        decode_as(data)
    }

    pub async fn delete_task(&self, task_id: &str) -> QceResult<()> {
        self.send(
            Method::Delete,
            &self.endpoint(&["api", "tasks", task_id]),
            None,
        )
        .await?;
        Ok(())
    }

    /// Remove the unzipped files left behind by a zip export.
    pub async fn delete_task_original_files(&self, task_id: &str) -> QceResult<()> {
        self.send(
            Method::Delete,
            &self.endpoint(&["api", "tasks", task_id, "original-files"]),
            None,
        )
        .await?;
        Ok(())
    }

    /// Poll the task until it reaches a terminal state.
    pub async fn wait_for_completion(
        &self,
        task_id: &str,
        options: WaitOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> QceResult<ExportTask> {
        poll::wait_for_completion(self, task_id, options, on_progress).await
    }
}

#[async_trait]
impl<B: HttpBackend> TaskSource for QceClient<B> {
    async fn fetch_task(&self, task_id: &str) -> QceResult<ExportTask> {
        self.task(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::client::tests::client_with;
    use crate::http::Method;
    use crate::http::testing::{CannedResponse, FakeBackend};
    use qce_core::{QceError, TaskStatus};
    use serde_json::json;

    #[tokio::test]
    async fn test_tasks_list_decodes() {
        let backend = FakeBackend::new().with_response(
            "GET /api/tasks",
            CannedResponse::json(
                200,
                &json!({"success": true, "data": {"tasks": [
                    {"id": "a", "status": "completed", "progress": 100},
                    {"id": "b", "status": "running", "progress": 15}
                ]}}),
            ),
        );
        let client = client_with(backend);

        let tasks = client.tasks().await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].status, TaskStatus::Running);
    }

    #[tokio::test]
    async fn test_missing_task_maps_to_task_not_found() {
        let backend = FakeBackend::new().with_response(
            "GET /api/tasks/nope",
            CannedResponse::json(
                404,
                &json!({"success": false, "error": {
                    "type": "NOT_FOUND_ERROR",
                    "message": "task does not exist",
                    "context": {"code": "TASK_NOT_FOUND", "taskId": "nope"}
                }}),
            ),
        );
        let client = client_with(backend);

        let err = client.task("nope").await.unwrap_err();
        assert!(matches!(err, QceError::TaskNotFound { ref task_id } if task_id == "nope"));
    }

    #[tokio::test]
    async fn test_delete_original_files_path() {
        let backend = FakeBackend::new().with_response(
            "DELETE /api/tasks/t1/original-files",
            CannedResponse::json(200, &json!({"success": true, "data": null})),
        );
        let client = client_with(backend);

        client.delete_task_original_files("t1").await.unwrap();
        let requests = client.backend.requests();
        assert_eq!(requests[0].method, Method::Delete);
        assert_eq!(requests[0].url.path(), "/api/tasks/t1/original-files");
    }
}

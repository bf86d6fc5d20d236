use qce_core::{
    ExportFormat, ExportRequest, ExportTask, MessageFilter, Peer, QceError, QceResult,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{QceClient, decode_as};
use crate::http::{HttpBackend, Method};
use crate::poll::{ProgressFn, WaitOptions};

/// Prefix of internal user ids, as opposed to numeric QQ numbers.
const UID_PREFIX: &str = "u_";

/// One page of raw messages from `POST /api/messages/fetch`.
///
/// Message bodies are left as JSON; rendering them is the server's job.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagePage {
    pub messages: Vec<Value>,
    pub total_count: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub cache_hit: bool,
}

impl<B: HttpBackend> QceClient<B> {
    pub async fn fetch_messages(
        &self,
        peer: &Peer,
        filter: Option<&MessageFilter>,
        page: u32,
        limit: u32,
    ) -> QceResult<MessagePage> {
        let mut body = json!({
            "peer": peer,
            "batchSize": 5000,
            "page": page,
            "limit": limit,
        });
        if let Some(filter) = filter {
            body["filter"] = serde_json::to_value(filter).map_err(|e| QceError::Validation {
                message: format!("cannot encode message filter: {e}"),
                code: "VALIDATION_ERROR".to_string(),
            })?;
        }
        let data = self
            .send(
                Method::Post,
                &self.endpoint(&["api", "messages", "fetch"]),
                Some(&body),
            )
            .await?;
        decode_as(data)
    }

    /// Start a server-side export and return the freshly created task.
    pub async fn create_export(&self, request: &ExportRequest) -> QceResult<ExportTask> {
        let body = serde_json::to_value(request).map_err(|e| QceError::Validation {
            message: format!("cannot encode export request: {e}"),
            code: "VALIDATION_ERROR".to_string(),
        })?;
        let data = self
            .send(
                Method::Post,
                &self.endpoint(&["api", "messages", "export"]),
                Some(&body),
            )
            .await?;
        let task: ExportTask = decode_as(data)?;
        info!(task_id = %task.id, peer = %request.peer.peer_uid, format = %request.format, "export task created");
        Ok(task)
    }

    /// Create an export and wait for it to finish.
    pub async fn quick_export(
        &self,
        request: &ExportRequest,
        options: WaitOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> QceResult<ExportTask> {
        let task = self.create_export(request).await?;
        self.wait_for_completion(&task.id, options, on_progress)
            .await
    }

    /// Export a group chat and wait for the result.
    pub async fn export_group(
        &self,
        group_code: &str,
        format: ExportFormat,
        filter: MessageFilter,
        options: WaitOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> QceResult<ExportTask> {
        let request = ExportRequest::new(Peer::group(group_code), format).with_filter(filter);
        self.quick_export(&request, options, on_progress).await
    }

    /// Export a private chat and wait for the result.
    ///
    /// `friend_id` may be a QQ number or an internal uid.
    pub async fn export_friend(
        &self,
        friend_id: &str,
        format: ExportFormat,
        filter: MessageFilter,
        options: WaitOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> QceResult<ExportTask> {
        let uid = self.resolve_friend_uid(friend_id).await?;
        let request = ExportRequest::new(Peer::private(uid), format).with_filter(filter);
        self.quick_export(&request, options, on_progress).await
    }

    /// Map a QQ number to the friend's internal uid.
    ///
    /// Ids that already look like uids are returned unchanged, as are
    /// numbers that match no friend.
    pub async fn resolve_friend_uid(&self, friend_id: &str) -> QceResult<String> {
        if friend_id.starts_with(UID_PREFIX) {
            return Ok(friend_id.to_string());
        }
        let friends = self.friends(1, 999).await?;
        let resolved = friends
            .into_iter()
            .find(|f| f.uin == friend_id)
            .map_or_else(|| friend_id.to_string(), |f| f.uid);
        debug!(friend_id, uid = %resolved, "resolved friend uid");
        Ok(resolved)
    }
}

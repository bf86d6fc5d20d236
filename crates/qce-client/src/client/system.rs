use qce_core::{ExportFile, QceResult, SystemInfo};
use serde_json::Value;

use super::{QceClient, decode_list};
use crate::http::{HttpBackend, Method};

impl<B: HttpBackend> QceClient<B> {
    pub async fn system_info(&self) -> QceResult<SystemInfo> {
        self.get_as(&self.endpoint(&["api", "system", "info"]))
            .await
    }

    pub async fn system_status(&self) -> QceResult<Value> {
        self.get_as(&self.endpoint(&["api", "system", "status"]))
            .await
    }

    pub async fn health_check(&self) -> QceResult<Value> {
        self.get_as(&self.endpoint(&["health"])).await
    }

    pub async fn security_status(&self) -> QceResult<Value> {
        self.get_as(&self.endpoint(&["security-status"])).await
    }

    /// Finished export files stored by the service.
    pub async fn export_files(&self) -> QceResult<Vec<ExportFile>> {
        let data = self
            .get_as(&self.endpoint(&["api", "exports", "files"]))
            .await?;
        decode_list(data, "files")
    }

    pub async fn delete_export_file(&self, file_name: &str) -> QceResult<()> {
        self.send(
            Method::Delete,
            &self.endpoint(&["api", "exports", "files", file_name]),
            None,
        )
        .await?;
        Ok(())
    }

    /// Browser URL previewing an export file.
    pub fn preview_url(&self, file_name: &str) -> String {
        self.endpoint(&["api", "exports", "files", file_name, "preview"])
            .to_string()
    }

    /// Direct download URL of an export file.
    pub fn download_url(&self, file_name: &str, scheduled: bool) -> String {
        let prefix = if scheduled {
            "scheduled-downloads"
        } else {
            "downloads"
        };
        self.endpoint(&[prefix, file_name]).to_string()
    }
}

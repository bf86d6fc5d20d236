//! Error taxonomy shared by the client, launcher and event-stream crates.
//!
//! Every variant maps to a stable machine code (see [`QceError::code`]) so
//! callers can branch without matching on message text.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Result type alias for SDK operations.
pub type QceResult<T> = Result<T, QceError>;

/// Failures raised while supervising the external service process.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// No NapCat-QCE install directory could be located.
    #[error(
        "NapCat-QCE directory not found; set NAPCAT_QCE_PATH or pass the install path explicitly"
    )]
    NapcatDirNotFound,

    /// The QQ runtime the service injects into is not installed.
    #[error("QQ executable not found; install QQNT or set QQ_PATH")]
    QqNotFound,

    /// The install directory exists but the launch script is missing.
    #[error("launch script not found: {}", .0.display())]
    ScriptMissing(PathBuf),

    /// The OS refused to start the process.
    #[error("failed to spawn service process: {0}")]
    Spawn(#[from] std::io::Error),

    /// A client was requested before any credential was known.
    #[error("no access token available: the service is not ready and none is configured")]
    NoToken,
}

/// Errors surfaced by SDK operations.
#[derive(Debug, Error)]
pub enum QceError {
    /// Missing or rejected credential.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Human readable reason
        message: String,
        /// Server or local error code
        code: String,
    },

    /// The server rejected the request parameters.
    #[error("validation failed: {message}")]
    Validation {
        /// Server message
        message: String,
        /// Server error code
        code: String,
    },

    /// Generic server-side failure.
    #[error("API error [{code}]: {message}")]
    Api {
        /// Server message
        message: String,
        /// Server error code
        code: String,
        /// HTTP status of the response, when one was received
        status: Option<u16>,
        /// Raw error object from the response envelope
        details: Value,
    },

    /// Connection, timeout or other transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The server does not know the task id.
    #[error("task not found: {task_id}")]
    TaskNotFound {
        /// The missing task id
        task_id: String,
    },

    /// The server does not know some other resource.
    #[error("{resource_type} not found: {resource_id}")]
    ResourceNotFound {
        /// Kind of resource (group, friend, file, ...)
        resource_type: String,
        /// The missing identifier
        resource_id: String,
    },

    /// An awaited export task ended in the FAILED state.
    #[error("task {task_id} failed: {error}")]
    TaskFailed {
        /// Task id
        task_id: String,
        /// Server-reported failure detail
        error: String,
    },

    /// An awaited export task was cancelled.
    #[error("task {task_id} was cancelled")]
    TaskCancelled {
        /// Task id
        task_id: String,
    },

    /// A local wait exceeded its budget.
    #[error("{message} (timeout {timeout:?})")]
    Timeout {
        /// What timed out
        message: String,
        /// The budget that was exceeded
        timeout: Duration,
    },

    /// Process supervision failure.
    #[error(transparent)]
    Launcher(#[from] LauncherError),

    /// Event channel failure.
    #[error("websocket error: {0}")]
    WebSocket(String),
}

impl QceError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &str {
        match self {
            Self::Authentication { code, .. }
            | Self::Validation { code, .. }
            | Self::Api { code, .. } => code,
            Self::Network(_) => "NETWORK_ERROR",
            Self::TaskNotFound { .. } => "TASK_NOT_FOUND",
            Self::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::TaskFailed { .. } => "TASK_FAILED",
            Self::TaskCancelled { .. } => "TASK_CANCELLED",
            Self::Timeout { .. } => "TIMEOUT_ERROR",
            Self::Launcher(_) => "LAUNCHER_ERROR",
            Self::WebSocket(_) => "WEBSOCKET_ERROR",
        }
    }

    /// Authentication error with the default code.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: "AUTH_ERROR".to_string(),
        }
    }

    /// Timeout error for a wait of the given budget.
    pub fn timeout(message: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            message: message.into(),
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_includes_code() {
        let error = QceError::Api {
            message: "export queue full".to_string(),
            code: "QUEUE_FULL".to_string(),
            status: Some(503),
            details: Value::Null,
        };
        let msg = error.to_string();
        assert!(msg.contains("QUEUE_FULL"));
        assert!(msg.contains("export queue full"));
        assert_eq!(error.code(), "QUEUE_FULL");
    }

    #[test]
    fn test_task_failed_message() {
        let error = QceError::TaskFailed {
            task_id: "task_42".to_string(),
            error: "disk full".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("task_42"));
        assert!(msg.contains("disk full"));
        assert_eq!(error.code(), "TASK_FAILED");
    }

    #[test]
    fn test_launcher_error_converts() {
        let error: QceError = LauncherError::NoToken.into();
        assert_eq!(error.code(), "LAUNCHER_ERROR");
        assert!(error.to_string().contains("no access token"));
    }

    #[test]
    fn test_script_missing_shows_path() {
        let error = LauncherError::ScriptMissing(PathBuf::from("/opt/napcat/launcher.bat"));
        assert!(error.to_string().contains("launcher.bat"));
    }

    #[test]
    fn test_timeout_helper() {
        let error = QceError::timeout("waiting for task_1", Duration::from_secs(3));
        assert_eq!(error.code(), "TIMEOUT_ERROR");
        assert!(error.to_string().contains("waiting for task_1"));
    }

    #[test]
    fn test_authentication_helper_code() {
        let error = QceError::authentication("token rejected");
        assert_eq!(error.code(), "AUTH_ERROR");
    }
}

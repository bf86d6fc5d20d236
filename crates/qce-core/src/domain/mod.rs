//! Domain types exchanged with the export service.
//!
//! All wire structs use camelCase field names and tolerate missing fields,
//! since the service omits most optional values.

mod contact;
mod request;
mod task;

pub use contact::{ExportFile, Friend, Group, NapcatStatus, RuntimeInfo, SelfInfo, SystemInfo};
pub use request::{ExportFormat, ExportOptions, ExportRequest, MessageFilter};
pub use task::{ChatType, ExportTask, Peer, TaskStatus};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept ids that the service sometimes sends as numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

//! Event frames received from the service.

use std::fmt;

use serde_json::{Value, json};

/// Event types the service is known to emit.
///
/// Handlers may also be registered for any other literal type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    ExportProgress,
    ExportComplete,
    ExportError,
    SearchResult,
    SearchProgress,
    SearchComplete,
    SearchError,
    MergeProgress,
    Notification,
    Error,
}

impl EventKind {
    pub const ALL: [Self; 12] = [
        Self::Connected,
        Self::Disconnected,
        Self::ExportProgress,
        Self::ExportComplete,
        Self::ExportError,
        Self::SearchResult,
        Self::SearchProgress,
        Self::SearchComplete,
        Self::SearchError,
        Self::MergeProgress,
        Self::Notification,
        Self::Error,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::ExportProgress => "export_progress",
            Self::ExportComplete => "export_complete",
            Self::ExportError => "export_error",
            Self::SearchResult => "search_result",
            Self::SearchProgress => "search_progress",
            Self::SearchComplete => "search_complete",
            Self::SearchError => "search_error",
            // the service spells this one with a hyphen
            Self::MergeProgress => "merge-progress",
            Self::Notification => "notification",
            Self::Error => "error",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl AsRef<str> for EventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    /// The frame's `data` member, or an empty object.
    pub data: Value,
    /// The whole frame as received.
    pub raw: Value,
}

impl Event {
    /// Split a `{type, data}` frame. A missing type becomes `"unknown"`.
    pub fn from_frame(frame: Value) -> Self {
        let event_type = frame
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let data = frame.get("data").cloned().unwrap_or_else(|| json!({}));
        Self {
            event_type,
            data,
            raw: frame,
        }
    }

    /// An event produced locally rather than received.
    pub fn local(kind: EventKind, data: Value) -> Self {
        let raw = json!({ "type": kind.as_str(), "data": data.clone() });
        Self {
            event_type: kind.as_str().to_string(),
            data,
            raw,
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }

    /// String member of `data`.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::MergeProgress.to_string(), "merge-progress");
        assert_eq!(EventKind::parse("merge_progress"), None);
    }

    #[test]
    fn test_from_frame() {
        let event = Event::from_frame(json!({
            "type": "export_progress",
            "data": {"taskId": "t1", "progress": 40}
        }));
        assert_eq!(event.kind(), Some(EventKind::ExportProgress));
        assert_eq!(event.str_field("taskId"), Some("t1"));
        assert_eq!(event.raw["data"]["progress"], 40);
    }

    #[test]
    fn test_frame_without_type_or_data() {
        let event = Event::from_frame(json!({"hello": true}));
        assert_eq!(event.event_type, "unknown");
        assert_eq!(event.data, json!({}));
        assert_eq!(event.kind(), None);
    }
}

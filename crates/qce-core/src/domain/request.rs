use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::task::Peer;

/// Output format of an export. Rendering happens server-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ExportFormat {
    Txt,
    Json,
    #[default]
    Html,
    Excel,
}

impl ExportFormat {
    /// Name the service expects in export requests.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Txt => "TXT",
            Self::Json => "JSON",
            Self::Html => "HTML",
            Self::Excel => "EXCEL",
        }
    }

    /// File extension of the produced artifact.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Json => "json",
            Self::Html => "html",
            Self::Excel => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "excel" | "xlsx" => Ok(Self::Excel),
            other => Err(format!(
                "unknown export format '{other}' (expected txt, json, html or excel)"
            )),
        }
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Message selection applied by the server before export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageFilter {
    /// Inclusive lower bound, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Inclusive upper bound, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_uids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    pub include_recalled: bool,
    pub include_system: bool,
    pub filter_pure_image_messages: bool,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            start_time: None,
            end_time: None,
            sender_uids: None,
            keywords: None,
            include_recalled: false,
            include_system: true,
            filter_pure_image_messages: false,
        }
    }
}

impl MessageFilter {
    /// Messages from the last `days` days up to now.
    pub fn last_days(days: u32) -> Self {
        Self::last_days_from(days, Utc::now())
    }

    /// Messages in the `days`-day window ending at `now`.
    pub fn last_days_from(days: u32, now: DateTime<Utc>) -> Self {
        let start = now - Duration::days(i64::from(days));
        Self {
            start_time: Some(start.timestamp_millis()),
            end_time: Some(now.timestamp_millis()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = Some(keywords);
        self
    }

    #[must_use]
    pub fn with_senders(mut self, sender_uids: Vec<String>) -> Self {
        self.sender_uids = Some(sender_uids);
        self
    }
}

/// Server-side export tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub batch_size: u32,
    pub include_resource_links: bool,
    pub include_system_messages: bool,
    pub filter_pure_image_messages: bool,
    pub pretty_format: bool,
    pub export_as_zip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            batch_size: 5000,
            include_resource_links: true,
            include_system_messages: true,
            filter_pure_image_messages: false,
            pretty_format: true,
            export_as_zip: false,
            output_dir: None,
        }
    }
}

/// Body of `POST /api/messages/export`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub peer: Peer,
    pub format: ExportFormat,
    pub filter: MessageFilter,
    pub options: ExportOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

impl ExportRequest {
    pub fn new(peer: Peer, format: ExportFormat) -> Self {
        Self {
            peer,
            format,
            filter: MessageFilter::default(),
            options: ExportOptions::default(),
            session_name: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: MessageFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }
}

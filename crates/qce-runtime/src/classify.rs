//! Classification of service output lines.
//!
//! The service announces its side channel, its access token and its
//! readiness through human-readable log lines. All matching against that
//! text lives here so format changes only touch this file.

use std::sync::LazyLock;

use regex::Regex;

/// Announcement that further output goes to a named pipe.
static SIDE_CHANNEL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"已重定向到命名管道:\s*(\\\\\.\\pipe\\\S+)").ok());

const TOKEN_MARKERS: [&str; 2] = ["访问令牌", "Access Token"];
const STARTED_MARKER: &str = "QQ聊天记录导出工具已启动";
const ERROR_MARKER_ZH: &str = "错误";

/// Everything a single output line signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineClass {
    /// Name of the side channel announced by this line.
    pub side_channel: Option<String>,
    /// Access token announced by this line.
    pub token: Option<String>,
    /// The line marks the service as started.
    pub started: bool,
    /// The line reports an error.
    pub error: bool,
}

impl LineClass {
    /// Whether this line makes the service ready.
    pub const fn signals_ready(&self) -> bool {
        self.token.is_some() || self.started
    }
}

/// Classify one trimmed output line.
pub fn classify_line(line: &str) -> LineClass {
    let side_channel = SIDE_CHANNEL_RE
        .as_ref()
        .and_then(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let token = if TOKEN_MARKERS.iter().any(|m| line.contains(m)) {
        extract_token(line)
    } else {
        None
    };

    LineClass {
        side_channel,
        token,
        started: line.contains(STARTED_MARKER),
        error: line.to_lowercase().contains("error") || line.contains(ERROR_MARKER_ZH),
    }
}

/// Trailing colon-delimited segment of a token line.
fn extract_token(line: &str) -> Option<String> {
    let (_, tail) = line.rsplit_once(':')?;
    let token = tail.trim();
    (!token.is_empty()).then(|| token.to_string())
}

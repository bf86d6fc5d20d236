//! Persisted export preferences.
//!
//! [`ExportConfigStore`] is constructed explicitly and handed to whatever
//! needs it; there is no process-wide instance.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{ExportFormat, ExportOptions};
use crate::paths::{default_exports_dir, export_config_path};

/// Characters that are not allowed in file names on common filesystems.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// User preferences applied to exports started from this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub output_dir: Option<PathBuf>,
    /// Supports `{name}`, `{date}`, `{time}` and `{type}` placeholders.
    pub file_name_template: String,
    pub include_resources: bool,
    pub resource_folder: String,
    pub batch_size: u32,
    pub include_system_messages: bool,
    pub include_recalled_messages: bool,
    pub pretty_format: bool,
    pub encoding: String,
    pub export_as_zip: bool,
    pub delete_original_after_zip: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Html,
            output_dir: None,
            file_name_template: "{name}_{date}".to_string(),
            include_resources: true,
            resource_folder: "resources".to_string(),
            batch_size: 5000,
            include_system_messages: true,
            include_recalled_messages: false,
            pretty_format: true,
            encoding: "utf-8".to_string(),
            export_as_zip: false,
            delete_original_after_zip: false,
        }
    }
}

impl ExportConfig {
    /// Directory exports are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(default_exports_dir)
    }

    /// Sanitized file name (with extension) for an export of `chat_name`.
    pub fn file_name(&self, chat_name: &str, chat_type: &str, now: DateTime<Local>) -> String {
        let stem = self
            .file_name_template
            .replace("{name}", chat_name)
            .replace("{date}", &now.format("%Y%m%d").to_string())
            .replace("{time}", &now.format("%H%M%S").to_string())
            .replace("{type}", chat_type);
        format!("{}.{}", sanitize_file_name(&stem), self.extension())
    }

    /// Full output path for an export started now.
    pub fn output_path(&self, chat_name: &str, chat_type: &str) -> PathBuf {
        self.output_dir()
            .join(self.file_name(chat_name, chat_type, Local::now()))
    }

    fn extension(&self) -> &'static str {
        if self.export_as_zip {
            "zip"
        } else {
            self.format.extension()
        }
    }

    /// Server-side options derived from these preferences.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            batch_size: self.batch_size,
            include_resource_links: self.include_resources,
            include_system_messages: self.include_system_messages,
            pretty_format: self.pretty_format,
            export_as_zip: self.export_as_zip,
            output_dir: self
                .output_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            ..ExportOptions::default()
        }
    }
}

/// Replace characters that cannot appear in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if FORBIDDEN_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Loads and saves [`ExportConfig`] as JSON.
#[derive(Debug, Clone)]
pub struct ExportConfigStore {
    path: PathBuf,
}

impl Default for ExportConfigStore {
    fn default() -> Self {
        Self::new(export_config_path())
    }
}

impl ExportConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, falling back to defaults when the file is absent or invalid.
    pub fn load(&self) -> ExportConfig {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "invalid export config, using defaults");
                ExportConfig::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => ExportConfig::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read export config, using defaults");
                ExportConfig::default()
            }
        }
    }

    /// Write preferences, creating the parent directory if needed.
    pub fn save(&self, config: &ExportConfig) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config).map_err(io::Error::other)?;
        fs::write(&self.path, json)
    }

    /// Load, modify and save in one step.
    pub fn update(&self, f: impl FnOnce(&mut ExportConfig)) -> io::Result<ExportConfig> {
        let mut config = self.load();
        f(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    /// Restore defaults on disk.
    pub fn reset(&self) -> io::Result<ExportConfig> {
        let config = ExportConfig::default();
        self.save(&config)?;
        Ok(config)
    }
}

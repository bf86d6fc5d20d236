//! Core domain types and port definitions for the QQ Chat Exporter SDK.
//!
//! This crate has no networking or process code. It owns:
//!
//! - the error taxonomy shared by every adapter crate ([`QceError`])
//! - export task, peer and filter types exchanged with the service
//! - local credential lookup ([`TokenResolver`]) and export preferences
//! - the [`TaskSource`] port consumed by the polling synchronizer

#![deny(unused_crate_dependencies)]

pub mod auth;
pub mod domain;
pub mod error;
pub mod export_config;
pub mod paths;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use auth::{SecurityConfig, TOKEN_ENV_VAR, TokenResolver, TokenSource, load_security_config};
pub use domain::{
    ChatType, ExportFile, ExportFormat, ExportOptions, ExportRequest, ExportTask, Friend, Group,
    MessageFilter, NapcatStatus, Peer, RuntimeInfo, SelfInfo, SystemInfo, TaskStatus,
};
pub use error::{LauncherError, QceError, QceResult};
pub use export_config::{ExportConfig, ExportConfigStore};
pub use paths::{
    CONFIG_DIR_ENV, CONFIG_DIR_NAME, config_dir, default_exports_dir, export_config_path,
    security_config_path,
};
pub use ports::TaskSource;


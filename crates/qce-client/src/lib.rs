//! HTTP client for the QQ Chat Exporter service.
//!
//! # Architecture
//!
//! - [`http`]: the [`HttpBackend`] trait and its reqwest implementation
//! - [`envelope`]: `{success, data}` decoding and error mapping
//! - [`client`]: [`QceClient`] with typed bindings for tasks, messages,
//!   contacts and system endpoints
//! - [`poll`]: polling-based task completion
//!
//! ```no_run
//! use qce_client::{DefaultQceClient, WaitOptions};
//! use qce_core::{ExportFormat, MessageFilter, TokenResolver};
//!
//! # async fn demo() -> qce_core::QceResult<()> {
//! let client = DefaultQceClient::connect_auto(&TokenResolver::new(), None, 40653, None)?;
//! let task = client
//!     .export_group("123456789", ExportFormat::Html, MessageFilter::last_days(7), WaitOptions::for_export(), None)
//!     .await?;
//! println!("exported {} messages", task.message_count);
//! # Ok(())
//! # }
//! ```

#![deny(unused_crate_dependencies)]

pub mod client;
pub mod config;
pub mod envelope;
pub mod http;
pub mod poll;

pub use client::{DefaultQceClient, MessagePage, QceClient};
pub use config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use envelope::{WireErrorKind, decode_response};
pub use http::{HttpBackend, Method, RawResponse, ReqwestBackend};
pub use poll::{ProgressFn, WaitOptions, wait_for_completion};


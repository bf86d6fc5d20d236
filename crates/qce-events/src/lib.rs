//! Event stream client for the QQ Chat Exporter service.
//!
//! [`EventStream`] keeps one WebSocket connection open, reconnecting when
//! it drops, and dispatches `{type, data}` frames to handlers registered
//! per event type. [`ExportMonitor`] builds push-based export tracking on
//! top of it.

#![deny(unused_crate_dependencies)]

pub mod event;
pub mod handlers;
pub mod monitor;
pub mod stream;

pub use event::{Event, EventKind};
pub use handlers::{Handler, HandlerId, HandlerRegistry};
pub use monitor::{ExportMonitor, PROGRESS_INTERVAL, ProgressCallback, TaskSnapshot};
pub use stream::{DEFAULT_URL, EventStream, EventStreamConfig};

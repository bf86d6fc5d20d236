//! Launcher for the NapCat-QCE export service.
//!
//! [`Launcher`] spawns the service, reads its stdout, stderr and (once
//! announced) its side channel, and detects readiness from the output.
//!
//! ```no_run
//! use std::time::Duration;
//! use qce_runtime::{DiscoverOptions, LaunchConfig, Launcher};
//!
//! # async fn demo() -> qce_core::QceResult<()> {
//! let config = LaunchConfig::discover(&DiscoverOptions::default())?;
//! let launcher = Launcher::new(config).on_ready(|token| println!("ready: {token:?}"));
//! if launcher.start(true, Duration::from_secs(60)).await? {
//!     let client = launcher.get_client("localhost", 40653)?;
//!     println!("{:?}", client.system_info().await?);
//! }
//! launcher.stop(false).await;
//! # Ok(())
//! # }
//! ```

#![deny(unused_crate_dependencies)]

pub mod classify;
pub mod launcher;
pub mod lines;
pub mod output;
pub mod shutdown;
mod side_channel;

pub use classify::{LineClass, classify_line};
pub use launcher::{
    DiscoverOptions, LaunchConfig, Launcher, NAPCAT_PATH_ENV, QQ_PATH_ENV, run_with_service,
};
pub use lines::LineBuffer;
pub use output::{Callbacks, LineCallback, LineSource, ReadyCallback, RunState};

//! Reader for the service's redirected output channel.
//!
//! After injection the service may announce that its console output now
//! goes to a named pipe. Lines read from that pipe go through the same
//! classification as stdout.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tracing::{debug, warn};

use crate::output::{LineSource, RunState, pump};

/// Delay before connecting, giving the service time to create the pipe.
pub const CONNECT_DELAY: Duration = Duration::from_millis(500);

/// Connect to `name` and pump its lines until it closes.
///
/// A connection failure is reported once through `on_error` and is not
/// retried.
pub async fn read(name: String, state: Arc<RunState>) {
    tokio::time::sleep(CONNECT_DELAY).await;
    if !state.is_running() {
        return;
    }

    match open(&name).await {
        Ok(stream) => {
            debug!(channel = %name, "connected to side channel");
            pump(stream, LineSource::SideChannel, state).await;
        }
        Err(e) => {
            warn!(channel = %name, error = %e, "failed to connect to side channel");
            state
                .callbacks()
                .error(&format!("cannot connect to side channel {name}: {e}"));
        }
    }
}

#[cfg(windows)]
async fn open(name: &str) -> io::Result<impl AsyncRead + Unpin> {
    tokio::net::windows::named_pipe::ClientOptions::new().open(name)
}

#[cfg(not(windows))]
async fn open(name: &str) -> io::Result<impl AsyncRead + Unpin> {
    // FIFOs stand in for named pipes off Windows.
    tokio::fs::File::open(name).await
}

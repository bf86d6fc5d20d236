//! Stopping a supervised child, gracefully when possible.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Stop `child` and reap it.
///
/// Without `force`, Unix children get SIGTERM and `grace` to exit before
/// being killed. Windows has no portable equivalent, so the child is
/// killed directly.
pub async fn stop_child(child: &mut Child, grace: Duration, force: bool) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        debug!(?status, "child already exited");
        return Ok(status);
    }

    if force {
        child.kill().await?;
        return child.wait().await;
    }

    terminate(child, grace).await
}

#[cfg(unix)]
async fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "child has no PID"))?;
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = tokio::time::timeout(grace, child.wait()).await {
        return result;
    }

    warn!(pid, ?grace, "child ignored SIGTERM, killing");
    child.kill().await?;
    child.wait().await
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, _grace: Duration) -> io::Result<ExitStatus> {
    child.kill().await?;
    child.wait().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::process::Command;

    #[tokio::test]
    async fn test_sigterm_stops_sleep() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let status = stop_child(&mut child, Duration::from_secs(5), false)
            .await
            .unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn test_escalates_when_sigterm_ignored() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .spawn()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        stop_child(&mut child, Duration::from_millis(300), false)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_already_exited_child() {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().await.unwrap();
        let status = stop_child(&mut child, Duration::from_secs(1), true)
            .await
            .unwrap();
        assert!(status.success());
    }
}

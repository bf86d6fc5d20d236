//! `qce monitor`: print events, or wait for one task through them.

use std::time::Duration;

use anyhow::Result;
use qce_events::{EventKind, EventStream, ExportMonitor, ProgressCallback, TaskSnapshot};
use tracing::warn;

use crate::context::CliContext;
use crate::presentation::{percent_bar, progress_position};

pub async fn execute(ctx: &CliContext, task: Option<&str>, timeout: u64) -> Result<()> {
    match task {
        Some(task_id) => wait_for_task(ctx, task_id, Duration::from_secs(timeout)).await,
        None => print_events(ctx).await,
    }
}

async fn wait_for_task(ctx: &CliContext, task_id: &str, timeout: Duration) -> Result<()> {
    let monitor = ExportMonitor::new(ctx.event_config());
    monitor.start().await;
    if !monitor.stream().is_connected() {
        warn!(url = %monitor.stream().config().url, "event stream not connected yet, waiting anyway");
    }

    let pb = percent_bar(task_id);
    let bar = pb.clone();
    let on_progress: ProgressCallback = Box::new(move |snapshot: &TaskSnapshot| {
        bar.set_position(progress_position(snapshot.progress));
        bar.set_message(snapshot.message.clone());
    });
    let result = monitor.wait_for_task(task_id, timeout, Some(on_progress)).await;
    pb.finish_and_clear();
    monitor.stop().await;

    let snapshot = result?;
    println!("Task {} {}", snapshot.task_id, snapshot.status);
    println!("Messages:  {}", snapshot.message_count);
    if let Some(file) = &snapshot.file_name {
        println!("File:      {file}");
    }
    if let Some(url) = &snapshot.download_url {
        println!("Download:  {url}");
    }
    Ok(())
}

async fn print_events(ctx: &CliContext) -> Result<()> {
    let stream = EventStream::new(ctx.event_config());
    for kind in EventKind::ALL {
        stream.on(kind, |event| println!("[{}] {}", event.event_type, event.data));
    }

    stream.connect().await;
    println!(
        "Listening on {} ({}). Press Ctrl-C to stop.",
        stream.config().url,
        if stream.is_connected() { "connected" } else { "connecting" }
    );
    tokio::signal::ctrl_c().await?;
    stream.disconnect().await;
    Ok(())
}

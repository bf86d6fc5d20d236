//! `qce export group|friend`: one-shot export with a progress bar.

use std::time::Duration;

use anyhow::Result;
use qce_client::WaitOptions;
use qce_core::{ExportConfigStore, ExportRequest, ExportTask, MessageFilter, Peer};

use crate::commands::{ExportArgs, ExportTarget};
use crate::context::CliContext;
use crate::presentation::{percent_bar, print_task, progress_position};

/// Build the export request; defaults come from `export_config.json`.
pub fn build_request(args: &ExportArgs, peer: Peer, store: &ExportConfigStore) -> ExportRequest {
    let prefs = store.load();
    let format = args.format.unwrap_or(prefs.format);
    let filter = args
        .days
        .map_or_else(MessageFilter::default, MessageFilter::last_days);

    let request = ExportRequest::new(peer, format)
        .with_filter(filter)
        .with_options(prefs.export_options());
    match &args.name {
        Some(name) => request.with_session_name(name.clone()),
        None => request,
    }
}

pub async fn execute(ctx: &CliContext, target: &ExportTarget) -> Result<()> {
    let client = ctx.client()?;

    let (args, peer) = match target {
        ExportTarget::Group(args) => (args, Peer::group(args.id.clone())),
        ExportTarget::Friend(args) => {
            let uid = client.resolve_friend_uid(&args.id).await?;
            (args, Peer::private(uid))
        }
    };
    let request = build_request(args, peer, &ExportConfigStore::default());

    let pb = percent_bar("creating export");
    let mut on_progress = |task: &ExportTask| {
        pb.set_position(progress_position(task.progress));
        pb.set_message(task.status.to_string());
    };
    let options = WaitOptions::for_export().with_timeout(Duration::from_secs(args.timeout));
    let result = client
        .quick_export(&request, options, Some(&mut on_progress))
        .await;
    pb.finish_and_clear();

    let task = result?;
    let download = task
        .download_url
        .clone()
        .or_else(|| task.file_name.as_deref().map(|f| client.download_url(f, false)));
    println!("Export complete.");
    print_task(&task, download.as_deref());
    Ok(())
}

//! `qce tasks ...`

use std::time::Duration;

use anyhow::Result;
use qce_client::WaitOptions;
use qce_core::ExportTask;

use crate::commands::TaskCommand;
use crate::context::CliContext;
use crate::presentation::{percent_bar, print_task, print_task_table, progress_position};

pub async fn execute(ctx: &CliContext, command: &TaskCommand) -> Result<()> {
    let client = ctx.client()?;

    match command {
        TaskCommand::List => {
            let tasks = client.tasks().await?;
            if tasks.is_empty() {
                println!("No export tasks.");
                return Ok(());
            }
            println!("Found {} task(s):\n", tasks.len());
            print_task_table(&tasks);
        }
        TaskCommand::Show { task_id, json } => {
            let task = client.task(task_id).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                print_task(&task, task.download_url.as_deref());
            }
        }
        TaskCommand::Wait {
            task_id,
            timeout,
            interval,
        } => {
            let options = WaitOptions::default()
                .with_timeout(Duration::from_secs(*timeout))
                .with_poll_interval(Duration::from_secs(*interval));
            let pb = percent_bar(task_id);
            let mut on_progress = |task: &ExportTask| {
                pb.set_position(progress_position(task.progress));
                pb.set_message(format!("{task_id} {}", task.status));
            };
            let result = client
                .wait_for_completion(task_id, options, Some(&mut on_progress))
                .await;
            pb.finish_and_clear();
            print_task(&result?, None);
        }
        TaskCommand::Delete {
            task_id,
            with_files,
        } => {
            if *with_files {
                client.delete_task_original_files(task_id).await?;
                println!("Deleted exported files of {task_id}.");
            }
            client.delete_task(task_id).await?;
            println!("Deleted task {task_id}.");
        }
    }
    Ok(())
}

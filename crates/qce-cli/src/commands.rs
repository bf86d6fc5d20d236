//! Subcommand definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use qce_core::ExportFormat;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the export service, print its token and stream its output
    Launch(LaunchArgs),

    /// Export a conversation and wait for the file
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },

    /// Inspect and manage export tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Watch the event stream, or wait for one task through it
    Monitor {
        /// Wait for this task instead of printing every event
        #[arg(long)]
        task: Option<String>,

        /// Seconds to wait for the task
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },

    /// Show service health, version and where the token came from
    Status,
}

#[derive(Debug, Args)]
pub struct LaunchArgs {
    /// NapCat-QCE install directory
    #[arg(long, env = "NAPCAT_QCE_PATH")]
    pub napcat_path: Option<PathBuf>,

    /// Path to QQ.exe
    #[arg(long)]
    pub qq_path: Option<PathBuf>,

    /// Use launcher.bat, which needs administrator rights
    #[arg(long)]
    pub admin_mode: bool,

    /// QQ number to log in automatically
    #[arg(long)]
    pub uin: Option<String>,

    /// Seconds to wait for the service to become ready
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

#[derive(Debug, Subcommand)]
pub enum ExportTarget {
    /// Export a group chat by group number
    Group(ExportArgs),
    /// Export a private chat by QQ number or uid
    Friend(ExportArgs),
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Group number, or friend QQ number / uid
    pub id: String,

    /// txt, json, html or excel (default: export_config.json)
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Only export the last N days
    #[arg(long)]
    pub days: Option<u32>,

    /// Session name shown in the exported file
    #[arg(long)]
    pub name: Option<String>,

    /// Seconds to wait for the export
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// List all export tasks
    List,

    /// Show one task
    Show {
        task_id: String,

        /// Print the raw task as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll a task until it finishes
    Wait {
        task_id: String,

        /// Seconds to wait
        #[arg(long, default_value_t = 300)]
        timeout: u64,

        /// Seconds between polls
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },

    /// Delete a task record
    Delete {
        task_id: String,

        /// Also delete the task's exported files
        #[arg(long)]
        with_files: bool,
    },
}

//! Root CLI structure with global options.

use clap::Parser;
use qce_client::DEFAULT_PORT;

use crate::commands::Commands;

/// Command-line interface for the NapCat-QCE chat export service.
#[derive(Debug, Parser)]
#[command(name = "qce")]
#[command(about = "Launch NapCat-QCE and export QQ chat history")]
#[command(version)]
pub struct Cli {
    /// Service host (default: serverHost from security.json, else localhost)
    #[arg(long, global = true, env = "QCE_HOST")]
    pub host: Option<String>,

    /// Service port
    #[arg(long, global = true, env = "QCE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Access token (default: security.json)
    #[arg(long, global = true, env = "NAPCAT_QCE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ExportTarget, TaskCommand};
    use clap::CommandFactory;
    use qce_core::ExportFormat;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "qce", "--verbose", "--host", "10.0.0.2", "--port", "9000", "status",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(cli.port, 9000);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_export_group_args() {
        let cli = Cli::parse_from([
            "qce", "export", "group", "123456", "--format", "json", "--days", "7",
        ]);
        let Commands::Export { target: ExportTarget::Group(args) } = cli.command else {
            panic!("expected export group");
        };
        assert_eq!(args.id, "123456");
        assert_eq!(args.format, Some(ExportFormat::Json));
        assert_eq!(args.days, Some(7));
        assert_eq!(args.timeout, 600);
    }

    #[test]
    fn test_bad_format_is_rejected() {
        let result = Cli::try_parse_from(["qce", "export", "friend", "42", "--format", "pdf"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tasks_wait_defaults() {
        let cli = Cli::parse_from(["qce", "tasks", "wait", "task-1"]);
        let Commands::Tasks { command: TaskCommand::Wait { task_id, timeout, interval } } =
            cli.command
        else {
            panic!("expected tasks wait");
        };
        assert_eq!(task_id, "task-1");
        assert_eq!(timeout, 300);
        assert_eq!(interval, 2);
    }

    #[test]
    fn test_launch_flags() {
        let cli = Cli::parse_from(["qce", "launch", "--admin-mode", "--uin", "10001"]);
        let Commands::Launch(args) = cli.command else {
            panic!("expected launch");
        };
        assert!(args.admin_mode);
        assert_eq!(args.uin.as_deref(), Some("10001"));
        assert_eq!(args.timeout, 60);
    }
}

//! `qce launch`: run the service in the foreground.

use std::time::Duration;

use anyhow::{Result, bail};
use qce_runtime::{DiscoverOptions, LaunchConfig, Launcher};
use tracing::info;

use crate::commands::LaunchArgs;
use crate::context::CliContext;

pub async fn execute(ctx: &CliContext, args: &LaunchArgs) -> Result<()> {
    let options = DiscoverOptions {
        napcat_path: args.napcat_path.clone(),
        qq_path: args.qq_path.clone(),
        user_mode: !args.admin_mode,
        auto_login_uin: args.uin.clone(),
    };
    let config = LaunchConfig::discover(&options)?;
    println!("Starting {}", config.program.display());

    let launcher = Launcher::new(config)
        .on_output(|line| println!("{line}"))
        .on_error(|line| eprintln!("! {line}"));

    let ready = launcher
        .start(true, Duration::from_secs(args.timeout))
        .await?;
    info!(pid = launcher.pid(), ready, "launch finished");

    if ready {
        println!();
        match launcher.token() {
            Some(token) => println!("Service ready. Access token: {token}"),
            None => println!("Service ready (no access token announced)."),
        }
        println!("Try: qce --port {} status", ctx.port);
    } else if launcher.is_running() {
        println!(
            "Service not ready after {}s; leaving it running.",
            args.timeout
        );
    } else {
        launcher.stop(false).await;
        bail!("service exited before becoming ready");
    }

    println!("Press Ctrl-C to stop.");
    let mut check = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            _ = check.tick() => {
                if !launcher.is_running() {
                    eprintln!("Service process exited.");
                    break;
                }
            }
        }
    }

    launcher.stop(false).await;
    println!("Service stopped.");
    Ok(())
}

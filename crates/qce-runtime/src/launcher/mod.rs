//! Service process supervision.

mod config;
mod supervisor;

pub use config::{
    DiscoverOptions, LaunchConfig, NAPCAT_PATH_ENV, QQ_PATH_ENV, find_napcat_dir,
    find_qq_executable,
};
pub use supervisor::{Launcher, run_with_service};

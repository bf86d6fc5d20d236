//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `RUST_LOG`, else by `verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init()
        .ok(); // Already installed when called twice
}

const fn default_directive(verbose: bool) -> &'static str {
    if verbose { "qce=debug" } else { "qce=info" }
}

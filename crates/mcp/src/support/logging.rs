#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

/// Stdout carries the protocol, so logs always go to stderr.
pub(crate) fn init_logging(filter: Option<&str>) {
    let filter = filter
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .try_init();
    if let Err(err) = installed {
        // Events still reach whichever subscriber got there first.
        tracing::debug!(error = %err, "global subscriber already installed");
    }
}

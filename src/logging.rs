//! Logging setup for the toolgen binary.
//!
//! Logs go to stderr so revealed output on stdout stays clean.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Default: WARN (DEBUG with `verbose`), RUST_LOG override.
pub fn init(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(rust_log.as_deref(), verbose))
        .init();
}

fn build_filter(directives: Option<&str>, verbose: bool) -> EnvFilter {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };

    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level.to_string()))
}

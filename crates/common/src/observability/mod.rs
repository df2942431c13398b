//! Tracing subscriber setup shared by the binaries

use crate::config::ObservabilityConfig;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Output goes to
/// stderr so stdout stays free for results.
pub fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init: tests and embedding callers may have installed one already
    if config.json_logging {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

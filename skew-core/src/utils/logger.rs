use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for a pipeline service. `RUST_LOG` wins over the
/// passed level.
///
/// Every background thread in the pipeline is named (`feed-listener`,
/// `alpha-worker-N`, `signal-sink`), so the plain layer prints thread names
/// rather than ids.
pub fn init_logger(log_level: &str, json_logs: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .init();
    }
}

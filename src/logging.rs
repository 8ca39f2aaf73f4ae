use tracing_subscriber::{fmt, EnvFilter};

/// One JSON object per line. `RUST_LOG` wins over `LOG_LEVEL` when set.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(log_level)));

    fmt()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_env_filter(filter)
        .init();
}

/// Maps `LOG_LEVEL` onto debug < info < warn < error; anything else is info.
fn level_directive(log_level: &str) -> &'static str {
    match log_level.trim().to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

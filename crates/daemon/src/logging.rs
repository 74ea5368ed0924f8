//! Tracing subscriber setup: `RUST_LOG`-driven filtering, with the output
//! formatter chosen by `LOG_FORMAT` (SPEC_FULL.md §9.1) — `pretty` for
//! local development, `json` for production log aggregation.

use tracing_subscriber::EnvFilter;

pub fn init(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_current_span(true)
                .with_target(true)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

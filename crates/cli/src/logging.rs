//! Tracing setup. Logs go to stderr; stdout carries the protocol.

use tracing_subscriber::EnvFilter;

/// Fallback filter variable, read when `RUST_LOG` is unset.
const LOG_LEVEL_VAR: &str = "METASO_LOG_LEVEL";
const DEFAULT_LEVEL: &str = "info";

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var(LOG_LEVEL_VAR)
            .map(|raw| level_directive(&raw))
            .unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    })
}

/// Accepts `tracing` level names as well as the `WARNING`/`CRITICAL`
/// spellings used by other logging stacks.
fn level_directive(raw: &str) -> String {
    let level = raw.trim().to_ascii_lowercase();
    match level.as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "" => DEFAULT_LEVEL.to_string(),
        _ => level,
    }
}

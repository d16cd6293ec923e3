use tracing_subscriber::EnvFilter;

/// Initialize tracing with a json or pretty formatter. RUST_LOG takes
/// precedence over the configured level when set.
pub fn init(log_format: &str, log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    match normalize_format(log_format) {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .init();
        }
    }
}

// Runs before the subscriber exists, so the warning goes to stderr directly.
fn normalize_format(format: &str) -> &'static str {
    match format.to_lowercase().as_str() {
        "json" => "json",
        "pretty" | "compact" | "text" => "pretty",
        _ => {
            eprintln!(
                "WARN: unknown log format '{format}', defaulting to 'pretty'. Valid options: json, pretty"
            );
            "pretty"
        }
    }
}

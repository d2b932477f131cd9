use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: the configured level, raised by each `-v`.
fn default_directive(level: &str, verbose: u8) -> &str {
    match verbose {
        0 => level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays parseable.
pub fn init(level: &str, verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(level, verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

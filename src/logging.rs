//! Logging init: structured logs on stderr, stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Default filter for a given `-v` count; `RUST_LOG` takes precedence.
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,newtab_links=info,newtab=info",
        1 => "warn,newtab_links=debug,newtab=debug",
        _ => "info,newtab_links=trace,newtab=trace",
    }
}

pub fn init_logging(verbose: u8) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

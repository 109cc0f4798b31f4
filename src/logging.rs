//! Tracing subscriber setup for the `gauge` binary.
//!
//! Filter precedence: `GAUGE_LOG`, then `RUST_LOG`, then a level derived from
//! `-v` flags. Everything goes to stderr so stdout stays clean for JSON/CSV.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

const LOG_ENV: &str = "GAUGE_LOG";

/// Default directive for a given number of `-v` flags.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); using {}", default_directive(verbosity));
            EnvFilter::new(default_directive(verbosity))
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity))),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    let _ = fmt()
        .with_env_filter(build_filter(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

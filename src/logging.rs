//! Log setup for the command line binary.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence when set. Otherwise `verbose` turns on debug
/// output for this crate and everything else stays at `warn`. Logs go to
/// stderr so command output on stdout can be piped.
pub fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second call (e.g. from tests) must not panic
    let _ = tracing_subscriber::registry()
        .with(stderr_log.with_filter(filter))
        .try_init();
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose { "warn,moneta=debug" } else { "warn" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(false), "warn");
        assert_eq!(default_directives(true), "warn,moneta=debug");
    }

    #[test]
    fn test_setup_logging_twice_is_harmless() {
        setup_logging(false);
        setup_logging(true);
    }
}

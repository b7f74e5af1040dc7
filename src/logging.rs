//! Diagnostic logging.
//!
//! Events go to stderr so they never mix with chat output on stdout.
//! `RUST_LOG` takes precedence over the `-v` flag.

use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "worldchat=debug,warn"
    } else {
        "warn"
    }
}

pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_only_our_own_events() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "worldchat=debug,warn");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false);
        init_tracing(true);
    }
}

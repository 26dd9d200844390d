//! Tracing setup for the binary.
//!
//! Logs go to stderr so the reply on stdout can be piped on its own.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "catalog_agent=debug,catalog_agent_cli=debug,warn"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. `--verbose` wins over `RUST_LOG`; otherwise `RUST_LOG` is
/// honored and defaults to `warn`. A second call is a no-op.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(default_filter(true))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(false)))
    };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init();
}

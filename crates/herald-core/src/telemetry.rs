//! Tracing subscriber setup for harness runs

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter_for(verbose: u8, quiet: bool) -> EnvFilter {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the verbosity flags when set.
///
/// # Panics
///
/// Panics if a global subscriber is already installed; use
/// [`try_init_tracing`] from test setup code.
pub fn init_tracing(verbose: u8, quiet: bool) {
    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt::layer().with_target(false))
        .init();
}

/// Install the global subscriber unless one already exists
///
/// Returns `false` when another subscriber was already installed.
pub fn try_init_tracing(verbose: u8, quiet: bool) -> bool {
    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt::layer().with_target(false).with_test_writer())
        .try_init()
        .is_ok()
}

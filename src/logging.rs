//! Tracing subscriber setup for binaries and tests that embed the crate.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the process. `RUST_LOG` controls filtering, for example
//! `RUST_LOG=spider_collector=debug`, and defaults to `info`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing_subscriber::util::TryInitError;

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Returns an error instead of panicking when a global subscriber is already set.
pub fn init() -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).compact())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_an_error() {
        let first = init();
        // Another test may have installed a subscriber first.
        if first.is_ok() {
            assert!(init().is_err());
        }
        tracing::info!("logging initialized");
    }
}

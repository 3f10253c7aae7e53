use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Installs a tracing subscriber for test runs, honoring `RUST_LOG`.
/// Safe to call from every test; only the first call in a process installs.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let installed = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_filter(env_filter),
            )
            .try_init();
        if installed.is_ok() {
            debug!("test logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repeated_initialization_when_called_then_stays_idempotent() {
        init_test_logging();
        init_test_logging();
    }
}

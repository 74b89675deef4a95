// 19.x logging.rs: subscriber setup for the binary and tests.
// RUST_LOG wins over the passed default level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global fmt subscriber. Returns false when one is already
/// installed, which happens when several tests call it.
pub fn init_logging(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_thread_names(true))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_logging("warn");
        assert!(!init_logging("debug"));
    }
}

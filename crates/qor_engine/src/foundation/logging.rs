//! Logging utilities
//!
//! The engine logs through the `log` facade; applications pick the sink.
//! `init` installs `env_logger` with a default filter taken from
//! `LoggingConfig::level` that `RUST_LOG` still overrides.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system with a default filter such as `"info"` or
/// `"qor_engine=debug"`.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

/// Initialize a logger for unit tests (captured by the test harness)
#[cfg(test)]
pub fn init_test() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//! Logger setup plus logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! use crate::{log_info, log_warn};
//!
//! const ENABLE_LOGS: bool = true;
//!
//! log_info!("parsed {} rows", 12);
//! ```

/// Install `env_logger` at `info` unless `RUST_LOG` says otherwise.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

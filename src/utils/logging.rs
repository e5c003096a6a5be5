//! Logging macros gated on a module-level `ENABLE_LOGS` const, so chatty
//! modules (the sampling loop) can be silenced without touching call sites.
//!
//! Each module using these defines `const ENABLE_LOGS: bool = ...;` and
//! imports the macros from the crate root.

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
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

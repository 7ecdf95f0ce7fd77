//! Internal logging helpers

/// Step-by-step narration of the reclaim flow.
///
/// Expands to `log::info!` with the `debug-output` feature. Without it the
/// arguments are still type-checked but nothing is emitted.
#[cfg(feature = "debug-output")]
macro_rules! diag {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[cfg(not(feature = "debug-output"))]
macro_rules! diag {
    ($($arg:tt)*) => {
        if false {
            log::info!($($arg)*)
        }
    };
}

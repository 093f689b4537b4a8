pub mod field;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Log a message every 600 frames (about ten seconds at 60 Hz) when the
/// `perf_stats` feature is enabled. Matches the report interval of `#[profile]`.
///
/// `$frame` is anything with a numeric `.0`, normally `Res<FrameCount>`.
/// Without the feature this expands to an empty block and the arguments are
/// never evaluated.
///
/// # Example
/// ```ignore
/// profile_log!(frame, "Stepped {} arrows", grid.len());
/// ```
#[macro_export]
#[cfg(feature = "perf_stats")]
macro_rules! profile_log {
    ($frame:expr, $($arg:tt)*) => {
        if $frame.0 % 600 == 0 {
            bevy::prelude::info!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "perf_stats"))]
macro_rules! profile_log {
    ($frame:expr, $($arg:tt)*) => {};
}

/// Logs an `info` event through `tracing`.
/// You can pass in the starting time and it will also log how long it took from starting time
/// to now.
/// ```
/// # use mushaf::info_time;
/// info_time!("str {}, {}", 1, 2);
/// let time = chrono::Local::now();
/// info_time!(time, "str {}, {}", 1, 2);
/// ```
#[macro_export]
macro_rules! info_time {
    ($strfm:literal $(,)? $($arg:expr),*) => {{
        ::tracing::info!("{}", format!($strfm, $($arg),*));
    }};
    ($time:expr, $strfm:literal $(,)? $($arg:expr),*) => {{
        let run_time = $crate::macros::elapsed_secs($time);
        ::tracing::info!(runtime_secs = run_time, "{}", format!($strfm, $($arg),*));
    }};
}

/// Seconds elapsed since `since`, with microsecond precision.
pub fn elapsed_secs(since: chrono::DateTime<chrono::Local>) -> f64 {
    (chrono::Local::now() - since)
        .num_microseconds()
        .map(|n| n as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}

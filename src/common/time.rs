//! Timestamp conversion for the wire format's 64-bit time values.
//!
//! The protocol carries absolute times as 100-nanosecond ticks since
//! 1601-01-01 and relative intervals as negative tick counts.

use chrono::{DateTime, Utc};

/// Ticks between 1601-01-01 and the Unix epoch.
const EPOCH_DELTA_TICKS: i64 = 116_444_736_000_000_000;

const TICKS_PER_SEC: i64 = 10_000_000;

/// Sentinel meaning "no expiry" / "never".
pub const TIME_NEVER: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// Render an absolute wire timestamp as a UTC string.
///
/// The 0 and `TIME_NEVER` sentinels render as `never`.
pub fn render_abs_time(ticks: u64) -> String {
    if ticks == 0 || ticks == TIME_NEVER {
        return "never".to_string();
    }
    let unix_ticks = ticks as i64 - EPOCH_DELTA_TICKS;
    let secs = unix_ticks.div_euclid(TICKS_PER_SEC);
    let nsecs = (unix_ticks.rem_euclid(TICKS_PER_SEC) * 100) as u32;
    match DateTime::<Utc>::from_timestamp(secs, nsecs) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("<out of range: 0x{:016x}>", ticks),
    }
}

/// Render a relative wire interval (negative tick count) in seconds.
pub fn render_rel_time(ticks: i64) -> String {
    if ticks == i64::MIN {
        return "none".to_string();
    }
    let secs = (-ticks) / TICKS_PER_SEC;
    format!("{} s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_render_as_never() {
        assert_eq!(render_abs_time(0), "never");
        assert_eq!(render_abs_time(TIME_NEVER), "never");
    }

    #[test]
    fn test_epoch_renders_1970() {
        let s = render_abs_time(EPOCH_DELTA_TICKS as u64);
        assert_eq!(s, "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_rel_time_seconds() {
        // -30 days in ticks
        let ticks = -(30i64 * 86400 * TICKS_PER_SEC);
        assert_eq!(render_rel_time(ticks), "2592000 s");
    }
}

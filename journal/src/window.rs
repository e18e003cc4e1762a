//! Candle interval and fetch window for a trade, from how long ago it closed
//! and how long it lasted. Fine intervals are only retained by the provider
//! for short look-backs, so old or long trades fall back to coarser bars.

use serde::Serialize;
use types::Interval;

pub const MINUTE: i64 = 60;
pub const HOUR: i64 = 60 * MINUTE;
pub const DAY: i64 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchWindow {
    pub interval: Interval,
    pub period_start: i64,
    pub period_end: i64,
}

impl FetchWindow {
    pub fn new(interval: Interval, period_start: i64, period_end: i64) -> Self {
        return Self {
            interval,
            period_start,
            period_end,
        };
    }
}

/// All arguments are Unix seconds; `exit >= entry` is the caller's concern.
pub fn select_window(entry: i64, exit: i64, now: i64) -> FetchWindow {
    let age = now - exit;
    let duration = exit - entry;

    let (interval, pre, post) = if age < 7 * DAY {
        if duration < 12 * HOUR {
            (Interval::OneMinute, 4 * HOUR, 4 * HOUR)
        } else {
            (Interval::FiveMinutes, 12 * HOUR, 4 * HOUR)
        }
    } else if age < 60 * DAY {
        if duration < 3 * DAY {
            (Interval::FiveMinutes, DAY, 12 * HOUR)
        } else if duration < 14 * DAY {
            (Interval::OneHour, 3 * DAY, DAY)
        } else {
            (Interval::OneDay, 10 * DAY, 5 * DAY)
        }
    } else {
        (Interval::OneDay, 14 * DAY, 7 * DAY)
    };

    return FetchWindow::new(interval, entry - pre, (exit + post).min(now));
}

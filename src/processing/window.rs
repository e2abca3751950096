// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/sensorhub

//! Closed time windows

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Closed interval `[start, end]`; `start <= end` always holds.
///
/// Bounds are kept at microsecond precision, the resolution timestamps are stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// `None` when `start` is after `end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then(|| Self {
            start: start.trunc_subsecs(6),
            end: end.trunc_subsecs(6),
        })
    }

    /// Window ending at `end` and reaching `length` back
    pub fn trailing(end: DateTime<Utc>, length: Duration) -> Self {
        let end = end.trunc_subsecs(6);
        let length = length.max(Duration::zero());
        Self { start: end - length, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whole minutes covered, rounded down
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_seconds() / 60
    }

    pub fn start_iso(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    pub fn end_iso(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(TimeWindow::new(t(12, 0, 0), t(11, 0, 0)).is_none());
        assert!(TimeWindow::new(t(12, 0, 0), t(12, 0, 0)).is_some());
    }

    #[test]
    fn test_duration_minutes_floors() {
        let window = TimeWindow::new(t(10, 0, 0), t(11, 30, 59)).unwrap();
        assert_eq!(window.duration_minutes(), 90);

        let short = TimeWindow::new(t(10, 0, 0), t(10, 0, 59)).unwrap();
        assert_eq!(short.duration_minutes(), 0);
    }

    #[test]
    fn test_trailing_window() {
        let window = TimeWindow::trailing(t(12, 0, 0), Duration::hours(1));
        assert_eq!(window.start(), t(11, 0, 0));
        assert_eq!(window.end(), t(12, 0, 0));
    }

    #[test]
    fn test_bounds_truncated_to_micros() {
        let start = t(10, 0, 0) + Duration::nanoseconds(123_456_789);
        let end = t(11, 0, 0) + Duration::nanoseconds(999);

        let window = TimeWindow::new(start, end).unwrap();
        assert_eq!(window.start(), t(10, 0, 0) + Duration::microseconds(123_456));
        assert_eq!(window.end(), t(11, 0, 0));
        assert_eq!(window.start_iso(), "2025-11-14T10:00:00.123456+00:00");

        let trailing = TimeWindow::trailing(end, Duration::hours(1));
        assert_eq!(trailing.start(), t(10, 0, 0));
        assert_eq!(trailing.end(), t(11, 0, 0));
    }

    #[test]
    fn test_sub_micro_inversion_rejected() {
        let start = t(10, 0, 0) + Duration::nanoseconds(500);
        let end = t(10, 0, 0) + Duration::nanoseconds(400);
        assert!(TimeWindow::new(start, end).is_none());
    }

    #[test]
    fn test_iso_formatting() {
        let window = TimeWindow::new(t(10, 0, 0), t(11, 30, 0)).unwrap();
        assert_eq!(window.start_iso(), "2025-11-14T10:00:00+00:00");
        assert_eq!(window.end_iso(), "2025-11-14T11:30:00+00:00");
    }
}

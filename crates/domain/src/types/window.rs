//! Time windows used for snapshot authority and range queries.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CalendarError;

/// Drop seconds and sub-second precision.
///
/// EWS only accepts minute resolution on writes, and reads are compared at the
/// same resolution.
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.with_second(0).and_then(|dt| dt.with_nanosecond(0)).unwrap_or(instant)
}

/// A closed `[start, end]` range, truncated to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, truncating both bounds to the minute.
    ///
    /// # Errors
    /// Returns [`CalendarError::InvalidWindow`] if `start > end` after
    /// truncation.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CalendarError> {
        let truncated_start = truncate_to_minute(start);
        let truncated_end = truncate_to_minute(end);

        if truncated_start > truncated_end {
            return Err(CalendarError::InvalidWindow { start, end });
        }

        Ok(Self { start: truncated_start, end: truncated_end })
    }

    /// Window spanning `lookback` before and `lookahead` after `now`.
    pub fn around(now: DateTime<Utc>, lookback: Duration, lookahead: Duration) -> Self {
        let start = truncate_to_minute(now - lookback);
        let end = truncate_to_minute(now + lookahead);
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `[start, end]` overlaps this window.
    ///
    /// Spans with positive length that merely touch a boundary (one ends
    /// exactly when the other starts) do not overlap, matching what EWS
    /// returns for a CalendarView. Zero-length spans or windows overlap when
    /// they touch.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start == end || self.start == self.end {
            start <= self.end && end >= self.start
        } else {
            start < self.end && end > self.start
        }
    }

    /// Inclusive containment of an instant.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// True if `other` lies entirely within this window.
    pub fn covers(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest window containing both.
    pub fn union(&self, other: &TimeWindow) -> TimeWindow {
        TimeWindow { start: self.start.min(other.start), end: self.end.max(other.end) }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Serialize, Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = CalendarError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        TimeWindow::new(raw.start, raw.end)
    }
}

impl From<TimeWindow> for RawWindow {
    fn from(window: TimeWindow) -> Self {
        RawWindow { start: window.start, end: window.end }
    }
}

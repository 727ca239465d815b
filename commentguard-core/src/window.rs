use chrono::{DateTime, Duration, TimeZone, Utc};

/// Trailing interval ending at the cycle's captured "now".
///
/// The cutoff is computed once, so every comment in a cycle is judged
/// against the same lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    reference_now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
}

impl LookbackWindow {
    pub fn new(reference_now: DateTime<Utc>, lookback_minutes: u32) -> Self {
        Self {
            reference_now,
            cutoff: reference_now - Duration::minutes(i64::from(lookback_minutes)),
        }
    }

    pub fn reference_now(&self) -> DateTime<Utc> {
        self.reference_now
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Inclusive lower bound. Timestamps in any offset are converted to UTC
    /// before comparing.
    pub fn contains<Tz: TimeZone>(&self, created_time: &DateTime<Tz>) -> bool {
        created_time.with_timezone(&Utc) >= self.cutoff
    }
}

pub fn is_within_window<Tz: TimeZone>(
    created_time: &DateTime<Tz>,
    reference_now: DateTime<Utc>,
    lookback_minutes: u32,
) -> bool {
    LookbackWindow::new(reference_now, lookback_minutes).contains(created_time)
}

use chrono::{DateTime, Duration, Utc};

/// Source of "now". Injected wherever an age is computed so tests can pin time
/// instead of sleeping.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Converts a Chrono `Duration` object into a human-readable string representation.
///
/// Picks the largest whole unit (days, hours, minutes); anything under a
/// minute is "0 minutes".
pub fn format_duration(duration: &Duration) -> String {
    if duration.num_days() > 0 {
        format!("{} days", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{} hours", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{} minutes", duration.num_minutes())
    } else {
        "0 minutes".to_string()
    }
}

/// Age of an epoch-millis timestamp relative to `clock`. Negative when the
/// timestamp lies in the future.
pub fn age_of(clock: &impl Clock, epoch_millis: i64) -> Duration {
    Duration::milliseconds(clock.now_millis() - epoch_millis)
}

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use std::sync::RwLock;

/// Source of the deployment's civil date and time-of-day
pub trait Clock: Send + Sync {
    /// Current wall-clock time in the deployment timezone
    fn now(&self) -> NaiveDateTime;

    /// Today's date and the time-of-day truncated to whole seconds
    fn today_and_time(&self) -> (NaiveDate, NaiveTime) {
        let now = self.now();
        let time = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
        (now.date(), time)
    }
}

/// System clock shifted to a fixed UTC offset (no DST)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_and_time_truncates_fraction() {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2025, 3, 10)
                .unwrap()
                .and_hms_milli_opt(7, 59, 59, 999)
                .unwrap(),
        );

        let (date, time) = clock.today_and_time();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(time, NaiveTime::from_hms_opt(7, 59, 59).unwrap());
    }

    #[test]
    fn test_manual_clock_set() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let clock = ManualClock::new(start);
        clock.set(start + chrono::Duration::hours(9));

        assert_eq!(clock.now().time(), NaiveTime::from_hms_opt(16, 0, 0).unwrap());
    }

    #[test]
    fn test_system_clock_applies_offset() {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let clock = SystemClock::new(offset);

        let utc = Utc::now().naive_utc();
        let diff = clock.now() - utc;
        // allow for the time between the two reads
        assert!((diff - chrono::Duration::hours(7)).num_seconds().abs() <= 1);
    }
}

/// Wall-clock access and chart label formatting
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of truncated wall-clock seconds
pub trait Clock: Send + Sync + 'static {
    fn now_seconds(&self) -> i64;
}

/// System clock, truncated to whole seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(seconds: i64) -> Self {
        ManualClock {
            seconds: Arc::new(AtomicI64::new(seconds)),
        }
    }

    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

fn local(seconds: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    Utc.timestamp_opt(seconds, 0).single().map(|t| t.with_timezone(tz))
}

/// Realtime axis label, `HH:MM:SS`
pub fn realtime_label(seconds: i64, tz: &Tz) -> String {
    local(seconds, tz)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| seconds.to_string())
}

/// History axis label, `MM-DD HH:MM:SS`
pub fn history_label(seconds: i64, tz: &Tz) -> String {
    local(seconds, tz)
        .map(|t| t.format("%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| seconds.to_string())
}

/// Unix seconds of local midnight starting `date`
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> Option<i64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Shanghai;

    #[test]
    fn test_realtime_label() {
        // 2024-03-01 00:00:05 UTC is 08:00:05 in Shanghai
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 5).unwrap().timestamp();
        assert_eq!(realtime_label(t, &Shanghai), "08:00:05");
        assert_eq!(history_label(t, &Shanghai), "03-01 08:00:05");
    }

    #[test]
    fn test_start_of_day_uses_timezone() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let start = start_of_day(date, &Shanghai).unwrap();
        let utc = Utc.with_ymd_and_hms(2024, 2, 29, 16, 0, 0).unwrap().timestamp();
        assert_eq!(start, utc);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_seconds(), 100);
        let shared = clock.clone();
        shared.set(50);
        assert_eq!(clock.now_seconds(), 50);
    }
}

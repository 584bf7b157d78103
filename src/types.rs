/// Core type definitions for the scaler dashboard
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// One per-second reading of a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Sample { timestamp, value }
    }
}

/// Longest realtime window a session will buffer (one day)
pub const MAX_WINDOW_SECS: u32 = 86_400;

/// Reject realtime window lengths outside `1..=MAX_WINDOW_SECS`
pub fn check_window_length(window_length: u32) -> Result<()> {
    if window_length == 0 || window_length > MAX_WINDOW_SECS {
        return Err(SyncError::Validation(format!(
            "Window length must be between 1 and {} seconds",
            MAX_WINDOW_SECS
        )));
    }
    Ok(())
}

/// Half-open range of wall-clock seconds `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: i64,
    pub end: i64,
}

impl Window {
    pub fn new(start: i64, end: i64) -> Self {
        Window { start, end }
    }

    /// Window of `length` seconds ending (exclusive) at `end`
    pub fn ending_at(end: i64, length: u32) -> Self {
        Window {
            start: end - i64::from(length),
            end,
        }
    }

    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }
}

/// Inclusive day range for history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range from raw user input, both bounds required and ordered
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = match start.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Err(SyncError::Validation("Please select the start date.".to_string())),
        };
        let end = match end.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Err(SyncError::Validation("Please select the end date.".to_string())),
        };

        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|e| SyncError::Validation(format!("Invalid start date '{}': {}", start, e)))?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
            .map_err(|e| SyncError::Validation(format!("Invalid end date '{}': {}", end, e)))?;

        if start > end {
            return Err(SyncError::Validation(
                "End date should be after start date.".to_string(),
            ));
        }

        Ok(DateRange { start, end })
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Dashboard mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    History,
    Realtime,
    Settings,
}

impl Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Mode::History => "history",
            Mode::Realtime => "realtime",
            Mode::Settings => "settings",
        }
    }
}

impl FromStr for Mode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "history" => Ok(Mode::History),
            "realtime" => Ok(Mode::Realtime),
            "settings" => Ok(Mode::Settings),
            other => Err(SyncError::Validation(format!("Unknown mode '{}'", other))),
        }
    }
}

/// Per-channel values returned by one fetch, aligned on a shared time axis
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelBatch {
    pub channels: Vec<Vec<f64>>,
}

impl ChannelBatch {
    pub fn new(channels: Vec<Vec<f64>>) -> Self {
        ChannelBatch { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel; channels are validated to be equal length
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Check the batch shape: expected channel count, equal lengths
    pub fn validate(&self, channel_count: usize) -> Result<()> {
        if self.channels.len() != channel_count {
            return Err(SyncError::data(format!(
                "expected {} channels, got {}",
                channel_count,
                self.channels.len()
            )));
        }
        let len = self.samples_per_channel();
        if let Some((idx, ch)) = self.channels.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(SyncError::data(format!(
                "channel {} has {} samples, channel 0 has {}",
                idx,
                ch.len(),
                len
            )));
        }
        Ok(())
    }

    /// Attach end-aligned timestamps for a batch answering `window`
    pub fn into_samples(self, window: Window) -> Result<Vec<Vec<Sample>>> {
        let n = self.samples_per_channel() as i64;
        if n > window.len() {
            return Err(SyncError::data(format!(
                "{} samples returned for a {} second window",
                n,
                window.len()
            )));
        }
        let first = window.end - n;
        Ok(self
            .channels
            .into_iter()
            .map(|values| {
                values
                    .into_iter()
                    .enumerate()
                    .map(|(k, value)| Sample::new(first + k as i64, value))
                    .collect()
            })
            .collect())
    }
}

/// Configuration for the dashboard client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Server
    pub base_url: String,
    pub request_timeout_sec: u64,

    // Channels
    pub channel_count: usize,

    // Realtime
    pub window_length_secs: u32,
    pub tick_interval_ms: u64,
    pub retry_delay_ms: u64,

    // Display
    pub timezone: String,
    pub value_display_lines: usize,

    // Logging
    pub log_level: String,
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:12308".to_string(),
            request_timeout_sec: 10,
            channel_count: 32,
            window_length_secs: 60,
            tick_interval_ms: 1000,
            retry_delay_ms: 100,
            timezone: "Asia/Shanghai".to_string(),
            value_display_lines: 8,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    pub fn retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_sec)
    }

    /// Timezone used for chart labels and history day boundaries
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| SyncError::Config(format!("Invalid timezone '{}': {}", self.timezone, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ending_at() {
        let w = Window::ending_at(1_000, 60);
        assert_eq!(w, Window::new(940, 1_000));
        assert_eq!(w.len(), 60);
    }

    #[test]
    fn test_date_range_requires_both_bounds() {
        let err = DateRange::parse(None, Some("2024-03-02")).unwrap_err();
        assert_eq!(err.status_message(), "Please select the start date.");

        let err = DateRange::parse(Some("2024-03-01"), Some("")).unwrap_err();
        assert_eq!(err.status_message(), "Please select the end date.");
    }

    #[test]
    fn test_date_range_ordering() {
        assert!(DateRange::parse(Some("2024-03-02"), Some("2024-03-01")).is_err());

        let same = DateRange::parse(Some("2024-03-01"), Some("2024-03-01")).unwrap();
        assert_eq!(same.days(), 1);

        let three = DateRange::parse(Some("2024-02-28"), Some("2024-03-01")).unwrap();
        assert_eq!(three.days(), 3);
    }

    #[test]
    fn test_batch_validation() {
        let ok = ChannelBatch::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(ok.validate(2).is_ok());
        assert!(ok.validate(3).is_err());

        let ragged = ChannelBatch::new(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(ragged.validate(2).is_err());
    }

    #[test]
    fn test_samples_are_end_aligned() {
        // server gap: 2 samples for a 3 second window land on the last 2 seconds
        let batch = ChannelBatch::new(vec![vec![7.0, 8.0]]);
        let samples = batch.into_samples(Window::new(100, 103)).unwrap();
        assert_eq!(samples[0], vec![Sample::new(101, 7.0), Sample::new(102, 8.0)]);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let batch = ChannelBatch::new(vec![vec![1.0, 2.0, 3.0]]);
        assert!(batch.into_samples(Window::new(100, 102)).is_err());
    }

    #[test]
    fn test_mode_round_trip_names() {
        for mode in [Mode::History, Mode::Realtime, Mode::Settings] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert!(matches!("chart".parse::<Mode>(), Err(SyncError::Validation(_))));
    }

    #[test]
    fn test_window_length_bounds() {
        assert!(check_window_length(1).is_ok());
        assert!(check_window_length(MAX_WINDOW_SECS).is_ok());
        assert!(matches!(check_window_length(0), Err(SyncError::Validation(_))));
        assert!(check_window_length(MAX_WINDOW_SECS + 1).is_err());
        assert!(check_window_length(u32::MAX).is_err());
    }
}

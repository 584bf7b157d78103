/// Renderer input built from buffer snapshots and history batches
use chrono_tz::Tz;
use serde::Serialize;

use crate::data::SeriesSnapshot;
use crate::error::{Result, SyncError};
use crate::settings::ChannelNames;
use crate::types::{ChannelBatch, DateRange};
use crate::utils::{history_label, realtime_label, start_of_day};

/// `(timeLabels, perChannelSeries, channelNames)` for one redraw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub time_labels: Vec<String>,
    pub series: Vec<Vec<f64>>,
    pub names: Vec<String>,
}

impl ChartFrame {
    /// Frame for the realtime chart
    pub fn realtime(snapshot: &SeriesSnapshot, names: &ChannelNames, tz: &Tz) -> Self {
        ChartFrame {
            time_labels: snapshot
                .timestamps()
                .into_iter()
                .map(|t| realtime_label(t, tz))
                .collect(),
            series: (0..snapshot.channel_count())
                .map(|c| snapshot.values(c))
                .collect(),
            names: names.as_slice().to_vec(),
        }
    }

    /// Frame for a history query; sample `i` is `i` seconds after local
    /// midnight of the first requested day
    pub fn history(range: &DateRange, batch: ChannelBatch, names: &ChannelNames, tz: &Tz) -> Result<Self> {
        let start = start_of_day(range.start, tz).ok_or_else(|| {
            SyncError::Validation(format!("{} has no midnight in {}", range.start, tz))
        })?;

        let samples = batch.samples_per_channel() as i64;
        Ok(ChartFrame {
            time_labels: (0..samples).map(|i| history_label(start + i, tz)).collect(),
            series: batch.channels,
            names: names.as_slice().to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.time_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_labels.is_empty()
    }

    /// Most recent value of every channel
    pub fn latest(&self) -> Vec<Option<f64>> {
        self.series.iter().map(|s| s.last().copied()).collect()
    }
}

/// Fixed-capacity per-channel sample buffers for the realtime window
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{Result, SyncError};
use crate::types::Sample;

/// Ring buffer of recent samples for every channel
///
/// Once full, each append evicts exactly one sample from the head, so the
/// length of a steady-state channel always equals the window length.
pub struct SeriesBuffer {
    channels: Vec<VecDeque<Sample>>,
    capacity: usize,
}

/// Immutable copy of the buffer contents handed to renderers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesSnapshot {
    pub channels: Vec<Vec<Sample>>,
}

impl SeriesSnapshot {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Timestamps of the shared time axis (taken from channel 0)
    pub fn timestamps(&self) -> Vec<i64> {
        self.channels
            .first()
            .map(|ch| ch.iter().map(|s| s.timestamp).collect())
            .unwrap_or_default()
    }

    /// Values of one channel in arrival order
    pub fn values(&self, channel: usize) -> Vec<f64> {
        self.channels
            .get(channel)
            .map(|ch| ch.iter().map(|s| s.value).collect())
            .unwrap_or_default()
    }

    /// Most recent value of every channel, `None` for an empty channel
    pub fn latest(&self) -> Vec<Option<f64>> {
        self.channels
            .iter()
            .map(|ch| ch.last().map(|s| s.value))
            .collect()
    }
}

impl SeriesBuffer {
    pub fn new(channel_count: usize, capacity: usize) -> Self {
        SeriesBuffer {
            channels: (0..channel_count)
                .map(|_| VecDeque::new())
                .collect(),
            capacity,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of one channel, 0 for an unknown channel
    pub fn len(&self, channel: usize) -> usize {
        self.channels.get(channel).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(VecDeque::is_empty)
    }

    /// Last timestamp of a channel
    pub fn last_timestamp(&self, channel: usize) -> Option<i64> {
        self.channels.get(channel)?.back().map(|s| s.timestamp)
    }

    /// Add one sample to the tail of a channel
    pub fn append(&mut self, channel: usize, sample: Sample) -> Result<()> {
        let capacity = self.capacity;
        let buffer = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| SyncError::data(format!("unknown channel {}", channel)))?;

        if let Some(last) = buffer.back() {
            if sample.timestamp <= last.timestamp {
                return Err(SyncError::data(format!(
                    "channel {}: sample at {} is not after {}",
                    channel, sample.timestamp, last.timestamp
                )));
            }
        }

        if buffer.len() >= capacity {
            buffer.pop_front();
        }
        buffer.push_back(sample);
        Ok(())
    }

    /// Apply one cycle's samples to every channel, or to none
    pub fn apply(&mut self, batch: Vec<Vec<Sample>>) -> Result<usize> {
        self.check_batch(&batch)?;

        let per_channel = batch.first().map(Vec::len).unwrap_or(0);
        for (channel, samples) in batch.into_iter().enumerate() {
            for sample in samples {
                self.append(channel, sample)?;
            }
        }
        Ok(per_channel)
    }

    /// Replace every channel with a new capacity and seed data
    pub fn initialize(&mut self, capacity: usize, seed: Vec<Vec<Sample>>) -> Result<()> {
        if seed.len() != self.channels.len() {
            return Err(SyncError::data(format!(
                "seed has {} channels, buffer has {}",
                seed.len(),
                self.channels.len()
            )));
        }
        for (channel, samples) in seed.iter().enumerate() {
            if !is_strictly_increasing(samples) {
                return Err(SyncError::data(format!(
                    "channel {}: seed timestamps are not increasing",
                    channel
                )));
            }
        }

        self.capacity = capacity;
        self.channels = seed
            .into_iter()
            .map(|samples| {
                let skip = samples.len().saturating_sub(capacity);
                samples.into_iter().skip(skip).collect::<VecDeque<_>>()
            })
            .collect();
        Ok(())
    }

    /// Copy the current contents out for rendering
    pub fn snapshot(&self) -> Arc<SeriesSnapshot> {
        Arc::new(SeriesSnapshot {
            channels: self
                .channels
                .iter()
                .map(|ch| ch.iter().copied().collect())
                .collect(),
        })
    }

    fn check_batch(&self, batch: &[Vec<Sample>]) -> Result<()> {
        if batch.len() != self.channels.len() {
            return Err(SyncError::data(format!(
                "batch has {} channels, buffer has {}",
                batch.len(),
                self.channels.len()
            )));
        }
        let len = batch.first().map(Vec::len).unwrap_or(0);
        for (channel, samples) in batch.iter().enumerate() {
            if samples.len() != len {
                return Err(SyncError::data(format!(
                    "channel {} has {} samples, channel 0 has {}",
                    channel,
                    samples.len(),
                    len
                )));
            }
            if !is_strictly_increasing(samples) {
                return Err(SyncError::data(format!(
                    "channel {}: batch timestamps are not increasing",
                    channel
                )));
            }
            if let (Some(first), Some(last)) = (samples.first(), self.last_timestamp(channel)) {
                if first.timestamp <= last {
                    return Err(SyncError::data(format!(
                        "channel {}: sample at {} overlaps buffered data up to {}",
                        channel, first.timestamp, last
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_strictly_increasing(samples: &[Sample]) -> bool {
    samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

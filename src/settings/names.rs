/// Channel display names
use tracing::warn;

use crate::error::SyncError;
use crate::sync::ScalerSource;

/// Display name of every channel, indexed by channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames(Vec<String>);

impl ChannelNames {
    /// Deterministic fallback: the stringified channel index
    pub fn defaults(channel_count: usize) -> Self {
        ChannelNames((0..channel_count).map(|i| i.to_string()).collect())
    }

    /// Fit server names to the configured channel count
    pub fn from_server(names: Vec<String>, channel_count: usize) -> Self {
        let mut fitted: Vec<String> = names.into_iter().take(channel_count).collect();
        let have = fitted.len();
        fitted.extend((have..channel_count).map(|i| i.to_string()));
        ChannelNames(fitted)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, channel: usize) -> Option<&str> {
        self.0.get(channel).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Best-effort lookup; never blocks data sync on a settings failure
///
/// Returns the error alongside the fallback names so callers can show it.
pub async fn resolve_names<S: ScalerSource + ?Sized>(
    source: &S,
    channel_count: usize,
) -> (ChannelNames, Option<SyncError>) {
    match source.get_channel_names().await {
        Ok(names) => {
            if names.len() != channel_count {
                warn!(
                    "Server returned {} names for {} channels",
                    names.len(),
                    channel_count
                );
            }
            (ChannelNames::from_server(names, channel_count), None)
        }
        Err(e) => {
            warn!("Falling back to default channel names: {} ({})", e, e.error_code());
            (ChannelNames::defaults(channel_count), Some(e))
        }
    }
}

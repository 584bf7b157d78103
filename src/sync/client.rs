/// HTTP client for the scaler data server
use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SyncError, STATUS_PENDING};
use crate::types::{ChannelBatch, Config, DateRange, Window};

const STATUS_OK: i64 = 0;

/// Anything that can answer realtime, history and settings requests
///
/// The scheduler only talks to this trait, so tests can swap the HTTP
/// client for an in-memory source.
pub trait ScalerSource: Send + Sync + 'static {
    /// Fetch per-second values for `[window.start, window.end)`
    fn fetch_window(&self, window: Window) -> BoxFuture<'_, Result<ChannelBatch>>;

    /// Fetch whole days of values
    fn fetch_history(&self, range: DateRange) -> BoxFuture<'_, Result<ChannelBatch>>;

    fn get_channel_names(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    fn set_channel_names(&self, names: Vec<String>) -> BoxFuture<'_, Result<()>>;
}

#[derive(Debug, Serialize)]
struct RealtimeRequest {
    start: i64,
    end: i64,
}

#[derive(Debug, Serialize)]
struct HistoryRequest {
    start: String,
    end: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "request", rename_all = "kebab-case")]
enum SettingsRequest {
    GetScalerNames,
    SetScalerNames { names: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct ScalerResponse {
    status: i64,
    #[serde(default)]
    scalers: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettingsResponse {
    status: i64,
    #[serde(default)]
    names: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
}

/// Scaler server REST client
pub struct ScalerClient {
    client: Client,
    base_url: String,
    channel_count: usize,
}

impl ScalerClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ScalerClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            channel_count: config.channel_count,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and return the raw response text
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let response = self.client
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!("{} response status: {}, {} bytes", path, status, body.len());

        if status != StatusCode::OK {
            return Err(SyncError::Transport(format!(
                "{} returned HTTP {}",
                path, status
            )));
        }

        Ok(body)
    }

    /// Fetch one realtime window
    pub async fn realtime(&self, window: Window) -> Result<ChannelBatch> {
        let request = RealtimeRequest {
            start: window.start,
            end: window.end,
        };
        debug!("Fetching realtime window: {:?}", request);

        let body = self.post("/realtime", &request).await?;
        let response: ScalerResponse = serde_json::from_str(&body)?;
        interpret_scalers(response, self.channel_count)
    }

    /// Fetch whole days of history
    pub async fn history(&self, range: DateRange) -> Result<ChannelBatch> {
        let request = HistoryRequest {
            start: range.start.format("%Y-%m-%d").to_string(),
            end: range.end.format("%Y-%m-%d").to_string(),
        };
        info!("Fetching history {} .. {}", request.start, request.end);

        let body = self.post("/history", &request).await?;
        let response: ScalerResponse = serde_json::from_str(&body)?;
        let batch = interpret_scalers(response, self.channel_count)?;

        debug!("History data size {}", batch.samples_per_channel());
        Ok(batch)
    }

    /// Get channel display names stored on the server
    pub async fn names(&self) -> Result<Vec<String>> {
        let body = self.post("/settings", &SettingsRequest::GetScalerNames).await?;
        let response: SettingsResponse = serde_json::from_str(&body)?;

        if response.status != STATUS_OK {
            return Err(SyncError::Data {
                status: response.status,
                message: response
                    .message
                    .unwrap_or_else(|| "Get scaler names from server failed".to_string()),
            });
        }

        response
            .names
            .ok_or_else(|| SyncError::data("No names in settings response"))
    }

    /// Store channel display names on the server
    pub async fn save_names(&self, names: Vec<String>) -> Result<()> {
        let request = SettingsRequest::SetScalerNames { names };
        let body = self.post("/settings", &request).await?;
        let response: SettingsResponse = serde_json::from_str(&body)?;

        if response.status != STATUS_OK {
            return Err(SyncError::Data {
                status: response.status,
                message: response
                    .message
                    .unwrap_or_else(|| "Set scaler names failed".to_string()),
            });
        }

        info!("Channel names saved");
        Ok(())
    }
}

impl ScalerSource for ScalerClient {
    fn fetch_window(&self, window: Window) -> BoxFuture<'_, Result<ChannelBatch>> {
        Box::pin(self.realtime(window))
    }

    fn fetch_history(&self, range: DateRange) -> BoxFuture<'_, Result<ChannelBatch>> {
        Box::pin(self.history(range))
    }

    fn get_channel_names(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(self.names())
    }

    fn set_channel_names(&self, names: Vec<String>) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.save_names(names))
    }
}

/// Map the response envelope onto a batch, a pending signal, or a failure
fn interpret_scalers(response: ScalerResponse, channel_count: usize) -> Result<ChannelBatch> {
    match response.status {
        STATUS_OK => {
            let scalers = response
                .scalers
                .ok_or_else(|| SyncError::data("No scalers in response"))?;
            let batch = ChannelBatch::new(scalers);
            batch.validate(channel_count)?;
            Ok(batch)
        }
        STATUS_PENDING => Err(SyncError::Pending),
        status => Err(SyncError::Data {
            status,
            message: response
                .message
                .unwrap_or_else(|| "Server can't find this event".to_string()),
        }),
    }
}

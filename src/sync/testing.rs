/// In-memory scaler source for tests
use std::collections::VecDeque;
use std::sync::Mutex;

use futures_util::future::BoxFuture;

use crate::error::{Result, SyncError};
use crate::sync::client::ScalerSource;
use crate::sync::session::Liveness;
use crate::types::{ChannelBatch, DateRange, Window};

/// Scripted answer for the next realtime request
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Success with this many samples per channel
    Samples(usize),
    Pending,
    Status(i64),
    Transport,
}

/// Answers with a full window unless a reply is scripted
///
/// Values equal the (end-aligned) timestamp plus the channel index, so
/// tests can check ordering from the values alone.
pub(crate) struct ScriptedSource {
    channels: usize,
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Window>>,
    history_requests: Mutex<Vec<DateRange>>,
    close_on_fetch: Mutex<Option<Liveness>>,
    names: Mutex<Option<Vec<String>>>,
    saved: Mutex<Vec<Vec<String>>>,
    history_samples: usize,
}

impl ScriptedSource {
    pub(crate) fn new(channels: usize) -> Self {
        ScriptedSource {
            channels,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            history_requests: Mutex::new(Vec::new()),
            close_on_fetch: Mutex::new(None),
            names: Mutex::new(None),
            saved: Mutex::new(Vec::new()),
            history_samples: 5,
        }
    }

    pub(crate) fn with_names(self, names: Vec<&str>) -> Self {
        *self.names.lock().unwrap() = Some(names.into_iter().map(str::to_string).collect());
        self
    }

    pub(crate) fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub(crate) fn requests(&self) -> Vec<Window> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn history_requests(&self) -> Vec<DateRange> {
        self.history_requests.lock().unwrap().clone()
    }

    pub(crate) fn saved_names(&self) -> Vec<Vec<String>> {
        self.saved.lock().unwrap().clone()
    }

    /// Close a session while its next request is in flight
    pub(crate) fn close_on_next_fetch(&self, liveness: Liveness) {
        *self.close_on_fetch.lock().unwrap() = Some(liveness);
    }

    fn batch(&self, window: Window, samples: usize) -> ChannelBatch {
        let first = window.end - samples as i64;
        ChannelBatch::new(
            (0..self.channels)
                .map(|c| (0..samples).map(|k| (first + k as i64 + c as i64) as f64).collect())
                .collect(),
        )
    }

    fn answer(&self, window: Window) -> Result<ChannelBatch> {
        self.requests.lock().unwrap().push(window);
        if let Some(liveness) = self.close_on_fetch.lock().unwrap().take() {
            liveness.close();
        }

        let reply = self.script.lock().unwrap().pop_front();
        match reply {
            None => Ok(self.batch(window, window.len().max(0) as usize)),
            Some(Reply::Samples(n)) => Ok(self.batch(window, n)),
            Some(Reply::Pending) => Err(SyncError::Pending),
            Some(Reply::Status(status)) => Err(SyncError::Data {
                status,
                message: "scripted failure".to_string(),
            }),
            Some(Reply::Transport) => Err(SyncError::Transport("scripted outage".to_string())),
        }
    }
}

impl ScalerSource for ScriptedSource {
    fn fetch_window(&self, window: Window) -> BoxFuture<'_, Result<ChannelBatch>> {
        let result = self.answer(window);
        Box::pin(async move { result })
    }

    fn fetch_history(&self, range: DateRange) -> BoxFuture<'_, Result<ChannelBatch>> {
        self.history_requests.lock().unwrap().push(range);
        let batch = self.batch(Window::new(0, self.history_samples as i64), self.history_samples);
        Box::pin(async move { Ok(batch) })
    }

    fn get_channel_names(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        let names = self.names.lock().unwrap().clone();
        Box::pin(async move {
            names.ok_or_else(|| SyncError::Transport("settings unavailable".to_string()))
        })
    }

    fn set_channel_names(&self, names: Vec<String>) -> BoxFuture<'_, Result<()>> {
        self.saved.lock().unwrap().push(names.clone());
        *self.names.lock().unwrap() = Some(names);
        Box::pin(async { Ok(()) })
    }
}

/// Realtime session: buffers and sync state for one activation of realtime mode
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::data::{SeriesBuffer, SeriesSnapshot};
use crate::error::{Result, SyncError};
use crate::sync::client::ScalerSource;
use crate::sync::reconciler::{clamp_backlog, Reconciled, SyncState};
use crate::types::{check_window_length, Window};

/// Shared liveness flag of a session
///
/// The scheduler keeps a clone so it can close the session while a cycle is
/// in flight; the cycle checks the flag before touching the buffers.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<watch::Sender<bool>>);

impl Liveness {
    pub fn new() -> Self {
        Liveness(Arc::new(watch::Sender::new(true)))
    }

    pub fn is_live(&self) -> bool {
        *self.0.borrow()
    }

    pub fn close(&self) {
        self.0.send_replace(false);
    }

    /// Resolves once the session has been closed
    pub async fn closed(&self) {
        let mut rx = self.0.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one scheduler tick
#[derive(Debug)]
pub enum CycleOutcome {
    /// Samples applied to every channel
    Applied { window: Window, samples: usize },
    /// Tick fired before a full second elapsed; nothing requested
    Drift { expected: i64, now: i64 },
    /// Server has no data for the window yet; buffers untouched
    Pending { window: Window },
    /// Hard failure for this cycle; buffers untouched
    Failed { window: Window, error: SyncError },
    /// Session was disposed, possibly while the request was in flight
    Closed,
}

pub struct RealtimeSession {
    id: Uuid,
    window_length: u32,
    state: SyncState,
    buffer: SeriesBuffer,
    liveness: Liveness,
}

impl RealtimeSession {
    /// Bootstrap a session with one fetch covering the whole window
    pub async fn create<S: ScalerSource + ?Sized>(
        source: &S,
        now: i64,
        window_length: u32,
        channel_count: usize,
    ) -> Result<Self> {
        check_window_length(window_length)?;
        let window = Window::ending_at(now, window_length);
        debug!("Bootstrapping realtime window {:?}", window);

        let batch = source.fetch_window(window).await?;
        batch.validate(channel_count)?;
        let seed = batch.into_samples(window)?;

        let mut buffer = SeriesBuffer::new(channel_count, window_length as usize);
        buffer.initialize(window_length as usize, seed)?;

        let session = RealtimeSession {
            id: Uuid::new_v4(),
            window_length,
            state: SyncState::new(now),
            buffer,
            liveness: Liveness::new(),
        };

        info!(
            "Realtime session {} started: {}s window, {} samples per channel",
            session.id,
            window_length,
            session.buffer.len(0)
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn window_length(&self) -> u32 {
        self.window_length
    }

    pub fn expected(&self) -> i64 {
        self.state.expected()
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn is_live(&self) -> bool {
        self.liveness.is_live()
    }

    /// Samples currently buffered for one channel
    pub fn buffered(&self, channel: usize) -> usize {
        self.buffer.len(channel)
    }

    pub fn snapshot(&self) -> Arc<SeriesSnapshot> {
        self.buffer.snapshot()
    }

    /// Run one cycle: reconcile, fetch, apply or report
    pub async fn tick<S: ScalerSource + ?Sized>(&mut self, source: &S, now: i64) -> CycleOutcome {
        if !self.is_live() {
            return CycleOutcome::Closed;
        }

        let window = match self.state.next_window(now) {
            Reconciled::Drift { expected, now } => {
                debug!("Drift: now {} expected {}", now, expected);
                return CycleOutcome::Drift { expected, now };
            }
            Reconciled::Fetch(window) => clamp_backlog(window, self.window_length),
        };

        let fetched = source.fetch_window(window).await;

        if !self.is_live() {
            debug!("Session {} closed during fetch, dropping response", self.id);
            return CycleOutcome::Closed;
        }

        let applied = fetched
            .and_then(|batch| batch.into_samples(window))
            .and_then(|samples| self.buffer.apply(samples));

        match applied {
            Ok(samples) => {
                self.state.commit(window);
                CycleOutcome::Applied { window, samples }
            }
            Err(SyncError::Pending) => CycleOutcome::Pending { window },
            Err(error) => CycleOutcome::Failed { window, error },
        }
    }

    /// Close the session; later ticks and in-flight responses become no-ops
    pub fn dispose(&mut self) {
        if self.is_live() {
            self.liveness.close();
            info!("Realtime session {} disposed", self.id);
        }
    }
}

/// Poll scheduler - drives one realtime cycle per tick
///
/// States: `Idle -> Active -> (Suspended <-> Active) -> Idle`. One session
/// task at a time; a new start disposes the previous session first.
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::data::SeriesSnapshot;
use crate::error::Result;
use crate::events::{StatusBus, StatusEvent, StatusPayload, SuspendReason};
use crate::sync::client::ScalerSource;
use crate::sync::session::{CycleOutcome, Liveness, RealtimeSession};
use crate::types::{Config, Window};
use crate::utils::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Idle,
    Active,
    Suspended,
}

impl SchedulerState {
    pub fn as_str(&self) -> &str {
        match self {
            SchedulerState::Idle => "IDLE",
            SchedulerState::Active => "ACTIVE",
            SchedulerState::Suspended => "SUSPENDED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub channel_count: usize,
    pub tick_interval: Duration,
    pub retry_delay: Duration,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        SchedulerSettings {
            channel_count: config.channel_count,
            tick_interval: config.tick_interval(),
            retry_delay: config.retry_delay(),
        }
    }
}

pub type FrameReceiver = watch::Receiver<Option<Arc<SeriesSnapshot>>>;

/// The single timer slot of a session; replacing it cancels the old timer
enum Timer {
    Periodic(Interval),
    OneShot(Pin<Box<Sleep>>),
}

impl Timer {
    fn periodic(period: Duration) -> Self {
        // first tick one period from now, like a freshly armed interval
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Timer::Periodic(interval)
    }

    fn one_shot(delay: Duration) -> Self {
        Timer::OneShot(Box::pin(tokio::time::sleep(delay)))
    }

    fn is_one_shot(&self) -> bool {
        matches!(self, Timer::OneShot(_))
    }

    async fn wait(&mut self) {
        match self {
            Timer::Periodic(interval) => {
                interval.tick().await;
            }
            Timer::OneShot(sleep) => sleep.as_mut().await,
        }
    }
}

struct RunningSession {
    id: Uuid,
    liveness: Liveness,
    task: JoinHandle<()>,
}

pub struct PollScheduler<S: ScalerSource, C: Clock + Clone> {
    source: Arc<S>,
    clock: C,
    settings: SchedulerSettings,
    bus: StatusBus,
    state: Arc<watch::Sender<SchedulerState>>,
    frames: Arc<watch::Sender<Option<Arc<SeriesSnapshot>>>>,
    running: Option<RunningSession>,
}

impl<S: ScalerSource, C: Clock + Clone> PollScheduler<S, C> {
    pub fn new(source: Arc<S>, clock: C, settings: SchedulerSettings, bus: StatusBus) -> Self {
        PollScheduler {
            source,
            clock,
            settings,
            bus,
            state: Arc::new(watch::Sender::new(SchedulerState::Idle)),
            frames: Arc::new(watch::Sender::new(None)),
            running: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Snapshots published after bootstrap and after every applied cycle
    pub fn subscribe_frames(&self) -> FrameReceiver {
        self.frames.subscribe()
    }

    pub fn latest_frame(&self) -> Option<Arc<SeriesSnapshot>> {
        self.frames.borrow().clone()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.running.as_ref().map(|r| r.id)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Enter realtime mode: bootstrap, then arm the periodic tick
    ///
    /// Pending bootstrap responses are retried after the retry delay; any
    /// other failure is returned and the scheduler stays idle.
    pub async fn start(&mut self, window_length: u32) -> Result<Uuid> {
        self.stop();

        let session = loop {
            let now = self.clock.now_seconds();
            match RealtimeSession::create(
                self.source.as_ref(),
                now,
                window_length,
                self.settings.channel_count,
            )
            .await
            {
                Ok(session) => break session,
                Err(e) if e.is_pending() => {
                    debug!("Bootstrap pending, retrying in {:?}", self.settings.retry_delay);
                    self.bus.publish(StatusEvent::new(
                        None,
                        StatusPayload::BootstrapPending {
                            window: Window::ending_at(now, window_length),
                        },
                    ));
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    warn!("Bootstrap failed: {} ({})", e, e.error_code());
                    self.bus.publish(StatusEvent::new(
                        None,
                        StatusPayload::CycleFailed {
                            window: Some(Window::ending_at(now, window_length)),
                            code: e.error_code().to_string(),
                            message: e.status_message(),
                        },
                    ));
                    return Err(e);
                }
            }
        };

        let id = session.id();
        let liveness = session.liveness();
        let snapshot = session.snapshot();
        let samples = snapshot.channels.first().map(Vec::len).unwrap_or(0);

        self.frames.send_replace(Some(snapshot));
        self.state.send_replace(SchedulerState::Active);
        self.bus.publish(StatusEvent::new(
            Some(id),
            StatusPayload::SessionStarted {
                window: Window::ending_at(session.expected(), window_length),
                samples,
            },
        ));

        let session_loop = SessionLoop {
            session,
            source: Arc::clone(&self.source),
            clock: self.clock.clone(),
            settings: self.settings.clone(),
            bus: self.bus.clone(),
            state: Arc::clone(&self.state),
            frames: Arc::clone(&self.frames),
        };
        let task = tokio::spawn(session_loop.run());

        self.running = Some(RunningSession { id, liveness, task });
        Ok(id)
    }

    /// Leave realtime mode; cancels timers and in-flight cycles
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.liveness.close();
            running.task.abort();
            self.state.send_replace(SchedulerState::Idle);
            self.bus.publish(StatusEvent::new(Some(running.id), StatusPayload::SessionStopped));
            info!("Realtime session {} stopped", running.id);
        }
    }
}

impl<S: ScalerSource, C: Clock + Clone> Drop for PollScheduler<S, C> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.liveness.close();
            running.task.abort();
        }
    }
}

/// Owned state of the polling task
struct SessionLoop<S: ScalerSource, C: Clock> {
    session: RealtimeSession,
    source: Arc<S>,
    clock: C,
    settings: SchedulerSettings,
    bus: StatusBus,
    state: Arc<watch::Sender<SchedulerState>>,
    frames: Arc<watch::Sender<Option<Arc<SeriesSnapshot>>>>,
}

impl<S: ScalerSource, C: Clock> SessionLoop<S, C> {
    async fn run(mut self) {
        let liveness = self.session.liveness();
        let id = Some(self.session.id());
        let mut timer = Timer::periodic(self.settings.tick_interval);

        loop {
            tokio::select! {
                _ = liveness.closed() => break,
                _ = timer.wait() => {}
            }

            if timer.is_one_shot() {
                timer = Timer::periodic(self.settings.tick_interval);
                self.set_state(SchedulerState::Active);
                self.bus.publish(StatusEvent::new(id, StatusPayload::Resumed));
            }

            let now = self.clock.now_seconds();
            match self.session.tick(self.source.as_ref(), now).await {
                CycleOutcome::Applied { window, samples } => {
                    self.publish_frame();
                    self.bus.publish(StatusEvent::new(
                        id,
                        StatusPayload::CycleApplied { window, samples },
                    ));
                }
                CycleOutcome::Drift { .. } => {
                    timer = self.suspend(SuspendReason::Drift);
                }
                CycleOutcome::Pending { .. } => {
                    timer = self.suspend(SuspendReason::Pending);
                }
                CycleOutcome::Failed { window, error } => {
                    if error.is_recoverable() {
                        debug!("Cycle {:?} failed, retrying on next tick: {}", window, error);
                    } else {
                        warn!("Cycle {:?} failed: {} ({})", window, error, error.error_code());
                    }
                    self.bus.publish(StatusEvent::new(
                        id,
                        StatusPayload::CycleFailed {
                            window: Some(window),
                            code: error.error_code().to_string(),
                            message: error.status_message(),
                        },
                    ));
                }
                CycleOutcome::Closed => break,
            }
        }

        self.session.dispose();
        debug!("Session loop {} exited", self.session.id());
    }

    fn suspend(&self, reason: SuspendReason) -> Timer {
        self.set_state(SchedulerState::Suspended);
        self.bus.publish(StatusEvent::new(
            Some(self.session.id()),
            StatusPayload::Suspended {
                reason,
                delay_ms: self.settings.retry_delay.as_millis() as u64,
            },
        ));
        Timer::one_shot(self.settings.retry_delay)
    }

    // Liveness is read while the channel lock is held. `stop` closes the
    // session before it takes the lock, so a stopped session can never
    // overwrite what `stop` or the next session publishes.
    fn set_state(&self, state: SchedulerState) {
        self.state.send_if_modified(|current| {
            if !self.session.is_live() || *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn publish_frame(&self) {
        let snapshot = self.session.snapshot();
        self.frames.send_if_modified(|frame| {
            if !self.session.is_live() {
                return false;
            }
            *frame = Some(snapshot);
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::sync::testing::{Reply, ScriptedSource};
    use crate::utils::ManualClock;
    use tokio::sync::mpsc;

    const CHANNELS: usize = 2;

    /// Wall clock that follows tokio's (paused) clock
    #[derive(Clone)]
    struct TokioClock {
        base: i64,
        origin: Instant,
    }

    impl Clock for TokioClock {
        fn now_seconds(&self) -> i64 {
            self.base + self.origin.elapsed().as_secs() as i64
        }
    }

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            channel_count: CHANNELS,
            tick_interval: Duration::from_millis(1000),
            retry_delay: Duration::from_millis(100),
        }
    }

    fn scheduler<C: Clock + Clone>(
        source: Arc<ScriptedSource>,
        clock: C,
    ) -> (PollScheduler<ScriptedSource, C>, mpsc::UnboundedReceiver<StatusEvent>) {
        let (bus, rx) = StatusBus::channel();
        (PollScheduler::new(source, clock, settings(), bus), rx)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_bootstrap_retries_without_ticking() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        source.push(Reply::Pending);
        source.push(Reply::Pending);
        let clock = TokioClock { base: 1_000, origin: Instant::now() };
        let (mut scheduler, _rx) = scheduler(Arc::clone(&source), clock);

        let started = Instant::now();
        scheduler.start(60).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_millis(200));
        assert_eq!(source.requests(), vec![Window::new(940, 1_000); 3]);
        assert_eq!(scheduler.state(), SchedulerState::Active);
        assert_eq!(scheduler.latest_frame().unwrap().channels[0].len(), 60);

        // first periodic tick one period after bootstrap
        sleep_ms(1_050).await;
        assert_eq!(source.requests().len(), 4);
        assert_eq!(source.requests()[3], Window::new(1_000, 1_001));

        sleep_ms(1_000).await;
        assert_eq!(source.requests()[4], Window::new(1_001, 1_002));
        assert_eq!(scheduler.latest_frame().unwrap().channels[0].len(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_window_is_rejected_before_any_request() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        let clock = ManualClock::new(1_000);
        let (mut scheduler, _rx) = scheduler(Arc::clone(&source), clock.clone());

        let err = scheduler.start(0).await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        clock.set(1_001);
        sleep_ms(1_050).await;
        assert!(source.requests().is_empty());
        assert!(scheduler.latest_frame().is_none());
    }

    #[tokio::test]
    async fn test_stopped_session_publishes_nothing() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        let session = RealtimeSession::create(source.as_ref(), 1_000, 10, CHANNELS).await.unwrap();
        let (bus, _rx) = StatusBus::channel();
        let state = Arc::new(watch::Sender::new(SchedulerState::Idle));
        let frames = Arc::new(watch::Sender::new(None));
        let mut session_loop = SessionLoop {
            session,
            source,
            clock: ManualClock::new(1_000),
            settings: settings(),
            bus,
            state: Arc::clone(&state),
            frames: Arc::clone(&frames),
        };

        session_loop.set_state(SchedulerState::Active);
        session_loop.publish_frame();
        assert_eq!(*state.borrow(), SchedulerState::Active);
        assert!(frames.borrow().is_some());

        // what stop() does, then a late cycle of the old session
        session_loop.session.dispose();
        state.send_replace(SchedulerState::Idle);
        frames.send_replace(None);
        session_loop.set_state(SchedulerState::Suspended);
        session_loop.publish_frame();

        assert_eq!(*state.borrow(), SchedulerState::Idle);
        assert!(frames.borrow().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_failure_stays_idle() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        source.push(Reply::Status(1));
        let (mut scheduler, _rx) = scheduler(Arc::clone(&source), ManualClock::new(1_000));

        let err = scheduler.start(60).await.unwrap_err();
        assert!(matches!(err, SyncError::Data { status: 1, .. }));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.is_running());

        sleep_ms(3_000).await;
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drift_suspends_for_retry_delay() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        let clock = ManualClock::new(1_000);
        let (mut scheduler, _rx) = scheduler(Arc::clone(&source), clock.clone());
        scheduler.start(60).await.unwrap();

        // tick at 1000ms sees the same wall-clock second
        sleep_ms(1_050).await;
        assert_eq!(scheduler.state(), SchedulerState::Suspended);
        assert_eq!(source.requests().len(), 1);

        // one-shot fires at 1100ms, now a full second has elapsed
        clock.set(1_001);
        sleep_ms(100).await;
        assert_eq!(scheduler.state(), SchedulerState::Active);
        assert_eq!(source.requests().len(), 2);
        assert_eq!(source.requests()[1], Window::new(1_000, 1_001));

        // periodic tick re-armed from the resume point, no re-bootstrap
        clock.set(1_002);
        sleep_ms(900).await;
        assert_eq!(source.requests().len(), 2);
        sleep_ms(100).await;
        assert_eq!(source.requests().len(), 3);
        assert_eq!(source.requests()[2], Window::new(1_001, 1_002));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_mid_stream_suspends_and_failure_does_not() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        let clock = TokioClock { base: 1_000, origin: Instant::now() };
        let (mut scheduler, mut rx) = scheduler(Arc::clone(&source), clock);
        scheduler.start(60).await.unwrap();

        source.push(Reply::Pending);
        sleep_ms(1_050).await;
        assert_eq!(scheduler.state(), SchedulerState::Suspended);

        // retried after 100ms with the same start
        sleep_ms(100).await;
        assert_eq!(scheduler.state(), SchedulerState::Active);
        assert_eq!(source.requests()[1], Window::new(1_000, 1_001));
        assert_eq!(source.requests()[2], Window::new(1_000, 1_001));

        // hard failure keeps the periodic tick
        source.push(Reply::Status(5));
        sleep_ms(1_000).await;
        assert_eq!(scheduler.state(), SchedulerState::Active);
        sleep_ms(1_000).await;
        assert_eq!(source.requests().len(), 5);

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let StatusPayload::CycleFailed { code, .. } = &event.payload {
                assert_eq!(code, "DATA_001");
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_polling() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        let clock = TokioClock { base: 1_000, origin: Instant::now() };
        let (mut scheduler, _rx) = scheduler(Arc::clone(&source), clock);
        scheduler.start(60).await.unwrap();

        sleep_ms(1_050).await;
        assert_eq!(source.requests().len(), 2);

        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.session_id().is_none());

        sleep_ms(5_000).await;
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_leaves_single_polling_loop() {
        let source = Arc::new(ScriptedSource::new(CHANNELS));
        let clock = ManualClock::new(1_000);
        let (mut scheduler, _rx) = scheduler(Arc::clone(&source), clock.clone());

        let first = scheduler.start(60).await.unwrap();
        let second = scheduler.start(30).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(source.requests()[1], Window::new(970, 1_000));

        clock.set(1_001);
        sleep_ms(1_050).await;
        assert_eq!(source.requests().len(), 3);
        assert_eq!(scheduler.latest_frame().unwrap().channels[0].len(), 30);
    }
}

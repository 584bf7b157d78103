/// Dashboard controller - mode selection over the sync core
use std::sync::Arc;

use chrono_tz::Tz;
use tracing::info;
use uuid::Uuid;

use crate::data::SeriesSnapshot;
use crate::error::{Result, SyncError};
use crate::events::{StatusBus, StatusEvent, StatusPayload};
use crate::render::{format_value_lines, ChartFrame, Renderer};
use crate::settings::{resolve_names, ChannelNames, SettingsEditor};
use crate::sync::{FrameReceiver, PollScheduler, ScalerSource, SchedulerSettings, SchedulerState};
use crate::types::{check_window_length, Config, DateRange, Mode};
use crate::utils::Clock;

pub struct Dashboard<S: ScalerSource, C: Clock + Clone, R: Renderer> {
    config: Config,
    tz: Tz,
    source: Arc<S>,
    scheduler: PollScheduler<S, C>,
    renderer: R,
    bus: StatusBus,
    mode: Option<Mode>,
    names: ChannelNames,
    editor: SettingsEditor,
    history_start: Option<String>,
    history_end: Option<String>,
    window_length: u32,
}

impl<S: ScalerSource, C: Clock + Clone, R: Renderer> Dashboard<S, C, R> {
    pub fn new(config: Config, source: Arc<S>, clock: C, renderer: R, bus: StatusBus) -> Result<Self> {
        let tz = config.tz()?;
        let names = ChannelNames::defaults(config.channel_count);
        let scheduler = PollScheduler::new(
            Arc::clone(&source),
            clock,
            SchedulerSettings::from(&config),
            bus.clone(),
        );

        Ok(Dashboard {
            tz,
            source,
            scheduler,
            renderer,
            bus,
            mode: None,
            editor: SettingsEditor::new(names.clone()),
            names,
            history_start: None,
            history_end: None,
            window_length: config.window_length_secs,
            config,
        })
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn names(&self) -> &ChannelNames {
        &self.names
    }

    pub fn window_length(&self) -> u32 {
        self.window_length
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.scheduler.session_id()
    }

    pub fn subscribe_frames(&self) -> FrameReceiver {
        self.scheduler.subscribe_frames()
    }

    pub fn editor(&self) -> &SettingsEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut SettingsEditor {
        &mut self.editor
    }

    /// Remember the date inputs used by history mode
    pub fn set_history_range(&mut self, start: Option<String>, end: Option<String>) {
        self.history_start = start;
        self.history_end = end;
    }

    /// Change the realtime window; restarts polling when already in realtime
    pub async fn set_window_length(&mut self, window_length: u32) -> Result<()> {
        if let Err(e) = check_window_length(window_length) {
            self.report(&e);
            return Err(e);
        }
        self.window_length = window_length;
        if self.mode == Some(Mode::Realtime) {
            self.show_realtime().await?;
        }
        Ok(())
    }

    /// Switch mode; leaving realtime always stops polling
    pub async fn select_mode(&mut self, mode: Mode) -> Result<()> {
        self.mode = Some(mode);
        self.bus.publish(StatusEvent::new(None, StatusPayload::ModeSelected { mode }));

        match mode {
            Mode::History => {
                let start = self.history_start.clone();
                let end = self.history_end.clone();
                self.show_history(start.as_deref(), end.as_deref()).await.map(|_| ())
            }
            Mode::Realtime => self.show_realtime().await.map(|_| ()),
            Mode::Settings => {
                self.show_settings().await;
                Ok(())
            }
        }
    }

    /// One-shot history query
    pub async fn show_history(&mut self, start: Option<&str>, end: Option<&str>) -> Result<ChartFrame> {
        self.scheduler.stop();

        let range = match DateRange::parse(start, end) {
            Ok(range) => range,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };

        self.refresh_names().await;

        let frame = match self.source.fetch_history(range).await {
            Ok(batch) => ChartFrame::history(&range, batch, &self.names, &self.tz),
            Err(e) => Err(e),
        };

        match frame {
            Ok(frame) => {
                info!("History {} .. {}: {} points", range.start, range.end, frame.len());
                self.renderer.render(&frame);
                Ok(frame)
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Enter realtime mode with the current window length
    pub async fn show_realtime(&mut self) -> Result<Uuid> {
        self.refresh_names().await;

        match self.scheduler.start(self.window_length).await {
            Ok(id) => {
                if let Some(snapshot) = self.scheduler.latest_frame() {
                    self.render_snapshot(&snapshot);
                }
                Ok(id)
            }
            // bootstrap failures are already on the status bus
            Err(e) => Err(e),
        }
    }

    /// Stop polling and load the editor with the stored names
    pub async fn show_settings(&mut self) {
        self.scheduler.stop();
        self.refresh_names().await;
        self.editor = SettingsEditor::new(self.names.clone());
    }

    /// Save the editor draft and use it for subsequent frames
    pub async fn save_settings(&mut self) -> Result<()> {
        match self.editor.save(self.source.as_ref()).await {
            Ok(saved) => {
                self.names = saved.clone();
                self.bus.publish(StatusEvent::notice("save settings"));
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Build and draw the frame for a realtime snapshot
    pub fn render_snapshot(&self, snapshot: &SeriesSnapshot) -> ChartFrame {
        let frame = ChartFrame::realtime(snapshot, &self.names, &self.tz);
        self.renderer.render(&frame);
        let lines = format_value_lines(&self.names, &frame.latest(), self.config.value_display_lines);
        self.renderer.show_values(&lines);
        frame
    }

    /// Stop everything; called when the UI goes away
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        self.mode = None;
    }

    async fn refresh_names(&mut self) {
        let (names, err) = resolve_names(self.source.as_ref(), self.config.channel_count).await;
        if let Some(e) = err {
            self.report(&e);
        }
        self.names = names;
    }

    fn report(&self, error: &SyncError) {
        self.bus.publish(StatusEvent::new(
            self.scheduler.session_id(),
            StatusPayload::CycleFailed {
                window: None,
                code: error.error_code().to_string(),
                message: error.status_message(),
            },
        ));
    }
}

/// Entry point for the scaler dashboard
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scalerview::{
    config::load_config_or_default,
    events::{StatusBus, StatusEvent},
    render::TracingRenderer,
    sync::ScalerClient,
    utils::SystemClock,
    Config, Dashboard, Mode,
};

type App = Dashboard<ScalerClient, SystemClock, TracingRenderer>;

const USAGE: &str = "usage: scalerview [realtime [secs] | history <start> <end> | settings | names | set-names a,b,...]";

/// What to do for this run
enum Command {
    Realtime(Option<u32>),
    History(String, String),
    Names,
    SetNames(Vec<String>),
}

impl Command {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        match args.first().map(String::as_str) {
            None => Ok(Command::Realtime(None)),
            Some("names") => Ok(Command::Names),
            Some("set-names") => {
                let list = args.get(1).context(USAGE)?;
                Ok(Command::SetNames(list.split(',').map(str::to_string).collect()))
            }
            Some(word) => {
                let mode: Mode = word.parse().with_context(|| USAGE.to_string())?;
                match mode {
                    Mode::Realtime => {
                        let secs = args
                            .get(1)
                            .map(|s| s.parse::<u32>())
                            .transpose()
                            .context("window length must be a whole number of seconds")?;
                        Ok(Command::Realtime(secs))
                    }
                    Mode::History => match (args.get(1), args.get(2)) {
                        (Some(start), Some(end)) => Ok(Command::History(start.clone(), end.clone())),
                        _ => bail!(USAGE),
                    },
                    Mode::Settings => Ok(Command::Names),
                }
            }
        }
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scalerview={},warn", config.log_level)));

    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Status line surface: one printed line per event
async fn print_status(mut events: mpsc::UnboundedReceiver<StatusEvent>, tz: Tz) {
    while let Some(event) = events.recv().await {
        println!(
            "[{}] {}",
            event.timestamp.with_timezone(&tz).format("%H:%M:%S"),
            event.status_line()
        );
    }
}

async fn run(dashboard: &mut App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::History(start, end) => {
            dashboard.set_history_range(Some(start), Some(end));
            dashboard.select_mode(Mode::History).await?;
        }
        Command::Names => {
            dashboard.select_mode(Mode::Settings).await?;
            for (channel, name) in dashboard.editor().draft().iter().enumerate() {
                println!("{:>3}  {}", channel, name);
            }
        }
        Command::SetNames(names) => {
            dashboard.select_mode(Mode::Settings).await?;
            for (channel, name) in names.into_iter().enumerate() {
                dashboard.editor_mut().set(channel, name)?;
            }
            dashboard.save_settings().await?;
        }
        Command::Realtime(secs) => {
            if let Some(secs) = secs {
                dashboard.set_window_length(secs).await?;
            }
            dashboard.select_mode(Mode::Realtime).await?;

            let mut frames = dashboard.subscribe_frames();
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        info!("Ctrl+C received - stopping realtime polling");
                        break;
                    }
                    changed = frames.changed() => {
                        if changed.is_err() {
                            warn!("Frame channel closed");
                            break;
                        }
                        let snapshot = frames.borrow_and_update().clone();
                        if let Some(snapshot) = snapshot {
                            dashboard.render_snapshot(&snapshot);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "scalerview.toml".to_string());

    let config = load_config_or_default(&config_path)
        .with_context(|| format!("failed to load {}", config_path))?;
    init_logging(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    info!("Starting scalerview against {}", config.base_url);

    let tz = config.tz()?;
    let source = Arc::new(ScalerClient::new(&config)?);
    let (bus, events) = StatusBus::channel();
    let status_task = tokio::spawn(print_status(events, tz));

    let renderer = TracingRenderer { show_values: true };
    let mut dashboard = Dashboard::new(config, source, SystemClock, renderer, bus)?;

    let outcome = run(&mut dashboard, command).await;

    dashboard.shutdown();
    drop(dashboard);
    let _ = status_task.await;

    info!("Shutdown complete");
    outcome
}

mod api;
mod app;
mod calendar;
mod config;
mod diary_entry;
mod diary_state;
mod emotion;
mod markdown;
mod onboarding;
mod recommendation;
mod submission;
mod theme;
mod timeline;
mod transition;
mod ui;

use api::{DiaryApi, HttpDiaryApi};
use app::{App, Response};
use chrono::Local;
use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use config::{Settings, SettingsStore};
use crossterm::event::{Event, KeyEventKind};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing_subscriber::EnvFilter;
use ui::UI;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Terminal emotion diary backed by the analysis server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Server base URL; overrides the settings file for this run
    #[arg(long)]
    server: Option<String>,

    /// Settings file to read and write
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write logs
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("emotion-diary")
        .join("emotion-diary.log")
}

// The terminal belongs to the UI, so logs go to a file.
fn init_tracing(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("emotion_diary=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to initialise logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    init_tracing(&args.log_file.clone().unwrap_or_else(default_log_path))?;

    let path = match args.config {
        Some(path) => Some(path),
        None => match Settings::default_path() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "settings will not be persisted");
                None
            }
        },
    };
    let mut settings = match &path {
        Some(path) => Settings::load_from(path)
            .map_err(|e| eyre!("Failed to load settings from {}: {}", path.display(), e))?,
        None => Settings::default(),
    };
    let server_url = args.server.unwrap_or_else(|| settings.server_url.clone());
    if let Some(secs) = args.timeout_secs {
        settings.request_timeout_secs = secs;
    }

    let api: Arc<dyn DiaryApi> = Arc::new(HttpDiaryApi::new(
        &server_url,
        settings.request_timeout(),
    )?);
    tracing::info!(server = %server_url, "starting");

    let mut app = App::new(SettingsStore::new(path, settings), Local::now().date_naive());
    let mut ui = UI::new()?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    let mut last_tick = Instant::now();

    loop {
        while let Ok(response) = rx.try_recv() {
            app.apply(response);
        }

        ui.display(&app)?;

        let mut requests = match ui.next_event(submission::TICK)? {
            Some(Event::Key(key)) if key.kind == KeyEventKind::Press => app.handle_key(key),
            Some(Event::Mouse(mouse)) => {
                app.handle_mouse(mouse, ui.width()?);
                Vec::new()
            }
            _ => Vec::new(),
        };

        let now = Instant::now();
        requests.extend(app.tick(now - last_tick));
        last_tick = now;

        tasks.retain(|task| !task.is_finished());
        for request in requests {
            tracing::debug!(?request, "dispatching");
            let api = Arc::clone(&api);
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                let response = app::execute(api.as_ref(), request).await;
                let _ = tx.send(response);
            }));
        }

        if app.should_quit() {
            break;
        }
    }

    drop(ui);
    if !tasks.is_empty() {
        tracing::info!(pending = tasks.len(), "waiting for in-flight requests");
        if tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(tasks))
            .await
            .is_err()
        {
            tracing::warn!("gave up on in-flight requests");
        }
    }
    tracing::info!("bye");

    Ok(())
}

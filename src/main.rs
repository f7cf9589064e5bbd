use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

mod actions;
mod app;
mod config;
mod display;
mod monitor;

use actions::Action;
use app::App;
use config::{Cli, Settings};
use monitor::{AgentRole, Monitor};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::resolve(Cli::parse())?;

    // The terminal belongs to the TUI, so logs go to a file
    init_logging();
    info!(
        task_id = %settings.task_id,
        logs_dir = %settings.logs_dir.display(),
        comms_dir = %settings.comms_dir.display(),
        "starting monitor"
    );

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

    // Initialize terminal
    let mut terminal = ratatui::init();

    // Spawn input handler
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind == KeyEventKind::Press && input_tx.send(Action::KeyPress(key)).is_err() {
                    break;
                }
            }
        }
        if input_tx.is_closed() {
            break;
        }
    });

    // Spawn log poller; each tick re-reads everything from disk
    let poll_tx = tx.clone();
    let monitor = Arc::new(Monitor::new(&settings));
    for role in AgentRole::ALL {
        let paths = monitor.paths(role);
        debug!(?role, log = %paths.log.display(), report = %paths.report.display(), "watching");
    }
    let tick = settings.tick;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let worker = Arc::clone(&monitor);
            let action = match tokio::task::spawn_blocking(move || worker.poll(SystemTime::now())).await {
                Ok(snapshot) => Action::SnapshotUpdated(snapshot),
                Err(e) => {
                    warn!(error = %e, "poll task failed");
                    Action::Error(format!("Poll failed: {}", e))
                }
            };
            if poll_tx.send(action).is_err() {
                break;
            }
        }
    });

    // Create app state
    let mut app = App::new(settings.task_id.clone());

    // Main event loop
    let result = loop {
        // Render
        terminal.draw(|f| app.render(f))?;

        // Process any pending actions from the app
        for pending_action in app.take_pending_actions() {
            if let Action::CopyFinalMessage(text) = pending_action {
                match copy_to_clipboard(&text) {
                    Ok(()) => app.notify("✓ Copied to clipboard!", false),
                    Err(e) => {
                        debug!(error = %e, "clipboard write failed");
                        app.notify("✗ Failed to copy", true);
                    }
                }
            }
        }

        // Handle events from channel
        tokio::select! {
            Some(action) = rx.recv() => {
                match app.handle_action(action) {
                    Ok(should_quit) => {
                        if should_quit {
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        break Err(e);
                    }
                }
            }
        }
    };

    // Restore terminal
    ratatui::restore();
    info!("monitor stopped");
    result
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text)?;
    Ok(())
}

fn init_logging() {
    let writer = dirs::cache_dir()
        .map(|dir| dir.join("gummy-watch"))
        .and_then(|dir| {
            fs::create_dir_all(&dir).ok()?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("gummy-watch.log"))
                .ok()
        })
        .map(|file| BoxMakeWriter::new(Mutex::new(file)))
        .unwrap_or_else(|| BoxMakeWriter::new(std::io::sink));

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

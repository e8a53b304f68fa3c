use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

use crate::manager::{AppEvent, FileManager};
use crate::push::{PushBus, PushMessage};
use crate::service::device::HttpDevice;

mod app;
mod cli;
mod manager;
mod path;
mod push;
mod service;
mod ui;
#[cfg(test)]
mod tests;

const TICK_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::commands::get_args().get_matches();

    let device_url = matches
        .get_one::<String>("DEVICE_URL")
        .expect("device url is required");
    let download_dir = PathBuf::from(
        matches
            .get_one::<String>("download-dir")
            .expect("download-dir has a default"),
    );
    let log_file = matches
        .get_one::<String>("log-file")
        .expect("log-file has a default");
    let debug = matches.get_flag("debug");

    // Logs go to a file; stdout belongs to the terminal UI.
    let _guard = init_tracing(Path::new(log_file), debug);

    let base = reqwest::Url::parse(device_url)
        .with_context(|| format!("invalid device url: {device_url}"))?;
    let client = Arc::new(HttpDevice::new(base));
    let (mut manager, events) = FileManager::new(client, download_dir);

    // The WebSocket belongs to the embedding page component; it publishes
    // decoded frames into the bus, and this component only subscribes.
    let push_bus = PushBus::new();
    let push_receiver = push_bus.subscribe();

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut manager, events, push_receiver).await;
    ratatui::restore();
    result
}

fn init_tracing(log_file: &Path, debug: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let directory = match log_file.parent() {
        Some(parent) if parent != Path::new("") => parent,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .unwrap_or_else(|| OsStr::new("fsman.log"));
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let default_filter = if debug { "fsman=debug" } else { "fsman=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

async fn run(
    terminal: &mut DefaultTerminal,
    manager: &mut FileManager,
    mut events: mpsc::Receiver<AppEvent>,
    mut push: broadcast::Receiver<PushMessage>,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    manager.refresh_listing();

    loop {
        terminal.draw(|frame| ui::render(frame, &manager.app))?;

        tokio::select! {
            maybe_event = input.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => manager.handle_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => tracing::error!("input error: {e}"),
                None => break,
            },
            Some(event) = events.recv() => manager.handle_event(event),
            message = push.recv() => match message {
                Ok(message) => manager.handle_push(message),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("dropped {n} push messages");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tick.tick() => manager.app.expire_warning(),
        }

        if manager.app.should_quit {
            break;
        }
    }
    Ok(())
}

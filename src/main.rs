mod app;
mod cli;
mod config;
mod fetch;
mod input;
mod k8s;
mod level;
mod model;
mod provider;
mod ui;
mod viewport;

use anyhow::{Context, Result};
use app::{App, AppEvent};
use clap::Parser;
use cli::CliArgs;
use config::RuntimeConfig;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use fetch::FetchGateway;
use futures::StreamExt;
use k8s::KubeGateway;
use model::TerminalSize;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let _args = CliArgs::parse();
    let config = RuntimeConfig::load()?;
    init_tracing(&config)?;
    if let Some(source) = config.source.as_deref() {
        info!("loaded config from {source}");
    }

    let gateway = KubeGateway::new(config.context.clone(), config.logs.clone()).await?;
    info!(
        "connected to {} using context {}",
        gateway.cluster(),
        gateway.context()
    );

    run(gateway).await
}

fn init_tracing(config: &RuntimeConfig) -> Result<()> {
    let filter = tracing_filter(&config.effective_log_filter())?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact();

    let _ = match config.log_file.as_ref() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

fn tracing_filter(level_filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")
}

async fn run(gateway: KubeGateway) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, gateway).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(terminal: &mut TuiTerminal, gateway: KubeGateway) -> Result<()> {
    let (width, height) = crossterm::terminal::size().context("failed to read terminal size")?;
    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
        TerminalSize::new(width, height),
    );

    let (fetch_tx, mut fetch_rx) = mpsc::unbounded_channel();
    let fetcher = FetchGateway::new(Arc::new(gateway), fetch_tx);
    if let Some(request) = app.start() {
        fetcher.issue(request);
    }

    let mut reader = EventStream::new();
    loop {
        terminal
            .draw(|frame| ui::render(frame, &app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        let event = tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        AppEvent::Key(key)
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        AppEvent::Resize(TerminalSize::new(width, height))
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => {
                        warn!("terminal event error: {error}");
                        continue;
                    }
                    None => {
                        info!("terminal event stream closed");
                        break;
                    }
                }
            }
            Some(message) = fetch_rx.recv() => {
                debug!("fetch completed ticket={} kind={}", message.ticket, message.kind());
                AppEvent::Fetched(message)
            }
        };

        if let Some(request) = app.handle_event(event) {
            fetcher.issue(request);
        }
    }

    Ok(())
}

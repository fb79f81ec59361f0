//! Ledgerdesk - terminal console for the bookkeeping service
//!
//! Built with Ratatui and crossterm.

mod app;
mod config;
mod handlers;
mod picker;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ledgerdesk_core::{FileSessionStore, GraphqlClient, NoticeBuffer, RequestInterceptor};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use app::{App, AppState, Services};
use config::Config;

/// Ledgerdesk - manage expenses, incomes, workers and projects
#[derive(Parser, Debug)]
#[command(name = "ledgerdesk")]
#[command(about = "A terminal console for the ledgerdesk bookkeeping service")]
struct Args {
    /// Path to a config file (default: ~/.config/ledgerdesk/ledgerdesk.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GraphQL endpoint, overriding the config file and LEDGERDESK_ENDPOINT
    #[arg(short, long)]
    endpoint: Option<String>,
}

fn init_logging() -> Result<PathBuf> {
    let dir = config::data_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
    let log_path = dir.join("ledgerdesk.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    // The terminal belongs to the TUI, so logs go to a file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ledgerdesk=info".parse()?)
                .add_directive("ledgerdesk_core=info".parse()?),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(log_path)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let log_path = init_logging()?;

    let config = Config::load(args.config)?
        .with_overrides(std::env::var(config::ENDPOINT_ENV).ok(), args.endpoint);
    tracing::info!("Starting ledgerdesk against {} (log: {})", config.endpoint, log_path.display());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let session = Arc::new(FileSessionStore::open(config.session_path()?)?);
    tracing::info!("Session file: {}", session.path().display());
    let interceptor = RequestInterceptor::new(session.clone()).with_timeout(config.request_timeout());
    let client = GraphqlClient::new(config.endpoint_url()?, interceptor);

    let mut app = App::new(Services {
        service: Arc::new(client),
        session,
        notices: NoticeBuffer::new(),
        runtime: runtime.handle().clone(),
        start_route: config.start_route.clone(),
    });

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        tracing::error!("Exited with error: {e:#}");
        eprintln!("Error: {e}");
    }

    // Do not wait on requests still in flight.
    runtime.shutdown_background();
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.pump_events();
        terminal.draw(|frame| ui::render(frame, app))?;

        // Poll for events with timeout so background results show up promptly
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if handlers::handle_key(app, key) {
                    break;
                }
            }
        }

        if matches!(app.state, AppState::Quit) {
            break;
        }
    }

    Ok(())
}

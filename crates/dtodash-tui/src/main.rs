use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ratatui::Terminal;
use ratatui::crossterm::event;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dtodash_core::{
    AssistantClient, BlobStorageClient, CatalogClient, CatalogStore, PipelineSimulator, Settings,
    UploadTrigger, http_client,
};

mod action;
mod app;
mod backend;
mod input;
mod logging;
mod model;
mod theme;
mod tui_event;
mod view;

use app::App;
use backend::Services;

/// dtodash: terminal dashboard for DTO document ingestion.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML settings file (default: <config dir>/dtodash/config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog API endpoint returning the DTO list
    #[arg(long)]
    catalog_endpoint: Option<String>,

    /// Blob storage account name
    #[arg(long)]
    storage_account: Option<String>,

    /// Blob container receiving uploads
    #[arg(long)]
    storage_container: Option<String>,

    /// SAS token authorizing uploads
    #[arg(long)]
    sas_token: Option<String>,

    /// Chat completion resource base URL
    #[arg(long)]
    openai_base: Option<String>,

    /// Chat completion API key
    #[arg(long)]
    openai_key: Option<String>,

    /// Chat completion deployment name
    #[arg(long)]
    openai_deployment: Option<String>,

    /// Chat completion API version
    #[arg(long)]
    openai_version: Option<String>,

    /// Log file (default: <cache dir>/dtodash/dtodash.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            catalog_endpoint: self.catalog_endpoint.clone(),
            storage_account: self.storage_account.clone(),
            storage_container: self.storage_container.clone(),
            storage_sas_token: self.sas_token.clone(),
            assistant_base: self.openai_base.clone(),
            assistant_key: self.openai_key.clone(),
            assistant_deployment: self.openai_deployment.clone(),
            assistant_api_version: self.openai_version.clone(),
            ..Settings::default()
        }
    }

    fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config {
            return Some(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("dtodash").join("config.toml"))
            .filter(|path| path.exists())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_path = logging::init(args.log_file.clone())?;
    log::info!("dtodash {} starting", env!("CARGO_PKG_VERSION"));

    // File < environment < command line
    let file_settings = match args.config_path() {
        Some(path) => {
            log::info!("loading settings from {}", path.display());
            Settings::load_file(&path)?
        }
        None => Settings::default(),
    };
    let config = file_settings
        .merge(Settings::from_env())
        .merge(args.settings())
        .resolve()
        .context("incomplete configuration")?;

    let client = http_client(Duration::from_secs(30))?;
    let catalog = CatalogClient::new(client.clone(), config.catalog_endpoint.clone())?;
    let store = Arc::new(CatalogStore::new(catalog));
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let simulator = Arc::new(PipelineSimulator::new(
        store.clone(),
        config.timings,
        notify_tx,
    ));
    let storage = BlobStorageClient::new(client.clone(), &config.storage);
    let uploader = Arc::new(UploadTrigger::new(storage, simulator.clone()));
    let assistant = AssistantClient::new(client, &config.assistant)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let services = Services {
        store: store.clone(),
        simulator: simulator.clone(),
        uploader,
        assistant,
        tx,
    };
    let mut store_rx = store.subscribe();

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Install panic hook that restores terminal before printing panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Drain any stray input events (e.g. Enter keypress from launching the command)
    while event::poll(Duration::from_millis(50)).unwrap_or(false) {
        let _ = event::read();
    }

    let mut app = App::new();
    app.apply_catalog(&store_rx.borrow_and_update());
    services.spawn_refresh();

    // Also handle Ctrl+C at the OS level for clean shutdown
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| app.view(f))?;

        tokio::select! {
            Some(backend_event) = rx.recv() => {
                app.handle_backend_event(backend_event);
                while let Ok(evt) = rx.try_recv() {
                    app.handle_backend_event(evt);
                }
            }
            Some(notification) = notify_rx.recv() => {
                app.notify(notification);
                while let Ok(n) = notify_rx.try_recv() {
                    app.notify(n);
                }
            }
            Ok(()) = store_rx.changed() => {
                app.apply_catalog(&store_rx.borrow_and_update());
            }
            _ = cancel.cancelled() => {
                app.should_quit = true;
            }
            _ = async {
                if event::poll(tick_rate).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        app.update(input::map_event(&evt, app.input_mode));
                    }
                }
            } => {}
        }

        app.update(action::Action::Tick);
        app.set_pipeline(simulator.status(), simulator.file_name());
        for command in app.take_commands() {
            log::debug!("dispatching {command:?}");
            services.dispatch(command);
        }

        if app.should_quit {
            cancel.cancel();
            break;
        }
    }

    simulator.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    log::info!("dtodash exiting");
    eprintln!("Log written to {}", log_path.display());
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use techmate::app::App;
use techmate::tui::{self, EventHandler, Tui};
use techmate::{handler, logging, ui, BackendClient, ChatView, Config, Settings};

#[derive(Parser)]
#[command(name = "techmate", version)]
#[command(about = "Chat with the TechMate student assistant from your terminal")]
struct Cli {
    /// URL of the question answering endpoint
    #[arg(long, global = true, env = "TECHMATE_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Pre-shared key sent as X-API-KEY
    #[arg(long, global = true, env = "TECHMATE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        question: String,
    },
    /// Check whether the backend is up
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli)?;
    let log_dir = cli.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    let _log_guard = logging::init(&log_dir, &settings.log_level)?;
    tracing::info!(backend = ?settings.backend, "starting techmate");

    let client = BackendClient::new(&settings.backend).context("failed to build HTTP client")?;

    match cli.command {
        None => run_chat(client, settings.greeting).await,
        Some(Commands::Ask { question }) => ask_once(&client, &question).await,
        Some(Commands::Status) => check_status(&client).await,
    }
}

/// File config, then flags/env on top.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let overrides = Config {
        endpoint_url: cli.endpoint_url.clone(),
        api_key: cli.api_key.clone(),
        ..Config::default()
    };

    Ok(file.overlay(overrides).resolve()?)
}

async fn run_chat(client: BackendClient, greeting: Option<String>) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init().context("failed to initialise terminal")?;
    let mut events = EventHandler::new();

    let view = match greeting {
        Some(greeting) => ChatView::with_greeting(greeting),
        None => ChatView::new(),
    };
    let label = client.endpoint().to_string();
    let mut app = App::new(view, Arc::new(client), events.sender(), label);

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, app))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn ask_once(client: &BackendClient, question: &str) -> Result<()> {
    let mut view = ChatView::new();

    if !view.ask(client, question).await {
        bail!("question is empty");
    }

    if let Some(reply) = view.conversation().last() {
        println!("{}", reply.content());
    }
    Ok(())
}

async fn check_status(client: &BackendClient) -> Result<()> {
    match client.health().await {
        Ok(status) => {
            println!("{}: {}", client.endpoint(), status);
            Ok(())
        }
        Err(e) => {
            tracing::warn!(kind = ?e.kind(), error = %e, "health check failed");
            bail!("backend at {} is not available: {e}", client.endpoint())
        }
    }
}

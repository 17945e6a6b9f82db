use anyhow::Result;
use clap::Parser;

mod api;
mod app;
mod artifact;
mod chat;
mod config;
mod feature;
mod handler;
mod modal;
mod tui;
mod ui;

use api::BackendClient;
use app::App;
use config::Config;

#[derive(Parser)]
#[command(name = "pitchdesk")]
#[command(about = "Turn one business idea into pitch assets: slides, video ad, roadmap, investors")]
struct Cli {
    /// Generation backend base URL (remembered in the config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Seed the idea prompt instead of typing it in the TUI
    #[arg(short, long)]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let mut config = Config::load().unwrap_or_else(|_| Config::new());
    if let Some(server) = cli.server {
        config.server_url = Some(server);
        let _ = config.save();
    }
    let client = BackendClient::new(config.server_url());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let mut app = App::new(config, client.clone(), events.sender(), cli.prompt);

    // Startup liveness probe, outside the workflow
    let probe_client = client.clone();
    let probe_tx = events.sender();
    tokio::spawn(async move {
        let result = probe_client.hello().await.map_err(|e| e.to_string());
        let _ = probe_tx.send(tui::AppEvent::Liveness(result));
    });

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event).await?,
            None => break,
        }
    }

    tui::restore()?;
    Ok(())
}

/// The TUI owns the terminal, so logs go to a file, and only when asked for
/// via PITCHDESK_LOG=<path>. Verbosity comes from RUST_LOG as usual.
fn init_logging() -> Result<()> {
    let Ok(path) = std::env::var("PITCHDESK_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pitchdesk=debug")),
        )
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

use anyhow::{Context, Result};
use docchat_core::{ResponseGenerator, Settings};
use tracing::info;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env().context("failed to load configuration")?;
    let log_path = logging::init(&settings.log_filter)?;
    info!(log = %log_path.display(), index = %settings.index.name, model = %settings.model, "starting docchat");

    // Connect before taking over the terminal so failures print normally
    let generator = ResponseGenerator::connect(&settings)
        .await
        .context("failed to connect to the vector index")?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, App::new(generator)).await;
    tui::restore()?;

    info!("docchat exited");
    result
}

async fn run(terminal: &mut Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event).await?,
            None => break,
        }
    }

    Ok(())
}

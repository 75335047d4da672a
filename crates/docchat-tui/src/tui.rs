use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEvent, KeyEventKind, MouseEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::warn;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Drives the "Thinking..." animation and polling of the pending request.
const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Tick,
}

/// Merges terminal input and a periodic tick into one channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let input_tx = tx.clone();
        tokio::spawn(async move {
            let mut reader = EventStream::new();
            while let Some(result) = reader.next().await {
                let Some(app_event) = map_event(result) else {
                    continue;
                };
                if input_tx.send(app_event).is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_RATE);
            loop {
                interval.tick().await;
                if tx.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

/// Translate one terminal read. Read errors are logged and skipped so a
/// single bad read does not stop keyboard input.
fn map_event(result: io::Result<Event>) -> Option<AppEvent> {
    match result {
        // Release and repeat events would double every keystroke on some terminals
        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Ok(Event::Mouse(mouse)) => Some(AppEvent::Mouse(mouse)),
        Ok(Event::Resize(_, _)) => Some(AppEvent::Resize),
        Ok(_) => None,
        Err(err) => {
            warn!(error = %err, "terminal event read failed");
            None
        }
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(io::stderr());
    Ok(Terminal::new(backend)?)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Put the terminal back before the default hook prints the panic.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    fn key_event(kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_read_error_is_skipped() {
        let err = io::Error::new(io::ErrorKind::Interrupted, "read interrupted");
        assert!(map_event(Err(err)).is_none());
    }

    #[test]
    fn test_only_key_presses_are_forwarded() {
        assert!(matches!(map_event(Ok(key_event(KeyEventKind::Press))), Some(AppEvent::Key(_))));
        assert!(map_event(Ok(key_event(KeyEventKind::Release))).is_none());
        assert!(map_event(Ok(key_event(KeyEventKind::Repeat))).is_none());
    }

    #[test]
    fn test_resize_and_focus_events() {
        assert!(matches!(map_event(Ok(Event::Resize(80, 24))), Some(AppEvent::Resize)));
        assert!(map_event(Ok(Event::FocusGained)).is_none());
    }
}

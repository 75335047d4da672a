use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_pending().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('o') => {
                app.open_upload();
                return;
            }
            _ => {}
        }
    }

    if app.upload.is_some() {
        handle_upload_popup(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_upload_popup(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_upload(),
        KeyCode::Enter => app.confirm_upload(),
        _ => {
            if let Some(prompt) = app.upload.as_mut() {
                match key.code {
                    KeyCode::Backspace => prompt.delete_before_cursor(),
                    KeyCode::Left => prompt.move_cursor_left(),
                    KeyCode::Right => prompt.move_cursor_right(),
                    KeyCode::Char(c) => prompt.insert_char(c),
                    _ => {}
                }
            }
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('u') => app.open_upload(),
        KeyCode::Char('x') => app.remove_document(),

        KeyCode::Tab => app.toggle_focus(),

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(10),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => {
            if app.focus == FocusPane::Chat {
                app.scroll_chat_to_bottom();
            }
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_home(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::PageDown => app.chat_scroll = app.chat_scroll.saturating_add(10),
        KeyCode::PageUp => app.chat_scroll = app.chat_scroll.saturating_sub(10),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_doc = app.doc_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.chat_scroll = app.chat_scroll.saturating_add(3),
        MouseEventKind::ScrollUp if in_chat => app.chat_scroll = app.chat_scroll.saturating_sub(3),
        MouseEventKind::ScrollDown if in_doc => app.doc_scroll = app.doc_scroll.saturating_add(3),
        MouseEventKind::ScrollUp if in_doc => app.doc_scroll = app.doc_scroll.saturating_sub(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[tokio::test]
    async fn test_enter_on_empty_input_only_warns() {
        let mut app = test_app(false);
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.warning.is_some());
        assert!(app.session.history().is_empty());
    }

    #[tokio::test]
    async fn test_typing_and_enter_submits() {
        let mut app = test_app(false);
        for c in "hi".chars() {
            handle_event(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.session.history().len(), 1);
        assert!(app.pending.is_some());

        while app.is_loading() {
            tokio::task::yield_now().await;
            handle_event(&mut app, AppEvent::Tick).await.unwrap();
        }
        assert_eq!(app.session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_ctrl_o_opens_upload_and_esc_closes_it() {
        let mut app = test_app(false);
        handle_event(&mut app, ctrl('o')).await.unwrap();
        assert!(app.upload.is_some());

        // keys go to the popup, not the chat input
        handle_event(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        assert_eq!(app.upload.as_ref().unwrap().path, "a");
        assert!(app.input.is_empty());

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(app.upload.is_none());
    }

    #[tokio::test]
    async fn test_esc_then_q_quits() {
        let mut app = test_app(false);
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_event(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_tab_switches_scroll_target() {
        let mut app = test_app(false);
        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Document);
        handle_event(&mut app, key(KeyCode::Char('j'))).await.unwrap();
        assert_eq!(app.doc_scroll, 1);
        assert_eq!(app.chat_scroll, 0);
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 4, rect));
        assert!(!point_in_rect(6, 4, rect));
        assert!(!point_in_rect(1, 2, rect));
    }
}

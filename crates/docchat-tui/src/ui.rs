use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use docchat_core::ChatRole;

use crate::app::{App, FocusPane, InputMode, UploadPrompt};

/// Style `**bold**` and `` `code` `` runs in a line of model output.
/// Unterminated markers are kept as literal text.
fn styled_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let bold = rest.find("**");
        let code = rest.find('`');
        let (start, marker, style) = match (bold, code) {
            (Some(b), Some(c)) if c < b => (c, "`", Style::default().fg(Color::Green)),
            (Some(b), _) => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", Style::default().fg(Color::Green)),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        match after.find(marker) {
            Some(end) if end > 0 => {
                if start > 0 {
                    spans.push(Span::raw(rest[..start].to_string()));
                }
                spans.push(Span::styled(after[..end].to_string(), style));
                rest = &after[end + marker.len()..];
            }
            _ => {
                spans.push(Span::raw(rest[..start + marker.len()].to_string()));
                rest = after;
            }
        }
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }
    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [doc_area, chat_column] = Layout::horizontal([
        Constraint::Percentage(35),
        Constraint::Percentage(65),
    ])
    .areas(body_area);

    render_document(app, frame, doc_area);
    render_chat(app, frame, chat_column);
    render_footer(app, frame, footer_area);

    if let Some(prompt) = &app.upload {
        render_upload_popup(prompt, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let document = match app.session.document() {
        Some(doc) => format!(" [{}] ", doc.name),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" Conversational Q&A ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(document, Style::default().fg(Color::White)),
        Span::styled(
            format!(" {} ", app.generator.model()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title).style(Style::default().bg(Color::DarkGray)), area);
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

fn render_document(app: &mut App, frame: &mut Frame, area: Rect) {
    app.doc_area = Some(area);

    let title = match app.session.document() {
        Some(doc) => format!(" Document: {} ({} pages) ", doc.name, doc.page_count),
        None => " Document ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Document)))
        .title(title);

    let text = if let Some(err) = &app.document_error {
        Text::from(vec![
            Line::from(Span::styled("Could not read the uploaded file:", Style::default().fg(Color::Red).bold())),
            Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))),
            Line::default(),
            Line::from(Span::styled("Chat still works without it.", Style::default().fg(Color::DarkGray))),
        ])
    } else if let Some(doc) = app.session.document() {
        if doc.text.trim().is_empty() {
            Text::from(Span::styled(
                "No text found in this PDF.",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))
        } else {
            Text::from(doc.text.clone())
        }
    } else {
        Text::from(vec![
            Line::from(Span::styled("No document uploaded.", Style::default().fg(Color::DarkGray))),
            Line::default(),
            Line::from(Span::styled("Press Ctrl+O to upload a PDF.", Style::default().fg(Color::DarkGray))),
        ])
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.doc_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Chat)))
        .title(" Chat with the Assistant ");

    let history = app.session.history();
    let chat_text = if history.is_empty() && !app.is_loading() {
        Text::from(Span::styled(
            "Ask a question to get started...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for msg in history {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Blue))));
                    }
                }
                ChatRole::Assistant => {
                    let is_error = msg.content.starts_with("Error: ");
                    lines.push(Line::from(Span::styled(
                        "Assistant:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        if is_error {
                            lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Red))));
                        } else {
                            lines.push(styled_line(line));
                        }
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.is_loading() {
            lines.push(Line::from(Span::styled(
                "Assistant:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.upload.is_none();
    let border = if app.warning.is_some() {
        Color::Red
    } else if editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = match &app.warning {
        Some(warning) => format!(" {} ", warning),
        None => " Ask a question (Enter to send) ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    // Keep the cursor inside the box by scrolling the line horizontally
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.input_cursor >= inner_width {
        app.input_cursor - inner_width + 1
    } else {
        0
    };
    let visible: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();

    frame.render_widget(Paragraph::new(visible).block(block), area);

    if editing {
        let cursor_x = (app.input_cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.upload.is_some() {
        (" UPLOAD ", Style::default().bg(Color::Magenta).fg(Color::White))
    } else if app.is_loading() {
        (" WAITING ", Style::default().bg(Color::Gray).fg(Color::Black))
    } else {
        match app.input_mode {
            InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
            InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        }
    };

    let pairs: &[(&str, &str)] = if app.upload.is_some() {
        &[(" Enter ", " load "), (" Esc ", " cancel ")]
    } else {
        match app.input_mode {
            InputMode::Editing => &[
                (" Enter ", " send "),
                (" Ctrl+O ", " upload PDF "),
                (" Esc ", " stop typing "),
                (" Ctrl+C ", " quit "),
            ],
            InputMode::Normal => &[
                (" i ", " type "),
                (" Tab ", " focus "),
                (" j/k ", " scroll "),
                (" u ", " upload "),
                (" x ", " remove doc "),
                (" q ", " quit "),
            ],
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black)),
        area,
    );
}

fn render_upload_popup(prompt: &UploadPrompt, frame: &mut Frame, area: Rect) {
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 7;
    let popup_area = Rect::new(
        area.width.saturating_sub(popup_width) / 2,
        area.height.saturating_sub(popup_height) / 2,
        popup_width,
        popup_height.min(area.height),
    );

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Upload PDF ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    if inner.height < 3 {
        return;
    }

    let instructions = Paragraph::new("Path to a .pdf file. Enter to load, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let offset = if width > 0 && prompt.cursor >= width {
        prompt.cursor - width + 1
    } else {
        0
    };
    let visible: String = prompt.path.chars().skip(offset).take(width).collect();
    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);
    frame.set_cursor_position((input_area.x + (prompt.cursor - offset) as u16, input_area.y));

    if let Some(err) = &prompt.error {
        if inner.height > 4 {
            let status_area = Rect::new(inner.x, inner.y + 4, inner.width, 1);
            frame.render_widget(Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red)), status_area);
        }
    }
}

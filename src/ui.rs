use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::chat::{ChatRole, ChatView, Draft};

const TITLE: &str = "TechMate";
const SUBTITLE: &str = "Your AI Assistant for Technical Education";
const TYPING: &str = "Bot is typing";
const PLACEHOLDER: &str = "Ask a question to get started...";

fn user_label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn assistant_label_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

/// Style `**bold**` and `` `code` `` runs in a line of assistant text.
///
/// Unclosed markers are kept as literal text.
fn styled_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next_bold = rest.find("**");
        let next_code = rest.find('`');

        let (start, marker, style) = match (next_bold, next_code) {
            (Some(b), Some(c)) if c < b => (c, "`", Style::default().fg(Color::Green)),
            (Some(b), _) => (b, "**", Style::default().add_modifier(Modifier::BOLD)),
            (None, Some(c)) => (c, "`", Style::default().fg(Color::Green)),
            (None, None) => break,
        };

        let after_open = &rest[start + marker.len()..];
        let Some(len) = after_open.find(marker).filter(|len| *len > 0) else {
            // Not a styled run; emit through the marker and keep scanning
            spans.push(Span::raw(rest[..start + marker.len()].to_string()));
            rest = after_open;
            continue;
        };

        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(after_open[..len].to_string(), style));
        rest = &after_open[len + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

/// Build the transcript: every message in order, then the typing indicator
/// while an ask is in flight.
///
/// User messages are right-aligned, assistant messages left-aligned.
pub fn transcript_lines(view: &ChatView, animation_frame: u8) -> Vec<Line<'static>> {
    let conversation = view.conversation();

    if conversation.is_empty() && !view.is_pending() {
        return vec![Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in conversation.messages() {
        match msg.role() {
            ChatRole::User => {
                lines.push(
                    Line::from(Span::styled("You", user_label_style()))
                        .alignment(Alignment::Right),
                );
                for line in msg.content().lines() {
                    lines.push(Line::from(line.to_string()).alignment(Alignment::Right));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(TITLE, assistant_label_style())));
                for line in msg.content().lines() {
                    lines.push(styled_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if view.is_pending() {
        lines.push(Line::from(Span::styled(TITLE, assistant_label_style())));
        // Animated ellipsis: ".", "..", "..."
        let dots = ".".repeat((animation_frame % 3) as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("{TYPING}{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::vertical([
        Constraint::Length(2), // header
        Constraint::Min(3),    // transcript
        Constraint::Length(3), // input
        Constraint::Length(1), // key hints
    ])
    .split(frame.area());

    render_header(frame, chunks[0]);
    render_transcript(frame, app, chunks[1]);
    render_input(frame, app.view.draft(), app.view.is_pending(), chunks[2]);
    render_hints(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            TITLE,
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(SUBTITLE, Style::default().fg(Color::Gray))),
    ])
    .alignment(Alignment::Center);

    frame.render_widget(header, area);
}

fn render_transcript(frame: &mut Frame, app: &mut App, area: Rect) {
    let lines = transcript_lines(&app.view, app.animation_frame);
    let transcript = Paragraph::new(lines).wrap(Wrap { trim: false });

    // Inner size minus borders, kept on the app for scroll calculations
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let total_rows = u16::try_from(transcript.line_count(inner_width)).unwrap_or(u16::MAX);
    app.chat_height = inner_height;
    app.max_scroll = total_rows.saturating_sub(inner_height);
    app.scroll = if app.follow_tail {
        app.max_scroll
    } else {
        app.scroll.min(app.max_scroll)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.endpoint_label));

    let transcript = transcript.block(block).scroll((app.scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_input(frame: &mut Frame, draft: &Draft, pending: bool, area: Rect) {
    let (title, border) = if pending {
        (" Waiting for answer... ", Color::DarkGray)
    } else {
        (" Message ", Color::Cyan)
    };

    // Keep the cursor inside the box by scrolling long drafts horizontally
    let before_cursor: String = draft.text().chars().take(draft.cursor()).collect();
    let cursor_col = u16::try_from(Span::raw(before_cursor).width()).unwrap_or(u16::MAX);
    let inner_width = area.width.saturating_sub(2).max(1);
    let offset = cursor_col.saturating_sub(inner_width - 1);

    let input = Paragraph::new(draft.text().to_string())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title),
        )
        .scroll((0, offset));

    frame.render_widget(input, area);
    let cursor_x = area.x.saturating_add(1).saturating_add(cursor_col - offset);
    frame.set_cursor_position((cursor_x, area.y + 1));
}

fn render_hints(frame: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Cyan);
    let hints = Line::from(vec![
        Span::styled("Enter", key),
        Span::raw(" send  "),
        Span::styled("↑/↓ PgUp/PgDn", key),
        Span::raw(" scroll  "),
        Span::styled("Esc", key),
        Span::raw(" quit"),
    ]);

    frame.render_widget(
        Paragraph::new(hints)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        area,
    );
}

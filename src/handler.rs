use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::tui::AppEvent;

const MOUSE_SCROLL_LINES: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::AskResolved(outcome) => app.finish_ask(outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match key.code {
        KeyCode::Esc => app.quit(),

        // Submit; a no-op while an ask is in flight, so the draft survives
        KeyCode::Enter => app.submit_draft(),

        // Draft editing
        KeyCode::Backspace => app.view.draft_mut().backspace(),
        KeyCode::Delete => app.view.draft_mut().delete(),
        KeyCode::Left => app.view.draft_mut().move_left(),
        KeyCode::Right => app.view.draft_mut().move_right(),
        KeyCode::Home => app.view.draft_mut().move_home(),
        KeyCode::End => app.view.draft_mut().move_end(),
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            app.view.draft_mut().insert(c)
        }

        // Transcript scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => {
            let page = app.page_size();
            app.scroll_up(page);
        }
        KeyCode::PageDown => {
            let page = app.page_size();
            app.scroll_down(page);
        }

        _ => {}
    }
}

/// The draft is a single line, so pasted line breaks become spaces.
fn handle_paste(app: &mut App, text: &str) {
    let flattened: String = text
        .chars()
        .filter(|c| *c != '\r')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    app.view.draft_mut().insert_str(&flattened);
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollDown => app.scroll_down(MOUSE_SCROLL_LINES),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AskError, AskResponse, Answerer};
    use crate::chat::{ChatMessage, ChatView};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Echo;

    #[async_trait]
    impl Answerer for Echo {
        async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
            Ok(AskResponse {
                answer: Some(format!("(DUMMY) You asked: {question}")),
                ..AskResponse::default()
            })
        }
    }

    fn new_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(ChatView::new(), Arc::new(Echo), tx, "test");
        (app, rx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn enter_dispatches_and_resolution_appends_reply() {
        let (mut app, mut rx) = new_app();
        type_text(&mut app, "hello");
        handle_event(&mut app, key(KeyCode::Enter));

        assert!(app.view.is_pending());
        assert!(app.view.draft().is_empty());
        assert_eq!(app.view.conversation().messages(), &[ChatMessage::user("hello")]);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::AskResolved(Ok(_))));
        handle_event(&mut app, event);

        assert!(!app.view.is_pending());
        assert_eq!(
            app.view.conversation().messages(),
            &[
                ChatMessage::user("hello"),
                ChatMessage::assistant("(DUMMY) You asked: hello"),
            ]
        );
    }

    #[tokio::test]
    async fn enter_while_pending_keeps_the_draft() {
        let (mut app, mut rx) = new_app();
        type_text(&mut app, "first");
        handle_event(&mut app, key(KeyCode::Enter));

        type_text(&mut app, "second");
        handle_event(&mut app, key(KeyCode::Enter));

        assert_eq!(app.view.draft().text(), "second");
        assert_eq!(app.view.conversation().len(), 1);

        let event = rx.recv().await.unwrap();
        handle_event(&mut app, event);
        assert_eq!(app.view.conversation().len(), 2);

        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.view.conversation().len(), 3);
        assert_eq!(
            app.view.conversation().last().unwrap(),
            &ChatMessage::user("second")
        );
    }

    #[tokio::test]
    async fn blank_draft_does_not_dispatch() {
        let (mut app, mut rx) = new_app();
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter));

        assert!(!app.view.is_pending());
        assert!(app.view.conversation().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let (mut app, _rx) = new_app();
        handle_event(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);

        let (mut app, _rx) = new_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
        assert!(app.view.draft().is_empty());
    }

    #[test]
    fn cursor_keys_edit_the_draft() {
        let (mut app, _rx) = new_app();
        type_text(&mut app, "abc");
        handle_event(&mut app, key(KeyCode::Left));
        handle_event(&mut app, key(KeyCode::Backspace));
        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));
        handle_event(&mut app, key(KeyCode::End));
        type_text(&mut app, "!");
        assert_eq!(app.view.draft().text(), "c!");
    }

    #[test]
    fn paste_inserts_a_single_line_at_the_cursor() {
        let (mut app, _rx) = new_app();
        type_text(&mut app, "Q: ?");
        handle_event(&mut app, key(KeyCode::Left));
        handle_event(&mut app, AppEvent::Paste("what is\r\nvoltage".to_string()));
        assert_eq!(app.view.draft().text(), "Q: what is voltage?");
        assert!(app.view.conversation().is_empty());
    }

    #[test]
    fn scrolling_up_detaches_from_the_tail() {
        let (mut app, _rx) = new_app();
        app.chat_height = 5;
        app.max_scroll = 10;
        app.scroll = 10;

        handle_event(
            &mut app,
            AppEvent::Mouse(MouseEvent {
                kind: MouseEventKind::ScrollUp,
                column: 0,
                row: 0,
                modifiers: KeyModifiers::NONE,
            }),
        );
        assert_eq!(app.scroll, 7);
        assert!(!app.follow_tail);

        handle_event(&mut app, key(KeyCode::PageDown));
        assert_eq!(app.scroll, 10);
        assert!(app.follow_tail);
    }

    #[test]
    fn tick_only_animates_while_pending() {
        let (mut app, _rx) = new_app();
        handle_event(&mut app, AppEvent::Tick);
        assert_eq!(app.animation_frame, 0);
    }
}

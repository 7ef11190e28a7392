use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::backend::{AskError, AskResponse, Answerer};
use crate::chat::ChatView;
use crate::tui::AppEvent;

pub struct App {
    pub should_quit: bool,
    pub view: ChatView,

    // Transcript scrolling
    pub scroll: u16,
    pub max_scroll: u16,
    pub follow_tail: bool, // keep the newest message in view
    pub chat_height: u16,  // inner height of the transcript, set during render

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing indicator dots

    /// Shown in the transcript title.
    pub endpoint_label: String,

    backend: Arc<dyn Answerer>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        view: ChatView,
        backend: Arc<dyn Answerer>,
        events: UnboundedSender<AppEvent>,
        endpoint_label: impl Into<String>,
    ) -> Self {
        Self {
            should_quit: false,
            view,
            scroll: 0,
            max_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            animation_frame: 0,
            endpoint_label: endpoint_label.into(),
            backend,
            events,
        }
    }

    /// Submit the draft and, if accepted, ask the backend in the background.
    ///
    /// The outcome comes back through the event queue as
    /// [`AppEvent::AskResolved`].
    pub fn submit_draft(&mut self) {
        let Some(question) = self.view.submit_draft() else {
            return;
        };

        self.follow_tail = true;
        self.animation_frame = 0;
        tracing::info!(chars = question.chars().count(), "dispatching ask");

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = backend.ask(&question).await;
            if events.send(AppEvent::AskResolved(outcome)).is_err() {
                tracing::debug!("event loop closed before the ask resolved");
            }
        });
    }

    pub fn finish_ask(&mut self, outcome: Result<AskResponse, AskError>) {
        self.view.resolve(outcome);
        self.follow_tail = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.view.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
        if self.scroll >= self.max_scroll {
            self.follow_tail = true;
        }
    }

    pub fn page_size(&self) -> u16 {
        self.chat_height.saturating_sub(1).max(1)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

//! Conversation state for the chat view.
//!
//! Nothing in here touches the terminal or the network directly. The view
//! hands a question out of [`ChatView::submit`] and takes the outcome back in
//! through [`ChatView::resolve`], so the event loop decides how the ask is run.

use serde::{Deserialize, Serialize};

use crate::backend::{AskError, AskResponse, Answerer};

/// Shown when the service answered but the `answer` field was absent or empty.
pub const NO_ANSWER_FALLBACK: &str = "No answer received from backend.";
/// Shown for any failed ask, whatever the cause.
pub const UNREACHABLE_FALLBACK: &str = "Sorry, could not reach the backend.";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    role: ChatRole,
    content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Append-only transcript.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Text being typed, with a cursor measured in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    text: String,
    cursor: usize,
}

impl Draft {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Insert a run of text at the cursor, e.g. a paste.
    pub fn insert_str(&mut self, s: &str) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert_str(byte_pos, s);
        self.cursor += s.chars().count();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// Text of the assistant message that closes a turn.
pub fn reply_text(outcome: &Result<AskResponse, AskError>) -> &str {
    match outcome {
        Ok(response) => response.answer_text().unwrap_or(NO_ANSWER_FALLBACK),
        Err(_) => UNREACHABLE_FALLBACK,
    }
}

/// Conversation, draft and pending flag for one chat session.
///
/// Idle until [`submit`](Self::submit) accepts a question, pending until
/// [`resolve`](Self::resolve) closes the turn. At most one ask is in flight.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    conversation: Conversation,
    draft: Draft,
    pending: bool,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the conversation with an assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut view = Self::new();
        view.conversation.push(ChatMessage::assistant(greeting));
        view
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Accept a user turn.
    ///
    /// Appends the user message, clears the draft and marks the view pending,
    /// then returns the question the caller must ask. Returns `None` without
    /// touching any state when the text is blank or an ask is already in
    /// flight.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        if self.pending {
            tracing::debug!("submit ignored: an ask is already in flight");
            return None;
        }

        let question = text.trim();
        if question.is_empty() {
            return None;
        }
        let question = question.to_string();

        self.conversation.push(ChatMessage::user(question.clone()));
        self.draft.clear();
        self.pending = true;

        Some(question)
    }

    /// Submit whatever is in the draft.
    pub fn submit_draft(&mut self) -> Option<String> {
        let text = self.draft.text().to_string();
        self.submit(&text)
    }

    /// Close the in-flight turn with the outcome of the ask.
    ///
    /// Failures become a placeholder reply; the error itself only goes to the log.
    pub fn resolve(&mut self, outcome: Result<AskResponse, AskError>) {
        if !self.pending {
            tracing::warn!("dropping ask outcome that arrived with no turn in flight");
            return;
        }

        if let Err(e) = &outcome {
            tracing::warn!(kind = ?e.kind(), error = %e, "ask failed");
        }

        self.conversation
            .push(ChatMessage::assistant(reply_text(&outcome)));
        self.pending = false;
    }

    /// Run one full turn against `backend`: submit, ask, resolve.
    ///
    /// Returns `false` if the text was rejected by [`submit`](Self::submit).
    pub async fn ask(&mut self, backend: &dyn Answerer, text: &str) -> bool {
        let Some(question) = self.submit(text) else {
            return false;
        };

        let outcome = backend.ask(&question).await;
        self.resolve(outcome);
        true
    }
}

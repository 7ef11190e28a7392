pub mod app;
pub mod backend;
pub mod chat;
pub mod config;
pub mod handler;
pub mod logging;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use backend::{AskError, AskResponse, Answerer, BackendClient, FailureKind};
pub use chat::{ChatMessage, ChatRole, ChatView, Conversation, Draft};
pub use config::{BackendConfig, Config, ConfigError, Settings};

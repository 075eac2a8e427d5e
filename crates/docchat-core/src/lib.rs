pub mod api;
pub mod config;
pub mod conversation;
pub mod files;
pub mod history;
pub mod markup;
pub mod state;
pub mod theme;
pub mod upload;

// Re-export main types for convenience
pub use api::{ApiError, BackendClient, IndexStatus};
pub use config::Config;
pub use conversation::ChatController;
pub use files::{FileEntry, FileList, Notice};
pub use history::{HistoryStore, KvStore};
pub use markup::{classify_line, LineKind};
pub use state::{Conversation, Message, MessageDraft, PendingQuery, Role};
pub use theme::Theme;
pub use upload::UploadState;

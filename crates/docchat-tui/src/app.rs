use std::future::Future;
use std::path::PathBuf;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use docchat_core::files::fetch_entries;
use docchat_core::upload::send_file;
use docchat_core::{
    ApiError, BackendClient, ChatController, FileEntry, FileList, HistoryStore, Notice, Theme,
    UploadState,
};

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Files,
    Chat,
    Input,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Files => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Input,
            FocusPane::Input => FocusPane::Files,
        }
    }
}

/// Result of a background request, delivered through the event channel
#[derive(Debug)]
pub enum TaskOutput {
    Chat(Result<String, ApiError>),
    /// `generation` tells a superseded refresh apart from the latest one
    Files { generation: u64, entries: Vec<FileEntry> },
    Upload(Result<(), ApiError>),
    Delete { file_name: String, result: Result<(), ApiError> },
}

/// Modal overlays. Only one is shown at a time and it takes all keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    /// Upload or delete outcome; dismissed with Enter/Esc
    Notice(Notice),
    /// Waiting for y/n before deleting this file
    ConfirmDelete(String),
    /// Path prompt standing in for a file picker
    UploadPath,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub theme: Theme,
    pub popup: Option<Popup>,

    // Chat
    pub chat: ChatController,
    pub query_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Files
    pub files: FileList,
    pub file_state: ListState,
    pub file_generation: u64, // Bumped by every refresh; older results are dropped
    pub delete_pending: bool,

    // Upload
    pub upload: UploadState,
    pub upload_input: String,
    pub upload_cursor: usize,

    // Animation state
    pub animation_frame: u8, // 0-2 for the loading dots

    // Panel areas for mouse hit-testing (updated during render)
    pub files_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    api: BackendClient,
    cancel: CancellationToken,
    notifier: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        api: BackendClient,
        store: HistoryStore,
        theme: Theme,
        notifier: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Input,
            theme,
            popup: None,

            chat: ChatController::open(store),
            query_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            files: FileList::new(),
            file_state: ListState::default(),
            file_generation: 0,
            delete_pending: false,

            upload: UploadState::new(),
            upload_input: String::new(),
            upload_cursor: 0,

            animation_frame: 0,

            files_area: None,
            chat_area: None,

            api,
            cancel: CancellationToken::new(),
            notifier,
        }
    }

    pub fn api(&self) -> &BackendClient {
        &self.api
    }

    /// Run `fut` in the background and hand its output to the event loop.
    /// If the task dies, `on_failure` is delivered instead so no flag is
    /// left raised.
    fn spawn<F>(&self, fut: F, on_failure: TaskOutput)
    where
        F: Future<Output = TaskOutput> + Send + 'static,
    {
        let notifier = self.notifier.clone();
        let task = tokio::spawn(fut);
        tokio::spawn(async move {
            let output = task.await.unwrap_or_else(|e| {
                warn!("background task failed: {}", e);
                on_failure
            });
            let _ = notifier.send(AppEvent::TaskDone(output));
        });
    }

    // Chat

    /// Submit the draft. A blank draft or a query already in flight makes
    /// this a no-op.
    pub fn submit_query(&mut self) {
        let Some(pending) = self.chat.begin_submit() else {
            return;
        };
        self.query_cursor = 0;
        self.scroll_chat_to_bottom();

        let api = self.api.clone();
        let token = self.cancel.child_token();
        self.spawn(
            async move { TaskOutput::Chat(api.chat(&pending.query, &token).await) },
            TaskOutput::Chat(Err(ApiError::Cancelled)),
        );
    }

    pub fn clear_history(&mut self) {
        self.chat.clear();
        self.chat_scroll = 0;
    }

    // Files

    /// Reload the file list. A refresh still in flight is superseded: its
    /// result is dropped when it arrives.
    pub fn start_refresh(&mut self) {
        self.file_generation += 1;
        let generation = self.file_generation;
        self.files.begin_refresh();

        let api = self.api.clone();
        let token = self.cancel.child_token();
        self.spawn(
            async move {
                let entries = fetch_entries(&api, &token).await;
                TaskOutput::Files { generation, entries }
            },
            TaskOutput::Files {
                generation,
                entries: vec![FileEntry::StatusError],
            },
        );
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.file_state
            .selected()
            .and_then(|i| self.files.entries().get(i))
            .and_then(FileEntry::file_name)
    }

    pub fn files_nav_down(&mut self) {
        let len = self.files.entries().len();
        if len > 0 {
            let i = self.file_state.selected().unwrap_or(0);
            self.file_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn files_nav_up(&mut self) {
        let i = self.file_state.selected().unwrap_or(0);
        self.file_state.select(Some(i.saturating_sub(1)));
    }

    /// Ask for confirmation before deleting the selected file
    pub fn request_delete(&mut self) {
        if self.delete_pending {
            return;
        }
        if let Some(name) = self.selected_file() {
            self.popup = Some(Popup::ConfirmDelete(name.to_string()));
        }
    }

    /// Answer to the delete prompt. Declining drops it silently.
    pub fn confirm_delete(&mut self, confirmed: bool) {
        let name = match &self.popup {
            Some(Popup::ConfirmDelete(name)) => name.clone(),
            _ => return,
        };
        self.popup = None;
        if !confirmed {
            debug!(file_name = %name, "delete declined");
            return;
        }

        self.delete_pending = true;
        let api = self.api.clone();
        let token = self.cancel.child_token();
        let failed_name = name.clone();
        self.spawn(
            async move {
                let result = api.delete_file(&name, &token).await;
                TaskOutput::Delete { file_name: name, result }
            },
            TaskOutput::Delete {
                file_name: failed_name,
                result: Err(ApiError::Cancelled),
            },
        );
    }

    // Upload

    pub fn open_upload_prompt(&mut self) {
        if self.upload.is_uploading() {
            return;
        }
        self.upload_input.clear();
        self.upload_cursor = 0;
        self.popup = Some(Popup::UploadPath);
    }

    /// Upload the path typed into the prompt. An empty path means nothing
    /// was chosen and nothing happens.
    pub fn start_upload(&mut self) {
        self.popup = None;
        let path = self.upload_input.trim();
        if path.is_empty() || self.upload.is_uploading() {
            return;
        }
        let path = PathBuf::from(path);

        self.upload.begin();
        let api = self.api.clone();
        let token = self.cancel.child_token();
        self.spawn(
            async move { TaskOutput::Upload(send_file(&api, &path, &token).await) },
            TaskOutput::Upload(Err(ApiError::Cancelled)),
        );
    }

    // Background results

    /// Apply the result of a finished background request
    pub fn apply_task(&mut self, output: TaskOutput) {
        match output {
            TaskOutput::Chat(result) => {
                self.chat.finish_submit(result);
                self.scroll_chat_to_bottom();
            }
            TaskOutput::Files { generation, entries } => {
                if generation != self.file_generation {
                    debug!(generation, "dropping superseded file list");
                    return;
                }
                self.files.apply(entries);
                self.clamp_file_selection();
            }
            TaskOutput::Upload(result) => {
                let notice = self.upload.finish(result);
                if notice.is_success() {
                    self.start_refresh();
                }
                self.popup = Some(Popup::Notice(notice));
            }
            TaskOutput::Delete { file_name, result } => {
                self.delete_pending = false;
                let notice = self.files.finish_delete(&file_name, &result);
                if notice.is_success() {
                    self.start_refresh();
                }
                self.popup = Some(Popup::Notice(notice));
            }
        }
    }

    /// Abort anything still in flight
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
    }

    fn clamp_file_selection(&mut self) {
        let len = self.files.entries().len();
        match self.file_state.selected() {
            _ if len == 0 => self.file_state.select(None),
            Some(i) if i >= len => self.file_state.select(Some(len - 1)),
            None => self.file_state.select(Some(0)),
            _ => {}
        }
    }

    // Presentation

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_loading() || self.upload.is_uploading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat to bottom so the newest message (or the loading dots)
    /// is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in self.chat.messages() {
            total_lines = total_lines.saturating_add(1); // Role line
            let text_lines = if msg.is_error {
                wrapped_line_count(&msg.text.replace('\n', " "), wrap_width)
            } else {
                msg.text.lines().map(|line| wrapped_line_count(line, wrap_width)).sum()
            };
            total_lines = total_lines.saturating_add(text_lines);
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.chat.is_loading() {
            total_lines = total_lines.saturating_add(2);
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

fn wrapped_line_count(line: &str, width: usize) -> u16 {
    // Character count, not byte length, for UTF-8 text
    let char_count = line.chars().count();
    if char_count == 0 {
        1
    } else {
        u16::try_from(char_count / width.max(1) + 1).unwrap_or(u16::MAX)
    }
}

//! Displayed file list and the calls that keep it in sync with the backend
//!
//! The list is never merged or spliced locally: every refresh replaces it
//! wholesale, and a delete is followed by a refresh.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, BackendClient};

pub const NO_DOCUMENTS: &str = "No documents uploaded";
pub const STATUS_ERROR: &str = "Error checking status";

/// A user-visible success or failure that has to be acknowledged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn is_success(&self) -> bool {
        matches!(self, Notice::Success(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Success(text) | Notice::Failure(text) => text,
        }
    }
}

/// One row of the displayed list: a real filename or a synthetic status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    File(String),
    Summary(u64),
    Empty,
    StatusError,
}

impl FileEntry {
    /// The filename, if this row names a real file
    pub fn file_name(&self) -> Option<&str> {
        match self {
            FileEntry::File(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileEntry::File(name) => write!(f, "{}", name),
            FileEntry::Summary(1) => write!(f, "1 document processed"),
            FileEntry::Summary(count) => write!(f, "{} documents processed", count),
            FileEntry::Empty => write!(f, "{}", NO_DOCUMENTS),
            FileEntry::StatusError => write!(f, "{}", STATUS_ERROR),
        }
    }
}

/// Query the status endpoints and turn the answers into display rows.
///
/// `GET /upload/status` wins when it names any files. Otherwise
/// `GET /chat/status` decides between a processed-count summary and the
/// "no documents" row. A transport failure on either call gives the
/// status-error row.
pub async fn fetch_entries(api: &BackendClient, token: &CancellationToken) -> Vec<FileEntry> {
    match api.upload_status(token).await {
        Ok(files) if !files.is_empty() => {
            debug!(count = files.len(), "file list from upload status");
            return files.into_iter().map(FileEntry::File).collect();
        }
        Ok(_) => {}
        Err(e) if e.is_transport() => {
            warn!("upload status unreachable: {}", e);
            return vec![FileEntry::StatusError];
        }
        Err(e) => debug!("upload status unusable, trying chat status: {}", e),
    }

    match api.chat_status(token).await {
        Ok(status) => match (status.is_initialized(), status.document_count) {
            (true, Some(count)) => vec![FileEntry::Summary(count)],
            _ => vec![FileEntry::Empty],
        },
        Err(e) if e.is_transport() => {
            warn!("chat status unreachable: {}", e);
            vec![FileEntry::StatusError]
        }
        Err(e) => {
            debug!("chat status unusable: {}", e);
            vec![FileEntry::Empty]
        }
    }
}

/// Turn the result of a delete call into the notice shown to the user
fn delete_notice(file_name: &str, result: &Result<(), ApiError>) -> Notice {
    match result {
        Ok(()) => Notice::Success(format!("File '{}' deleted successfully", file_name)),
        Err(e) => Notice::Failure(
            e.detail()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Failed to delete file '{}'", file_name)),
        ),
    }
}

#[derive(Debug, Default)]
pub struct FileList {
    entries: Vec<FileEntry>,
    loading: bool,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin_refresh(&mut self) {
        self.loading = true;
    }

    /// Replace the displayed rows and drop the loading flag
    pub fn apply(&mut self, entries: Vec<FileEntry>) {
        self.entries = entries;
        self.loading = false;
    }

    pub async fn refresh(&mut self, api: &BackendClient, token: &CancellationToken) {
        self.begin_refresh();
        let entries = fetch_entries(api, token).await;
        self.apply(entries);
    }

    /// Delete a file after the user confirmed it.
    ///
    /// Returns `None` when `confirmed` is false. On success the list is
    /// refreshed from the backend; on failure it is left as it was.
    pub async fn delete(
        &mut self,
        api: &BackendClient,
        file_name: &str,
        confirmed: bool,
        token: &CancellationToken,
    ) -> Option<Notice> {
        if !confirmed {
            return None;
        }

        let result = api.delete_file(file_name, token).await;
        let notice = self.finish_delete(file_name, &result);
        if notice.is_success() {
            self.refresh(api, token).await;
        }
        Some(notice)
    }

    /// Second half of a delete: the notice for `result`. A success notice
    /// means the caller owes exactly one refresh; a failure leaves the rows
    /// untouched.
    pub fn finish_delete(&self, file_name: &str, result: &Result<(), ApiError>) -> Notice {
        let notice = delete_notice(file_name, result);
        if notice.is_success() {
            info!(file_name, "file deleted");
        } else {
            warn!(file_name, "delete failed: {}", notice.text());
        }
        notice
    }
}

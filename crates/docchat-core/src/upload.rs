//! Single-file upload to the backend

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ApiError, BackendClient};
use crate::files::{FileList, Notice};

pub const UPLOAD_SUCCESS: &str = "File uploaded successfully!";
pub const UPLOAD_FAILURE: &str = "Failed to upload file";

/// Extensions the file picker suggests. Nothing is rejected client-side;
/// the backend decides what it accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = [".pdf", ".txt", ".doc", ".docx"];

#[derive(Debug, Default)]
pub struct UploadState {
    uploading: bool,
    /// Reserved for progress reporting; no transfer events feed it yet
    pub progress: Option<u8>,
}

impl UploadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn begin(&mut self) {
        self.uploading = true;
        self.progress = None;
    }

    /// Drop the in-flight flag and describe the outcome
    pub fn finish(&mut self, result: Result<(), ApiError>) -> Notice {
        self.uploading = false;
        match result {
            Ok(()) => Notice::Success(UPLOAD_SUCCESS.to_string()),
            Err(e) => {
                warn!("upload failed: {}", e);
                let detail = match &e {
                    ApiError::LocalFile { .. } => Some(e.to_string()),
                    _ => e.detail().map(str::to_string),
                };
                Notice::Failure(match detail {
                    Some(detail) => format!("{}: {}", UPLOAD_FAILURE, detail),
                    None => UPLOAD_FAILURE.to_string(),
                })
            }
        }
    }
}

/// Whether the picker hint would list this file
pub fn has_accepted_extension(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ACCEPTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Read the file and POST it as the `file` field
pub async fn send_file(
    api: &BackendClient,
    path: &Path,
    token: &CancellationToken,
) -> Result<(), ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::LocalFile {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    api.upload(&file_name, bytes, token).await?;
    info!(file_name = %file_name, "file uploaded");
    Ok(())
}

/// Upload `path` and refresh `files` when the backend accepted it.
///
/// No path means nothing was chosen: no request, no notice.
pub async fn upload(
    state: &mut UploadState,
    files: &mut FileList,
    api: &BackendClient,
    path: Option<&Path>,
    token: &CancellationToken,
) -> Option<Notice> {
    let path = path?;

    state.begin();
    let result = send_file(api, path, token).await;
    let notice = state.finish(result);

    if notice.is_success() {
        files.refresh(api, token).await;
    }
    Some(notice)
}

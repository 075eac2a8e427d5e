//! HTTP client for the document QA backend
//!
//! Every call takes a `CancellationToken`. Nothing in the app cancels
//! requests yet apart from shutdown, but callers can abort an in-flight call
//! without the contract changing.

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shown in place of a reply when the backend gives no usable detail
pub const GENERIC_CHAT_ERROR: &str = "Sorry, there was an error processing your request.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-2xx response, with the backend's `detail` when it sent one
    #[error("backend returned HTTP {status}")]
    Status { status: u16, detail: Option<String> },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("could not read {path}: {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Network-level failure, as opposed to an answer the backend refused
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Text shown to the user for a failed chat turn
    pub fn user_message(&self) -> String {
        self.detail().unwrap_or(GENERIC_CHAT_ERROR).to_string()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct FilesResponse {
    #[serde(default)]
    files: Vec<String>,
}

/// Ingestion state reported by `GET /chat/status`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub document_count: Option<u64>,
}

impl IndexStatus {
    pub fn is_initialized(&self) -> bool {
        self.status == "initialized"
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /chat` with `{query}`; returns the `response` field
    pub async fn chat(&self, query: &str, token: &CancellationToken) -> Result<String, ApiError> {
        let url = format!("{}/chat", self.base_url);
        debug!(%url, "sending chat query");

        let request = self.client.post(&url).json(&ChatRequest { query });
        let response = self.send(request, token).await?;
        let chat: ChatResponse = decode(response).await?;
        Ok(chat.response)
    }

    /// `POST /upload` with a single multipart field named `file`
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        token: &CancellationToken,
    ) -> Result<(), ApiError> {
        let url = format!("{}/upload", self.base_url);
        debug!(%url, file_name, size = bytes.len(), "uploading file");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        // The body is JSON, but nothing in it is consumed.
        self.send(self.client.post(&url).multipart(form), token).await?;
        Ok(())
    }

    /// `GET /upload/status`: the processed file names
    pub async fn upload_status(&self, token: &CancellationToken) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/upload/status", self.base_url);
        let response = self.send(self.client.get(&url), token).await?;
        let files: FilesResponse = decode(response).await?;
        Ok(files.files)
    }

    /// `GET /chat/status`: index state and document count
    pub async fn chat_status(&self, token: &CancellationToken) -> Result<IndexStatus, ApiError> {
        let url = format!("{}/chat/status", self.base_url);
        let response = self.send(self.client.get(&url), token).await?;
        decode(response).await
    }

    /// `DELETE /upload/{filename}` with the name percent-encoded
    pub async fn delete_file(&self, file_name: &str, token: &CancellationToken) -> Result<(), ApiError> {
        let url = format!(
            "{}/upload/{}",
            self.base_url,
            urlencoding::encode(file_name)
        );
        debug!(%url, "deleting file");

        self.send(self.client.delete(&url), token).await?;
        Ok(())
    }

    /// `GET /files`, the listing served by older backends
    pub async fn list_files(&self, token: &CancellationToken) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/files", self.base_url);
        let response = self.send(self.client.get(&url), token).await?;
        let files: FilesResponse = decode(response).await?;
        Ok(files.files)
    }

    async fn send(&self, request: RequestBuilder, token: &CancellationToken) -> Result<Response, ApiError> {
        let response = tokio::select! {
            _ = token.cancelled() => return Err(ApiError::Cancelled),
            result = request.send() => result.map_err(ApiError::Transport)?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        warn!(status = status.as_u16(), ?detail, "backend request failed");

        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await.map_err(ApiError::Transport)?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a string `detail` out of an error body. Structured details (lists of
/// validation errors) don't count.
fn extract_detail(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .filter(|detail| !detail.is_empty())
        .map(str::to_string)
}

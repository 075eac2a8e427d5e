// Mock document QA backend for integration tests
#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Canned answer for one route
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body: Some(body) }
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self { status, body: Some(body) }
    }

    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.body {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Routes {
    pub chat: Reply,
    pub upload: Reply,
    pub upload_status: Reply,
    pub chat_status: Reply,
    pub delete: Reply,
    pub files: Reply,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            chat: Reply::ok(json!({ "response": "ok" })),
            upload: Reply::ok(json!({ "message": "uploaded" })),
            upload_status: Reply::ok(json!({ "files": [] })),
            chat_status: Reply::ok(json!({ "status": "empty", "document_count": 0 })),
            delete: Reply::empty(204),
            files: Reply::ok(json!({ "files": [] })),
        }
    }
}

#[derive(Clone, Default)]
struct Recorder {
    hits: Arc<Mutex<HashMap<&'static str, usize>>>,
    chat_queries: Arc<Mutex<Vec<String>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    uploads: Arc<Mutex<Vec<UploadRecord>>>,
}

impl Recorder {
    fn hit(&self, route: &'static str) {
        *self.hits.lock().unwrap().entry(route).or_insert(0) += 1;
    }
}

#[derive(Clone, Debug)]
pub struct UploadRecord {
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Clone)]
struct MockState {
    routes: Arc<Routes>,
    recorder: Recorder,
}

async fn chat_handler(State(state): State<MockState>, Json(payload): Json<Value>) -> Reply {
    state.recorder.hit("chat");
    let query = payload["query"].as_str().unwrap_or_default().to_string();
    state.recorder.chat_queries.lock().unwrap().push(query);
    state.routes.chat.clone()
}

async fn upload_handler(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> Reply {
    state.recorder.hit("upload");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.recorder.uploads.lock().unwrap().push(UploadRecord {
        content_type,
        body: body.to_vec(),
    });
    state.routes.upload.clone()
}

async fn upload_status_handler(State(state): State<MockState>) -> Reply {
    state.recorder.hit("upload_status");
    state.routes.upload_status.clone()
}

async fn chat_status_handler(State(state): State<MockState>) -> Reply {
    state.recorder.hit("chat_status");
    state.routes.chat_status.clone()
}

async fn delete_handler(State(state): State<MockState>, Path(name): Path<String>) -> Reply {
    state.recorder.hit("delete");
    state.recorder.deleted.lock().unwrap().push(name);
    state.routes.delete.clone()
}

async fn files_handler(State(state): State<MockState>) -> Reply {
    state.recorder.hit("files");
    state.routes.files.clone()
}

pub struct MockBackend {
    addr: SocketAddr,
    recorder: Recorder,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockBackend {
    pub async fn start(routes: Routes) -> Self {
        let recorder = Recorder::default();
        let state = MockState {
            routes: Arc::new(routes),
            recorder: recorder.clone(),
        };

        let app = Router::new()
            .route("/chat", post(chat_handler))
            .route("/chat/status", get(chat_status_handler))
            .route("/upload", post(upload_handler))
            .route("/upload/status", get(upload_status_handler))
            .route("/upload/{name}", delete(delete_handler))
            .route("/files", get(files_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            recorder,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self, route: &str) -> usize {
        self.recorder.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn chat_queries(&self) -> Vec<String> {
        self.recorder.chat_queries.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.recorder.deleted.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.recorder.uploads.lock().unwrap().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A base URL nothing is listening on
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

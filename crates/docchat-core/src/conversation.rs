//! Conversation controller: the message list wired to persistence and the
//! chat endpoint.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ApiError, BackendClient};
use crate::history::HistoryStore;
use crate::state::{Conversation, Message, MessageDraft, PendingQuery};

pub struct ChatController {
    conversation: Conversation,
    store: HistoryStore,
}

impl ChatController {
    /// Read the persisted history once and start from it
    pub fn open(store: HistoryStore) -> Self {
        let conversation = Conversation::from_messages(store.load());
        Self { conversation, store }
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.conversation.set_loading(loading);
    }

    pub fn draft(&self) -> &str {
        &self.conversation.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.conversation.draft
    }

    /// Append a message and write the whole list back to the store
    pub fn append(&mut self, draft: MessageDraft) -> &Message {
        self.conversation.append(draft);
        self.persist();
        &self.conversation.messages()[self.conversation.len() - 1]
    }

    /// Drop every message and erase the persisted record
    pub fn clear(&mut self) {
        self.conversation.clear();
        if let Err(e) = self.store.erase() {
            warn!("failed to erase chat history: {}", e);
        }
        info!("chat history cleared");
    }

    /// Accept the current draft as a query. See [`Conversation::begin_submit`].
    pub fn begin_submit(&mut self) -> Option<PendingQuery> {
        let pending = self.conversation.begin_submit()?;
        self.persist();
        Some(pending)
    }

    pub fn finish_submit(&mut self, result: Result<String, ApiError>) {
        if let Err(e) = &result {
            warn!("chat query failed: {}", e);
        }
        self.conversation.finish_submit(result);
        self.persist();
    }

    /// Run one full chat turn for the current draft.
    ///
    /// Returns `false` without touching anything when the draft is blank or
    /// a query is already in flight.
    pub async fn submit(&mut self, api: &BackendClient, token: &CancellationToken) -> bool {
        let Some(pending) = self.begin_submit() else {
            return false;
        };

        let result = api.chat(&pending.query, token).await;
        self.finish_submit(result);
        true
    }

    /// Replace the draft with `query` and submit it
    pub async fn submit_query(
        &mut self,
        query: &str,
        api: &BackendClient,
        token: &CancellationToken,
    ) -> bool {
        if self.is_loading() {
            return false;
        }
        self.conversation.draft = query.to_string();
        self.submit(api, token).await
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(self.conversation.messages()) {
            warn!("failed to persist chat history: {}", e);
        }
    }
}

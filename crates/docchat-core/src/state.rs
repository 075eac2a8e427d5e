//! UI-agnostic conversation state
//!
//! `Conversation` is an owned value with pure transition functions. It knows
//! nothing about HTTP or persistence, so every ordering rule of a chat turn
//! can be checked without a terminal or a backend.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One conversational turn.
///
/// The field names match the persisted `chatHistory` record, where the role
/// is stored as the boolean `isUser`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    #[serde(rename = "isUser", with = "is_user")]
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Creation time as `HH:MM` in the local timezone
    pub fn local_time(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }
}

mod is_user {
    use super::Role;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(role: &Role, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*role == Role::User)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
        Ok(if bool::deserialize(deserializer)? {
            Role::User
        } else {
            Role::Assistant
        })
    }
}

/// A message that has not been accepted into the list yet.
///
/// Id and timestamp are assigned on append unless the draft carries them.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub text: String,
    pub role: Role,
    pub is_error: bool,
    pub id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageDraft {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Role::User, false)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text, Role::Assistant, false)
    }

    /// An assistant-role message standing in for a failed reply
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Role::Assistant, true)
    }

    fn new(text: impl Into<String>, role: Role, is_error: bool) -> Self {
        Self {
            text: text.into(),
            role,
            is_error,
            id: None,
            timestamp: None,
        }
    }
}

/// A chat query that has been accepted and is waiting for the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub query: String,
}

/// Ordered message list plus the draft input and loading flag of the chat pane
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    pub draft: String,
    is_loading: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Accept a draft into the list, filling in id and timestamp.
    pub fn append(&mut self, draft: MessageDraft) -> &Message {
        let timestamp = draft.timestamp.unwrap_or_else(Utc::now);
        let id = match draft.id {
            Some(id) => id,
            None => self.unique_id(timestamp),
        };

        self.messages.push(Message {
            id,
            text: draft.text,
            role: draft.role,
            timestamp,
            is_error: draft.is_error,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// First half of a chat turn: clear the draft, raise the loading flag
    /// and append the user message, in that order.
    ///
    /// Returns `None` (and changes nothing) when the draft is blank or a
    /// request is already in flight.
    pub fn begin_submit(&mut self) -> Option<PendingQuery> {
        if self.draft.trim().is_empty() || self.is_loading {
            return None;
        }

        let query = std::mem::take(&mut self.draft);
        self.is_loading = true;
        self.append(MessageDraft::user(query.clone()));

        Some(PendingQuery { query })
    }

    /// Second half of a chat turn: append the reply (or an error-flagged
    /// assistant message) and drop the loading flag.
    pub fn finish_submit(&mut self, result: Result<String, ApiError>) {
        let draft = match result {
            Ok(response) => MessageDraft::assistant(response),
            Err(err) => MessageDraft::error(err.user_message()),
        };
        self.append(draft);
        self.is_loading = false;
    }

    fn unique_id(&self, timestamp: DateTime<Utc>) -> String {
        let base = format!(
            "msg_{}",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        if !self.messages.iter().any(|m| m.id == base) {
            return base;
        }

        (1..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !self.messages.iter().any(|m| &m.id == candidate))
            .unwrap_or_else(|| base.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_append_assigns_id_from_timestamp() {
        let mut conversation = Conversation::new();
        let mut draft = MessageDraft::user("hello");
        draft.timestamp = Some(fixed_time());

        let message = conversation.append(draft);
        assert_eq!(message.id, "msg_2024-03-01T12:30:00.000Z");
        assert_eq!(message.role, Role::User);
        assert!(!message.is_error);
    }

    #[test]
    fn test_append_keeps_ids_unique() {
        let mut conversation = Conversation::new();
        for _ in 0..3 {
            let mut draft = MessageDraft::assistant("same instant");
            draft.timestamp = Some(fixed_time());
            conversation.append(draft);
        }

        let ids: Vec<&str> = conversation.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "msg_2024-03-01T12:30:00.000Z",
                "msg_2024-03-01T12:30:00.000Z-1",
                "msg_2024-03-01T12:30:00.000Z-2",
            ]
        );
    }

    #[test]
    fn test_begin_submit_orders_effects() {
        let mut conversation = Conversation::new();
        conversation.draft = "What is in the report?".to_string();

        let pending = conversation.begin_submit().unwrap();
        assert_eq!(pending.query, "What is in the report?");
        assert!(conversation.draft.is_empty());
        assert!(conversation.is_loading());
        assert_eq!(conversation.len(), 1);
        assert!(conversation.messages()[0].is_user());
        assert_eq!(conversation.messages()[0].text, "What is in the report?");
    }

    #[test]
    fn test_begin_submit_rejects_blank_draft() {
        let mut conversation = Conversation::new();
        conversation.draft = "   \n\t".to_string();

        assert!(conversation.begin_submit().is_none());
        assert!(!conversation.is_loading());
        assert!(conversation.is_empty());
        assert_eq!(conversation.draft, "   \n\t");
    }

    #[test]
    fn test_begin_submit_while_loading_is_noop() {
        let mut conversation = Conversation::new();
        conversation.set_loading(true);
        conversation.draft = "second question".to_string();

        assert!(conversation.begin_submit().is_none());
        assert!(conversation.is_empty());
        assert_eq!(conversation.draft, "second question");
    }

    #[test]
    fn test_finish_submit_success() {
        let mut conversation = Conversation::new();
        conversation.draft = "hi".to_string();
        conversation.begin_submit();
        conversation.finish_submit(Ok("hello there".to_string()));

        assert!(!conversation.is_loading());
        let reply = &conversation.messages()[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.text, "hello there");
        assert!(!reply.is_error);
    }

    #[test]
    fn test_finish_submit_failure_uses_detail() {
        let mut conversation = Conversation::new();
        conversation.draft = "hi".to_string();
        conversation.begin_submit();
        conversation.finish_submit(Err(ApiError::Status {
            status: 500,
            detail: Some("index not built".to_string()),
        }));

        assert!(!conversation.is_loading());
        let reply = &conversation.messages()[1];
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.is_error);
        assert_eq!(reply.text, "index not built");
    }

    #[test]
    fn test_finish_submit_failure_without_detail_is_generic() {
        let mut conversation = Conversation::new();
        conversation.draft = "hi".to_string();
        conversation.begin_submit();
        conversation.finish_submit(Err(ApiError::Status {
            status: 502,
            detail: None,
        }));

        assert_eq!(conversation.messages()[1].text, crate::api::GENERIC_CHAT_ERROR);
    }

    #[test]
    fn test_message_serializes_role_as_is_user() {
        let mut conversation = Conversation::new();
        let mut draft = MessageDraft::user("hi");
        draft.timestamp = Some(fixed_time());
        let message = conversation.append(draft).clone();

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["isUser"], serde_json::Value::Bool(true));
        assert_eq!(value["isError"], serde_json::Value::Bool(false));
        assert_eq!(value["text"], "hi");

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_missing_is_error_defaults_to_false() {
        let json = r#"{"id":"msg_1","text":"old","isUser":false,"timestamp":"2024-03-01T12:30:00Z"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert!(!message.is_error);
    }
}

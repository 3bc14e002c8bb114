use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// File reference carried by a turn. Immutable once attached; the upload
/// mechanics live outside this crate, only the shape travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub url: String,
    pub size: u64,
}

/// One message in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// Body of a streaming chat request. Built from a parameter snapshot at
/// submit time; an in-flight request never observes later parameter changes.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub group: String,
    pub user_id: String,
    pub timezone: String,
    pub messages: Vec<Turn>,
}

/// Body of a follow-up question request: the completed (user, assistant) pair.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestRequest {
    pub messages: Vec<Turn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestResponse {
    pub questions: Vec<String>,
}

/// Events carried on the SSE stream from the chat endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart { message: MessageStartData },
    ContentDelta { delta: ContentDelta },
    MessageDelta { delta: MessageDelta },
    MessageStop,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartData {
    pub id: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentDelta {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDelta {
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_wire_shape_is_camel_case() {
        let attachment = Attachment {
            name: "notes.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            url: "https://files.example/notes.pdf".to_string(),
            size: 1024,
        };
        let value = serde_json::to_value(&attachment).unwrap();
        assert!(value.get("contentType").is_some());
        assert!(value.get("content_type").is_none());
    }

    #[test]
    fn test_turn_without_attachments_omits_the_field() {
        let value = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(value.get("role").and_then(|v| v.as_str()), Some("user"));
        assert!(value.get("attachments").is_none());
    }

    #[test]
    fn test_unknown_stream_event_types_are_tolerated() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"rate_limit_notice","retry_after":3}"#).unwrap();
        assert!(matches!(event, StreamEvent::Unknown));
    }
}

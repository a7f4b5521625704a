use crate::FeedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Notification pushed by the server over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub title: String,
    pub content: String,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A decoded push frame together with the object exactly as the server sent
/// it, so listeners can be handed the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PushedNotification {
    pub event: NotificationEvent,
    pub raw: Value,
}

pub fn decode_push_frame(text: &str, max_frame_bytes: usize) -> Result<PushedNotification, FeedError> {
    let raw = text.trim();
    if raw.len() > max_frame_bytes {
        return Err(FeedError::MalformedPayload(format!(
            "frame exceeds max size: {} > {}",
            raw.len(),
            max_frame_bytes
        )));
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|err| FeedError::MalformedPayload(err.to_string()))?;
    if !value.is_object() {
        return Err(FeedError::MalformedPayload(
            "expected a JSON object".to_string(),
        ));
    }
    let event = NotificationEvent::deserialize(&value)
        .map_err(|err| FeedError::MalformedPayload(err.to_string()))?;
    Ok(PushedNotification { event, raw: value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn malformed(text: &str) -> bool {
        matches!(
            decode_push_frame(text, DEFAULT_MAX_FRAME_BYTES),
            Err(FeedError::MalformedPayload(_))
        )
    }

    #[test]
    fn decodes_server_push_and_keeps_raw_object() {
        let pushed = decode_push_frame(
            r#"{"user_id": 7, "title": "Added to team", "content": "You joined Platform"}"#,
            DEFAULT_MAX_FRAME_BYTES,
        )
        .expect("decode");
        assert_eq!(pushed.event.title, "Added to team");
        assert_eq!(pushed.event.content, "You joined Platform");
        assert_eq!(pushed.event.created_at, None);
        assert_eq!(pushed.event.kind, None);
        assert_eq!(
            pushed.raw,
            json!({"user_id": 7, "title": "Added to team", "content": "You joined Platform"})
        );
    }

    #[test]
    fn accepts_optional_metadata() {
        let pushed = decode_push_frame(
            r#"{"title": "X", "content": "Y", "createdAt": "2026-05-04T12:00:00Z", "kind": "team"}"#,
            DEFAULT_MAX_FRAME_BYTES,
        )
        .expect("decode");
        assert_eq!(pushed.event.kind.as_deref(), Some("team"));
        assert!(pushed.event.created_at.is_some());
    }

    #[test]
    fn rejects_frames_that_are_not_notification_objects() {
        assert!(malformed("not json"));
        assert!(malformed(""));
        assert!(malformed(r#"["title", "content"]"#));
        assert!(malformed(r#""just a string""#));
        assert!(malformed(r#"{"title": "only a title"}"#));
        assert!(malformed(r#"{"title": 5, "content": "Y"}"#));
        assert!(malformed(r#"{"title": "X", "content": "Y", "created_at": "yesterday"}"#));
    }

    #[test]
    fn rejects_oversized_frames() {
        let content = "a".repeat(128);
        let frame = format!(r#"{{"title": "X", "content": "{content}"}}"#);
        assert!(matches!(
            decode_push_frame(&frame, 64),
            Err(FeedError::MalformedPayload(message)) if message.contains("max size")
        ));
        assert!(decode_push_frame(&frame, DEFAULT_MAX_FRAME_BYTES).is_ok());
    }
}

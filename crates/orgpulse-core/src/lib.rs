use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod push_frame;

pub use push_frame::{decode_push_frame, NotificationEvent, PushedNotification};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Failure taxonomy of the realtime notification subsystem. None of these is
/// fatal: the worst degraded outcome is a stale unread badge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("session credential missing or rejected")]
    Auth,
    #[error("channel transport failed: {0}")]
    Transport(String),
    #[error("malformed push payload: {0}")]
    MalformedPayload(String),
    #[error("api request failed: {0}")]
    Fetch(String),
}

impl FeedError {
    pub fn is_auth(&self) -> bool {
        matches!(self, FeedError::Auth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "disconnected" => Ok(ConnectionState::Disconnected),
            "connecting" => Ok(ConnectionState::Connecting),
            "connected" => Ok(ConnectionState::Connected),
            other => Err(format!("Unknown connection state: {other}")),
        }
    }
}

/// Single-use credential for one channel handshake. Consumed by value so a
/// ticket cannot be reused across reconnects.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTicket(String);

impl ConnectionTicket {
    pub fn new(secret: impl Into<String>) -> Result<Self, FeedError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(FeedError::Fetch("connection ticket was empty".to_string()));
        }
        Ok(Self(secret))
    }

    pub fn into_secret(self) -> String {
        self.0
    }
}

impl fmt::Debug for ConnectionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConnectionTicket(***)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub ticket: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    #[serde(default)]
    pub unread_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
    #[serde(default)]
    pub total: u64,
}

impl NotificationPage {
    pub fn unread(&self) -> usize {
        self.notifications.iter().filter(|record| !record.is_read).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn connection_state_labels_round_trip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ] {
            assert_eq!(state.as_str().parse::<ConnectionState>(), Ok(state));
        }
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!("open".parse::<ConnectionState>().is_err());
    }

    #[test]
    fn unread_count_defaults_to_zero_when_missing() {
        let parsed: UnreadCountResponse = serde_json::from_str("{}").expect("parse");
        assert_eq!(parsed.unread_count, 0);
        let parsed: UnreadCountResponse =
            serde_json::from_str(r#"{"unread_count": 12}"#).expect("parse");
        assert_eq!(parsed.unread_count, 12);
    }

    #[test]
    fn negative_unread_count_is_rejected() {
        assert!(serde_json::from_str::<UnreadCountResponse>(r#"{"unread_count": -1}"#).is_err());
    }

    #[test]
    fn notification_page_accepts_offset_timestamps() {
        let raw = r#"{
            "notifications": [
                {"id": 4, "user_id": 9, "title": "Team created", "content": "Welcome",
                 "is_read": false, "created_at": "2026-03-01T10:15:00.123456+07:00"},
                {"id": 3, "title": "Project updated", "content": "Deadline moved",
                 "is_read": true, "created_at": "2026-02-28T08:00:00Z"}
            ],
            "total": 2
        }"#;
        let page: NotificationPage = serde_json::from_str(raw).expect("page");
        assert_eq!(page.total, 2);
        assert_eq!(page.unread(), 1);
        assert_eq!(page.notifications[0].user_id, Some(9));
        assert_eq!(
            page.notifications[1].created_at,
            Utc.with_ymd_and_hms(2026, 2, 28, 8, 0, 0).single().expect("ts")
        );
    }

    #[test]
    fn ticket_debug_output_hides_secret() {
        let ticket = ConnectionTicket::new("a1b2c3").expect("ticket");
        assert_eq!(format!("{ticket:?}"), "ConnectionTicket(***)");
        assert_eq!(ticket.into_secret(), "a1b2c3");
        assert!(matches!(
            ConnectionTicket::new("   "),
            Err(FeedError::Fetch(_))
        ));
    }

    #[test]
    fn page_request_clamps_limit() {
        assert_eq!(PageRequest::default(), PageRequest { limit: 10, offset: 0 });
        assert_eq!(PageRequest::new(0, 5).limit, 1);
        assert_eq!(PageRequest::new(500, 0).limit, MAX_PAGE_LIMIT);
    }
}

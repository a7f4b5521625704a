use chrono::{DateTime, Utc};
use orgpulse_core::NotificationEvent;
use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Error,
}

impl ToastLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastLevel::Success => "success",
            ToastLevel::Info => "info",
            ToastLevel::Error => "error",
        }
    }
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient notice; sinks are expected to drop it after `dismiss_after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub body: String,
    pub level: ToastLevel,
    /// Creation time carried by the push, or the receive time when absent.
    pub created_at: DateTime<Utc>,
    pub dismiss_after: Duration,
}

impl Toast {
    pub fn for_notification(event: &NotificationEvent, dismiss_after: Duration) -> Self {
        Self {
            title: event.title.clone(),
            body: event.content.clone(),
            level: ToastLevel::Info,
            created_at: event.created_at.unwrap_or_else(Utc::now),
            dismiss_after,
        }
    }
}

pub trait Toaster: Send + Sync {
    fn show(&self, toast: &Toast) -> io::Result<()>;
}

use crate::badge::{BadgeDisplay, BadgeView};
use crate::toast::{Toast, Toaster};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::{info, warn};

type SharedWriter = Mutex<Box<dyn Write + Send>>;

pub struct TerminalToaster {
    out: SharedWriter,
}

impl TerminalToaster {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Toaster for TerminalToaster {
    fn show(&self, toast: &Toast) -> io::Result<()> {
        info!(title = %toast.title, level = %toast.level, "toast_shown");
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "toast writer poisoned"))?;
        writeln!(
            out,
            "[{}] {} {}: {}",
            toast.level,
            toast.created_at.format("%Y-%m-%d %H:%M:%S"),
            toast.title,
            toast.body
        )?;
        out.flush()
    }
}

pub struct TerminalBadge {
    out: SharedWriter,
}

impl TerminalBadge {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl BadgeView for TerminalBadge {
    fn render(&self, display: BadgeDisplay) {
        let line = match display {
            BadgeDisplay::Hidden => "unread: -".to_string(),
            BadgeDisplay::Count(count) => format!("unread: {count}"),
        };
        let Ok(mut out) = self.out.lock() else {
            warn!("badge_writer_poisoned");
            return;
        };
        if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
            warn!("badge_render_failed");
        }
    }
}

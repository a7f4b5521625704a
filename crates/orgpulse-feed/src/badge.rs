use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeDisplay {
    Hidden,
    Count(u64),
}

impl BadgeDisplay {
    pub fn from_count(count: u64) -> Self {
        if count > 0 {
            BadgeDisplay::Count(count)
        } else {
            BadgeDisplay::Hidden
        }
    }
}

pub trait BadgeView: Send + Sync {
    fn render(&self, display: BadgeDisplay);
}

/// Owner of the unread count. Only a completed count fetch calls [`set`];
/// push events never touch it.
///
/// [`set`]: BadgeState::set
#[derive(Clone)]
pub struct BadgeState {
    count: Arc<watch::Sender<u64>>,
    view: Arc<dyn BadgeView>,
}

impl BadgeState {
    pub fn new(view: Arc<dyn BadgeView>) -> Self {
        let (count, _) = watch::channel(0);
        Self {
            count: Arc::new(count),
            view,
        }
    }

    /// Stores and renders under one write lock. Views must not call back into
    /// the badge from `render`.
    pub fn set(&self, count: u64) {
        self.count.send_modify(|current| {
            *current = count;
            self.view.render(BadgeDisplay::from_count(count));
        });
    }

    pub fn current(&self) -> u64 {
        *self.count.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.count.subscribe()
    }
}

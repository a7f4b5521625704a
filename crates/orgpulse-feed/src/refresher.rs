use crate::api::NotificationApi;
use crate::badge::BadgeState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Debounced fetch of the authoritative unread count. Holds at most one
/// pending timer; scheduling a new run aborts the previous one if it has not
/// fired yet.
pub struct CountRefresher<A> {
    api: Arc<A>,
    badge: BadgeState,
    pending: Option<JoinHandle<()>>,
}

impl<A> CountRefresher<A>
where
    A: NotificationApi + 'static,
{
    pub fn new(api: Arc<A>, badge: BadgeState) -> Self {
        Self {
            api,
            badge,
            pending: None,
        }
    }

    pub fn refresh(&mut self, delay: Duration) {
        if let Some(previous) = self.pending.take() {
            if !previous.is_finished() {
                debug!("unread_count_refresh_superseded");
            }
            previous.abort();
        }
        let api = Arc::clone(&self.api);
        let badge = self.badge.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so a later refresh cannot cancel a fetch already in flight.
            tokio::spawn(fetch_into(api, badge));
        }));
    }

    /// Immediate fetch that leaves any pending debounced run untouched.
    pub fn refresh_now(&self) {
        tokio::spawn(fetch_into(Arc::clone(&self.api), self.badge.clone()));
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<A> Drop for CountRefresher<A> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

async fn fetch_into<A: NotificationApi>(api: Arc<A>, badge: BadgeState) {
    match api.unread_count().await {
        Ok(count) => {
            debug!(count, "unread_count_refreshed");
            badge.set(count);
        }
        Err(err) => warn!("unread_count_refresh_failed: {err}"),
    }
}

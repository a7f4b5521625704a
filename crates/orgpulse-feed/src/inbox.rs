use crate::api::NotificationApi;
use crate::bus::BusEvent;
use orgpulse_core::{FeedError, NotificationRecord, PageRequest};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// List view over one page of notifications. Resynchronizes from the API
/// whenever the bus reports a new notification.
pub struct NotificationInbox<A> {
    api: Arc<A>,
    page: PageRequest,
    items: Vec<NotificationRecord>,
    total: u64,
}

impl<A: NotificationApi> NotificationInbox<A> {
    pub fn new(api: Arc<A>, page: PageRequest) -> Self {
        Self {
            api,
            page,
            items: Vec::new(),
            total: 0,
        }
    }

    pub async fn load(&mut self) -> Result<&[NotificationRecord], FeedError> {
        let page = self.api.list_notifications(self.page).await?;
        self.items = page.notifications;
        self.total = page.total;
        Ok(&self.items)
    }

    pub fn items(&self) -> &[NotificationRecord] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn unread(&self) -> usize {
        self.items.iter().filter(|record| !record.is_read).count()
    }

    pub fn find(&self, id: u64) -> Option<&NotificationRecord> {
        self.items.iter().find(|record| record.id == id)
    }

    /// Already-read records are left alone without a request.
    pub async fn mark_read(&mut self, id: u64) -> Result<(), FeedError> {
        if self.find(id).is_some_and(|record| record.is_read) {
            return Ok(());
        }
        self.api.mark_read(id).await?;
        if let Some(record) = self.items.iter_mut().find(|record| record.id == id) {
            record.is_read = true;
        }
        Ok(())
    }

    pub async fn mark_all_read(&mut self) -> Result<(), FeedError> {
        self.api.mark_all_read().await?;
        self.load().await.map(|_| ())
    }

    pub async fn delete(&mut self, id: u64) -> Result<(), FeedError> {
        self.api.delete_notification(id).await?;
        self.load().await.map(|_| ())
    }

    /// Loads once, then reloads on every `notificationReceived` until the
    /// bus closes. A lagged receiver also reloads since events were missed.
    pub async fn follow(&mut self, mut events: broadcast::Receiver<BusEvent>) {
        self.resync("initial").await;
        loop {
            match events.recv().await {
                Ok(BusEvent::NotificationReceived(_)) => self.resync("notification_received").await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "inbox_lagged");
                    self.resync("lagged").await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn resync(&mut self, cause: &str) {
        match self.load().await {
            Ok(items) => debug!(cause, items = items.len(), total = self.total, "inbox_synced"),
            Err(err) => warn!(cause, "inbox_sync_failed: {err}"),
        }
    }
}

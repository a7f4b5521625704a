use crate::api::NotificationApi;
use crate::bus::{BusEvent, NotificationBus};
use crate::refresher::CountRefresher;
use crate::toast::{Toast, Toaster};
use futures_util::FutureExt;
use orgpulse_core::PushedNotification;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Fans a pushed notification out to the toast sink, the count refresher and
/// the page-wide bus. The three side effects are independent of each other.
/// Pending broadcasts are owned by the dispatcher and dropped with it.
pub struct EventDispatcher<A> {
    toaster: Arc<dyn Toaster>,
    refresher: CountRefresher<A>,
    bus: NotificationBus,
    broadcasts: JoinSet<()>,
    refresh_delay: Duration,
    toast_ttl: Duration,
}

impl<A> EventDispatcher<A>
where
    A: NotificationApi + 'static,
{
    pub fn new(
        toaster: Arc<dyn Toaster>,
        refresher: CountRefresher<A>,
        bus: NotificationBus,
        refresh_delay: Duration,
        toast_ttl: Duration,
    ) -> Self {
        Self {
            toaster,
            refresher,
            bus,
            broadcasts: JoinSet::new(),
            refresh_delay,
            toast_ttl,
        }
    }

    pub fn dispatch(&mut self, pushed: PushedNotification) {
        let toast = Toast::for_notification(&pushed.event, self.toast_ttl);
        if let Err(err) = self.toaster.show(&toast) {
            warn!("toast_failed: {err}");
        }

        // Give the originating write time to become visible to the read path.
        self.refresher.refresh(self.refresh_delay);

        self.reap_broadcasts();
        let bus = self.bus.clone();
        let delay = self.refresh_delay;
        let payload = pushed.raw;
        self.broadcasts.spawn(async move {
            tokio::time::sleep(delay).await;
            let receivers = bus.publish(BusEvent::NotificationReceived(payload));
            debug!(receivers, "notification_broadcast");
        });
    }

    pub fn refresher(&self) -> &CountRefresher<A> {
        &self.refresher
    }

    pub fn pending_broadcasts(&self) -> usize {
        self.broadcasts.len()
    }

    fn reap_broadcasts(&mut self) {
        while let Some(Some(_)) = self.broadcasts.join_next().now_or_never() {}
    }
}

pub mod api;
pub mod badge;
pub mod bus;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod inbox;
pub mod logging;
pub mod refresher;
pub mod session;
pub mod terminal;
pub mod toast;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpApi, NotificationApi};
pub use badge::{BadgeDisplay, BadgeState, BadgeView};
pub use bus::{BusEvent, NotificationBus, NOTIFICATION_RECEIVED};
pub use channel::{ChannelConnector, ChannelEndpoint, ChannelFrame, ChannelLink, RealtimeChannel};
pub use config::FeedConfig;
pub use dispatcher::EventDispatcher;
pub use inbox::NotificationInbox;
pub use refresher::CountRefresher;
pub use session::{GateDecision, SessionStore, StaticSession};
pub use toast::{Toast, ToastLevel, Toaster};
pub use ws::WsConnector;

use orgpulse_core::{ConnectionState, FeedError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Everything needed to run the feed for one signed-in view. Nothing touches
/// the network until [`start`] passes the session gate.
///
/// [`start`]: NotificationFeed::start
pub struct NotificationFeed<A, C> {
    api: Arc<A>,
    connector: C,
    endpoint: ChannelEndpoint,
    session: Arc<dyn SessionStore>,
    toaster: Arc<dyn Toaster>,
    badge: BadgeState,
    bus: NotificationBus,
    config: FeedConfig,
}

impl<A, C> NotificationFeed<A, C>
where
    A: NotificationApi + 'static,
    C: ChannelConnector,
{
    pub fn new(
        api: Arc<A>,
        connector: C,
        endpoint: ChannelEndpoint,
        session: Arc<dyn SessionStore>,
        toaster: Arc<dyn Toaster>,
        badge_view: Arc<dyn BadgeView>,
    ) -> Self {
        Self {
            api,
            connector,
            endpoint,
            session,
            toaster,
            badge: BadgeState::new(badge_view),
            bus: NotificationBus::new(),
            config: FeedConfig::default(),
        }
    }

    pub fn with_config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn badge(&self) -> BadgeState {
        self.badge.clone()
    }

    pub fn bus(&self) -> NotificationBus {
        self.bus.clone()
    }

    /// Returns `None` when the gate refuses; in that case no ticket is
    /// requested and no channel is opened.
    pub fn start(self, route: &str) -> Option<FeedHandle> {
        let decision = session::evaluate(route, self.session.as_ref());
        if !decision.allows_start() {
            debug!(route, reason = decision.as_str(), "feed_not_started");
            return None;
        }
        info!(route, "feed_starting");

        let refresher = CountRefresher::new(Arc::clone(&self.api), self.badge.clone());
        let dispatcher = EventDispatcher::new(
            self.toaster,
            refresher,
            self.bus,
            self.config.refresh_delay,
            self.config.toast_ttl,
        );
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let channel = RealtimeChannel::new(
            self.api,
            self.connector,
            self.endpoint,
            dispatcher,
            state_tx,
            self.config,
        );
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(channel.run(async move {
            let _ = shutdown_rx.await;
        }));
        Some(FeedHandle {
            state,
            shutdown: Some(shutdown),
            task,
        })
    }
}

enum Finish {
    Signal,
    Stopped(Result<(), FeedError>),
}

/// Running feed. Dropping the handle stops the channel.
pub struct FeedHandle {
    state: watch::Receiver<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), FeedError>>,
}

impl FeedHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Runs until `signal` fires or the channel stops by itself.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), FeedError>
    where
        F: Future<Output = ()>,
    {
        let finish = tokio::select! {
            _ = signal => Finish::Signal,
            result = &mut self.task => Finish::Stopped(flatten(result)),
        };
        match finish {
            Finish::Signal => {
                self.shutdown();
                self.join().await
            }
            Finish::Stopped(result) => result,
        }
    }

    pub async fn join(self) -> Result<(), FeedError> {
        let FeedHandle { shutdown, task, .. } = self;
        let result = task.await;
        drop(shutdown);
        flatten(result)
    }
}

fn flatten(joined: Result<Result<(), FeedError>, tokio::task::JoinError>) -> Result<(), FeedError> {
    joined.unwrap_or_else(|err| Err(FeedError::Transport(format!("feed task ended abnormally: {err}"))))
}

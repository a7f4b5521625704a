use crate::api::NotificationApi;
use crate::config::FeedConfig;
use crate::dispatcher::EventDispatcher;
use orgpulse_core::{decode_push_frame, ConnectionState, ConnectionTicket, FeedError};
use std::future::{pending, Future};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

const TICKET_PARAM: &str = "ticket";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFrame {
    Text(String),
    Binary(Vec<u8>),
    Close(Option<String>),
}

/// One open connection. `next_frame` yields `None` once the stream has ended.
pub trait ChannelLink: Send + 'static {
    fn next_frame(&mut self) -> impl Future<Output = Option<Result<ChannelFrame, FeedError>>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

pub trait ChannelConnector: Send + Sync + 'static {
    type Link: ChannelLink;

    fn open(&self, url: Url) -> impl Future<Output = Result<Self::Link, FeedError>> + Send;
}

/// Websocket address of the push channel, without the per-attempt ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEndpoint {
    base: Url,
}

impl ChannelEndpoint {
    pub fn new(url: Url) -> Result<Self, FeedError> {
        match url.scheme() {
            "ws" | "wss" => Ok(Self { base: url }),
            other => Err(FeedError::Transport(format!(
                "channel url must use ws or wss, got {other}"
            ))),
        }
    }

    /// `http://host/api` becomes `ws://host/ws`, `https` becomes `wss`.
    pub fn from_api_base(api_base: &Url) -> Result<Self, FeedError> {
        let scheme = match api_base.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(FeedError::Transport(format!(
                    "cannot derive channel url from {other} api base"
                )))
            }
        };
        let mut url = api_base.clone();
        url.set_scheme(scheme)
            .map_err(|_| FeedError::Transport(format!("cannot derive channel url from {api_base}")))?;
        url.set_path("/ws");
        url.set_query(None);
        url.set_fragment(None);
        Self::new(url)
    }

    pub fn url(&self) -> &Url {
        &self.base
    }

    pub fn with_ticket(&self, ticket: ConnectionTicket) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair(TICKET_PARAM, &ticket.into_secret());
        url
    }
}

pub fn redact_ticket(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == TICKET_PARAM {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    let mut redacted = url.clone();
    if pairs.is_empty() {
        return redacted.to_string();
    }
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

enum Step {
    Shutdown,
    Poll,
    Frame(Option<Result<ChannelFrame, FeedError>>),
    ReconnectDue,
}

/// Actor owning the push connection and its state machine:
///
/// | from          | event                 | to            |
/// |---------------|-----------------------|---------------|
/// | Disconnected  | ticket issued         | Connecting    |
/// | Disconnected  | ticket rejected (401) | (stop)        |
/// | Connecting    | handshake done        | Connected     |
/// | Connecting    | handshake failed      | Disconnected  |
/// | Connected     | close / error / EOF   | Disconnected  |
///
/// Every transition into `Disconnected` other than auth rejection or shutdown
/// arms a single reconnect deadline.
pub struct RealtimeChannel<A, C> {
    api: Arc<A>,
    connector: C,
    endpoint: ChannelEndpoint,
    dispatcher: EventDispatcher<A>,
    state: watch::Sender<ConnectionState>,
    config: FeedConfig,
}

impl<A, C> RealtimeChannel<A, C>
where
    A: NotificationApi + 'static,
    C: ChannelConnector,
{
    pub fn new(
        api: Arc<A>,
        connector: C,
        endpoint: ChannelEndpoint,
        dispatcher: EventDispatcher<A>,
        state: watch::Sender<ConnectionState>,
        config: FeedConfig,
    ) -> Self {
        Self {
            api,
            connector,
            endpoint,
            dispatcher,
            state,
            config,
        }
    }

    /// Runs until `shutdown` resolves or the API rejects the session.
    pub async fn run<S>(mut self, shutdown: S) -> Result<(), FeedError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut poll = self.config.poll_interval.map(|period| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        if poll.is_none() {
            self.dispatcher.refresher().refresh_now();
        }

        let mut link: Option<C::Link> = None;
        let mut reconnect_at = Some(Instant::now());

        loop {
            if link.is_none() && reconnect_at.is_some_and(|at| at <= Instant::now()) {
                reconnect_at = None;
                let attempt = tokio::select! {
                    _ = &mut shutdown => None,
                    attempt = self.connect() => Some(attempt),
                };
                match attempt {
                    None => {
                        self.stop(None).await;
                        return Ok(());
                    }
                    Some(Ok(opened)) => link = Some(opened),
                    Some(Err(FeedError::Auth)) => {
                        self.set_state(ConnectionState::Disconnected);
                        info!("channel_auth_rejected");
                        return Err(FeedError::Auth);
                    }
                    Some(Err(err)) => reconnect_at = Some(self.on_close(&err.to_string())),
                }
                continue;
            }

            let step = tokio::select! {
                _ = &mut shutdown => Step::Shutdown,
                _ = next_tick(&mut poll) => Step::Poll,
                frame = next_frame(&mut link) => Step::Frame(frame),
                _ = wait_until(reconnect_at) => Step::ReconnectDue,
            };

            match step {
                Step::Shutdown => {
                    self.stop(link.take()).await;
                    return Ok(());
                }
                Step::Poll => self.dispatcher.refresher().refresh_now(),
                Step::ReconnectDue => {}
                Step::Frame(Some(Ok(ChannelFrame::Text(text)))) => self.on_text(&text),
                Step::Frame(Some(Ok(ChannelFrame::Binary(bytes)))) => {
                    warn!(len = bytes.len(), "push_frame_malformed: binary frame");
                }
                Step::Frame(Some(Ok(ChannelFrame::Close(reason)))) => {
                    close_link(&mut link).await;
                    let reason = reason.unwrap_or_else(|| "closed by server".to_string());
                    reconnect_at = Some(self.on_close(&reason));
                }
                Step::Frame(Some(Err(err))) => {
                    // Force-close so the link never lingers half-open.
                    close_link(&mut link).await;
                    reconnect_at = Some(self.on_close(&err.to_string()));
                }
                Step::Frame(None) => {
                    link = None;
                    reconnect_at = Some(self.on_close("stream ended"));
                }
            }
        }
    }

    async fn connect(&self) -> Result<C::Link, FeedError> {
        let ticket = self.api.connection_ticket().await?;
        let url = self.endpoint.with_ticket(ticket);
        self.set_state(ConnectionState::Connecting);
        info!(url = %redact_ticket(&url), "channel_connecting");
        let link = self.connector.open(url).await?;
        self.set_state(ConnectionState::Connected);
        info!("channel_open");
        Ok(link)
    }

    fn on_text(&mut self, text: &str) {
        match decode_push_frame(text, self.config.max_frame_bytes) {
            Ok(pushed) => {
                debug!(title = %pushed.event.title, "push_frame_received");
                self.dispatcher.dispatch(pushed);
            }
            Err(err) => warn!("push_frame_malformed: {err}"),
        }
    }

    fn on_close(&self, reason: &str) -> Instant {
        self.set_state(ConnectionState::Disconnected);
        warn!(
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "channel_closed: {reason}"
        );
        Instant::now() + self.config.reconnect_delay
    }

    async fn stop(&self, link: Option<C::Link>) {
        if let Some(mut link) = link {
            link.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("channel_shutdown");
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "channel_state");
        }
    }
}

async fn close_link<L: ChannelLink>(link: &mut Option<L>) {
    if let Some(mut open) = link.take() {
        open.close().await;
    }
}

async fn next_frame<L: ChannelLink>(link: &mut Option<L>) -> Option<Result<ChannelFrame, FeedError>> {
    match link {
        Some(open) => open.next_frame().await,
        None => pending().await,
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => pending().await,
    }
}

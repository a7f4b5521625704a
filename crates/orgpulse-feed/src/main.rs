use clap::Parser;
use orgpulse_core::{FeedError, PageRequest};
use orgpulse_feed::config::{POLL_INTERVAL_SECS, RECONNECT_DELAY_SECS};
use orgpulse_feed::logging::{init_logging, parse_bool_env};
use orgpulse_feed::terminal::{TerminalBadge, TerminalToaster};
use orgpulse_feed::{
    ChannelEndpoint, FeedConfig, HttpApi, NotificationFeed, NotificationInbox, SessionStore,
    StaticSession, WsConnector,
};
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080/api";
const DEFAULT_ROUTE: &str = "/";
const DEFAULT_LOG_DIR: &str = ".orgpulse/logs";
const EXIT_CONFIG: i32 = 2;
const EXIT_AUTH: i32 = 3;

#[derive(Parser, Debug)]
#[command(name = "orgpulse-feed")]
struct Args {
    #[arg(long, default_value = "")]
    api_base: String,
    #[arg(long, default_value = "")]
    ws_url: String,
    #[arg(long, default_value = "")]
    route: String,
    #[arg(long, default_value = "")]
    token: String,
    #[arg(long, default_value = "")]
    log_dir: String,
    #[arg(long, default_value_t = POLL_INTERVAL_SECS)]
    poll_interval: u64,
    #[arg(long, default_value_t = RECONNECT_DELAY_SECS)]
    reconnect_delay: u64,
}

#[derive(Clone, Debug)]
struct RuntimeConfig {
    api_base: String,
    ws_url: String,
    route: String,
    token: Option<String>,
    session_id: String,
    log_dir: String,
    log_stdout: bool,
    feed: FeedConfig,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = load_config(args);
    let _log_guard = init_logging(&config.log_dir, &config.session_id, config.log_stdout);

    let api_base = match Url::parse(&config.api_base) {
        Ok(url) => url,
        Err(err) => {
            error!("invalid api base {}: {err}", config.api_base);
            std::process::exit(EXIT_CONFIG);
        }
    };
    let endpoint = match resolve_endpoint(&config.ws_url, &api_base) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            error!("invalid channel url: {err}");
            std::process::exit(EXIT_CONFIG);
        }
    };
    let session: Arc<dyn SessionStore> = Arc::new(StaticSession::new(config.token.clone()));
    let api = match HttpApi::new(api_base, Arc::clone(&session)) {
        Ok(api) => Arc::new(api),
        Err(err) => {
            error!("{err}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let feed = NotificationFeed::new(
        Arc::clone(&api),
        WsConnector::default(),
        endpoint,
        session,
        Arc::new(TerminalToaster::stdout()),
        Arc::new(TerminalBadge::stdout()),
    )
    .with_config(config.feed.clone());
    let events = feed.bus().subscribe();

    let Some(handle) = feed.start(&config.route) else {
        info!(route = %config.route, "feed_idle");
        return;
    };

    let inbox_task = tokio::spawn(async move {
        let mut inbox = NotificationInbox::new(api, PageRequest::default());
        inbox.follow(events).await;
    });

    let result = handle
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    inbox_task.abort();

    match result {
        Ok(()) => info!("feed_stopped"),
        Err(FeedError::Auth) => {
            warn!("session rejected by the api; feed not running");
            std::process::exit(EXIT_AUTH);
        }
        Err(err) => {
            error!("feed_failed: {err}");
            std::process::exit(1);
        }
    }
}

fn load_config(args: Args) -> RuntimeConfig {
    let feed = FeedConfig::default()
        .with_poll_secs(args.poll_interval)
        .with_reconnect_secs(args.reconnect_delay);
    RuntimeConfig {
        api_base: resolve_value(&args.api_base, "ORGPULSE_API_BASE", DEFAULT_API_BASE),
        ws_url: resolve_value(&args.ws_url, "ORGPULSE_WS_URL", ""),
        route: resolve_value(&args.route, "ORGPULSE_ROUTE", DEFAULT_ROUTE),
        token: resolve_token(&args.token),
        session_id: resolve_session_id(),
        log_dir: resolve_value(&args.log_dir, "ORGPULSE_LOG_DIR", DEFAULT_LOG_DIR),
        log_stdout: resolve_log_stdout(),
        feed,
    }
}

/// Flag, then environment, then the built-in default.
fn resolve_value(flag: &str, key: &str, default: &str) -> String {
    if !flag.trim().is_empty() {
        return flag.trim().to_string();
    }
    if let Ok(value) = env::var(key) {
        if !value.trim().is_empty() {
            return value.trim().to_string();
        }
    }
    default.to_string()
}

fn resolve_token(flag: &str) -> Option<String> {
    let token = resolve_value(flag, "ORGPULSE_ACCESS_TOKEN", "");
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn resolve_session_id() -> String {
    if let Ok(value) = env::var("ORGPULSE_SESSION_ID") {
        if !value.trim().is_empty() {
            return value;
        }
    }
    format!("pid-{}", std::process::id())
}

fn resolve_log_stdout() -> bool {
    if let Ok(value) = env::var("ORGPULSE_LOG_STDOUT") {
        if let Some(parsed) = parse_bool_env(&value) {
            return parsed;
        }
    }
    false
}

fn resolve_endpoint(ws_url: &str, api_base: &Url) -> Result<ChannelEndpoint, FeedError> {
    if ws_url.is_empty() {
        return ChannelEndpoint::from_api_base(api_base);
    }
    let url = Url::parse(ws_url)
        .map_err(|err| FeedError::Transport(format!("invalid channel url {ws_url}: {err}")))?;
    ChannelEndpoint::new(url)
}

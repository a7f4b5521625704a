use crate::session::SessionStore;
use orgpulse_core::{
    ConnectionTicket, FeedError, NotificationPage, PageRequest, TicketResponse,
    UnreadCountResponse,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// REST collaborator. Authentication failures surface as [`FeedError::Auth`],
/// everything else as [`FeedError::Fetch`].
pub trait NotificationApi: Send + Sync {
    fn connection_ticket(&self) -> impl Future<Output = Result<ConnectionTicket, FeedError>> + Send;

    fn unread_count(&self) -> impl Future<Output = Result<u64, FeedError>> + Send;

    fn list_notifications(
        &self,
        page: PageRequest,
    ) -> impl Future<Output = Result<NotificationPage, FeedError>> + Send;

    fn mark_read(&self, id: u64) -> impl Future<Output = Result<(), FeedError>> + Send;

    fn mark_all_read(&self) -> impl Future<Output = Result<(), FeedError>> + Send;

    fn delete_notification(&self, id: u64) -> impl Future<Output = Result<(), FeedError>> + Send;
}

pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
    session: Arc<dyn SessionStore>,
}

impl HttpApi {
    pub fn new(base: Url, session: Arc<dyn SessionStore>) -> Result<Self, FeedError> {
        if base.cannot_be_a_base() {
            return Err(FeedError::Fetch(format!("api base is not a base url: {base}")));
        }
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| FeedError::Fetch(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base,
            session,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, FeedError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| FeedError::Fetch(format!("api base is not a base url: {}", self.base)))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, FeedError> {
        let token = self.session.access_token().ok_or(FeedError::Auth)?;
        debug!(%method, path = url.path(), "api_request");
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, FeedError> {
        let response = request
            .send()
            .await
            .map_err(|err| FeedError::Fetch(err.to_string()))?;
        classify_status(response.status())?;
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FeedError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| FeedError::Fetch(format!("invalid response body: {err}")))
    }
}

fn classify_status(status: StatusCode) -> Result<(), FeedError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FeedError::Auth);
    }
    if !status.is_success() {
        return Err(FeedError::Fetch(format!("http status {}", status.as_u16())));
    }
    Ok(())
}

impl NotificationApi for HttpApi {
    async fn connection_ticket(&self) -> Result<ConnectionTicket, FeedError> {
        let url = self.endpoint(&["connection-ticket"])?;
        let request = self.request(Method::POST, url)?;
        let response: TicketResponse = self.send_json(request).await?;
        ConnectionTicket::new(response.ticket)
    }

    async fn unread_count(&self) -> Result<u64, FeedError> {
        let url = self.endpoint(&["notifications", "unread-count"])?;
        let request = self.request(Method::GET, url)?;
        let response: UnreadCountResponse = self.send_json(request).await?;
        Ok(response.unread_count)
    }

    async fn list_notifications(&self, page: PageRequest) -> Result<NotificationPage, FeedError> {
        let mut url = self.endpoint(&["notifications"])?;
        url.query_pairs_mut()
            .append_pair("limit", &page.limit.to_string())
            .append_pair("offset", &page.offset.to_string());
        let request = self.request(Method::GET, url)?;
        self.send_json(request).await
    }

    async fn mark_read(&self, id: u64) -> Result<(), FeedError> {
        let id = id.to_string();
        let url = self.endpoint(&["notifications", &id, "read"])?;
        let request = self.request(Method::PUT, url)?;
        self.send(request).await.map(|_| ())
    }

    async fn mark_all_read(&self) -> Result<(), FeedError> {
        let url = self.endpoint(&["notifications", "read-all"])?;
        let request = self.request(Method::PUT, url)?;
        self.send(request).await.map(|_| ())
    }

    async fn delete_notification(&self, id: u64) -> Result<(), FeedError> {
        let id = id.to_string();
        let url = self.endpoint(&["notifications", &id])?;
        let request = self.request(Method::DELETE, url)?;
        self.send(request).await.map(|_| ())
    }
}

use crate::api::NotificationApi;
use crate::badge::{BadgeDisplay, BadgeView};
use crate::channel::{ChannelConnector, ChannelFrame, ChannelLink};
use crate::toast::{Toast, Toaster};
use chrono::{TimeZone, Utc};
use orgpulse_core::{ConnectionTicket, FeedError, NotificationPage, NotificationRecord, PageRequest};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

/// In-memory stand-in for the REST API. Unscripted count fetches return 0.
#[derive(Default)]
pub(crate) struct FakeApi {
    reject_tickets: AtomicBool,
    ticket_calls: AtomicUsize,
    ticket_failures: Mutex<VecDeque<FeedError>>,
    counts: Mutex<VecDeque<Result<u64, FeedError>>>,
    count_calls: Mutex<Vec<Instant>>,
    records: Mutex<Vec<NotificationRecord>>,
    list_calls: Mutex<Vec<PageRequest>>,
}

impl FakeApi {
    pub(crate) fn reject_tickets(&self) {
        self.reject_tickets.store(true, Ordering::SeqCst);
    }

    /// Queued failures are returned by the next ticket requests, in order.
    pub(crate) fn fail_tickets<I>(&self, failures: I)
    where
        I: IntoIterator<Item = FeedError>,
    {
        self.ticket_failures.lock().expect("ticket failures").extend(failures);
    }

    pub(crate) fn script_counts<I>(&self, counts: I)
    where
        I: IntoIterator<Item = Result<u64, FeedError>>,
    {
        self.counts.lock().expect("counts").extend(counts);
    }

    pub(crate) fn ticket_calls(&self) -> usize {
        self.ticket_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn count_calls(&self) -> Vec<Instant> {
        self.count_calls.lock().expect("count calls").clone()
    }

    pub(crate) fn seed_records(&self, records: Vec<NotificationRecord>) {
        *self.records.lock().expect("records") = records;
    }

    pub(crate) fn list_calls(&self) -> Vec<PageRequest> {
        self.list_calls.lock().expect("list calls").clone()
    }
}

pub(crate) fn record(id: u64, title: &str, is_read: bool) -> NotificationRecord {
    NotificationRecord {
        id,
        user_id: Some(1),
        title: title.to_string(),
        content: format!("{title} details"),
        is_read,
        created_at: Utc
            .timestamp_opt(1_767_225_600 + id as i64 * 60, 0)
            .single()
            .expect("timestamp"),
    }
}

impl NotificationApi for FakeApi {
    async fn connection_ticket(&self) -> Result<ConnectionTicket, FeedError> {
        let call = self.ticket_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_tickets.load(Ordering::SeqCst) {
            return Err(FeedError::Auth);
        }
        if let Some(failure) = self.ticket_failures.lock().expect("ticket failures").pop_front() {
            return Err(failure);
        }
        ConnectionTicket::new(format!("ticket-{call}"))
    }

    async fn unread_count(&self) -> Result<u64, FeedError> {
        self.count_calls.lock().expect("count calls").push(Instant::now());
        self.counts.lock().expect("counts").pop_front().unwrap_or(Ok(0))
    }

    async fn list_notifications(&self, page: PageRequest) -> Result<NotificationPage, FeedError> {
        self.list_calls.lock().expect("list calls").push(page);
        let records = self.records.lock().expect("records");
        let notifications = records
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok(NotificationPage {
            notifications,
            total: records.len() as u64,
        })
    }

    async fn mark_read(&self, id: u64) -> Result<(), FeedError> {
        let mut records = self.records.lock().expect("records");
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| FeedError::Fetch("http status 404".to_string()))?;
        record.is_read = true;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), FeedError> {
        for record in self.records.lock().expect("records").iter_mut() {
            record.is_read = true;
        }
        Ok(())
    }

    async fn delete_notification(&self, id: u64) -> Result<(), FeedError> {
        let mut records = self.records.lock().expect("records");
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(FeedError::Fetch("http status 404".to_string()));
        }
        Ok(())
    }
}

/// Server side of one fake connection.
pub(crate) struct FakeServer {
    frames: mpsc::UnboundedSender<Result<ChannelFrame, FeedError>>,
    closed: Arc<AtomicBool>,
}

impl FakeServer {
    pub(crate) fn push_text(&self, text: &str) {
        let _ = self.frames.send(Ok(ChannelFrame::Text(text.to_string())));
    }

    pub(crate) fn push_binary(&self, bytes: Vec<u8>) {
        let _ = self.frames.send(Ok(ChannelFrame::Binary(bytes)));
    }

    pub(crate) fn close(&self, reason: &str) {
        let _ = self
            .frames
            .send(Ok(ChannelFrame::Close(Some(reason.to_string()))));
    }

    pub(crate) fn fail(&self, message: &str) {
        let _ = self.frames.send(Err(FeedError::Transport(message.to_string())));
    }

    pub(crate) fn closed_by_client(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeLink {
    frames: mpsc::UnboundedReceiver<Result<ChannelFrame, FeedError>>,
    closed: Arc<AtomicBool>,
}

impl ChannelLink for FakeLink {
    async fn next_frame(&mut self) -> Option<Result<ChannelFrame, FeedError>> {
        self.frames.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.frames.close();
    }
}

#[derive(Clone)]
pub(crate) struct FakeConnector {
    opened: Arc<Mutex<Vec<(Url, Instant)>>>,
    refuse: Arc<AtomicUsize>,
    accepted: mpsc::UnboundedSender<FakeServer>,
}

pub(crate) fn fake_connector() -> (FakeConnector, mpsc::UnboundedReceiver<FakeServer>) {
    let (accepted, rx) = mpsc::unbounded_channel();
    let connector = FakeConnector {
        opened: Arc::new(Mutex::new(Vec::new())),
        refuse: Arc::new(AtomicUsize::new(0)),
        accepted,
    };
    (connector, rx)
}

impl FakeConnector {
    pub(crate) fn refuse_next(&self, attempts: usize) {
        self.refuse.store(attempts, Ordering::SeqCst);
    }

    /// Every attempted open, refused ones included.
    pub(crate) fn opened(&self) -> Vec<(Url, Instant)> {
        self.opened.lock().expect("opened").clone()
    }
}

impl ChannelConnector for FakeConnector {
    type Link = FakeLink;

    async fn open(&self, url: Url) -> Result<FakeLink, FeedError> {
        self.opened.lock().expect("opened").push((url, Instant::now()));
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(FeedError::Transport("handshake refused".to_string()));
        }
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.accepted.send(FakeServer {
            frames: frames_tx,
            closed: Arc::clone(&closed),
        });
        Ok(FakeLink {
            frames: frames_rx,
            closed,
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingToaster {
    shown: Mutex<Vec<(Toast, Instant)>>,
    fail_next: AtomicBool,
}

impl RecordingToaster {
    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn shown(&self) -> Vec<(Toast, Instant)> {
        self.shown.lock().expect("shown").clone()
    }
}

impl Toaster for RecordingToaster {
    fn show(&self, toast: &Toast) -> io::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "toast sink gone"));
        }
        self.shown
            .lock()
            .expect("shown")
            .push((toast.clone(), Instant::now()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingBadge {
    renders: Mutex<Vec<BadgeDisplay>>,
}

impl RecordingBadge {
    pub(crate) fn renders(&self) -> Vec<BadgeDisplay> {
        self.renders.lock().expect("renders").clone()
    }
}

impl BadgeView for RecordingBadge {
    fn render(&self, display: BadgeDisplay) {
        self.renders.lock().expect("renders").push(display);
    }
}

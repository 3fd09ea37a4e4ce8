//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tokio::sync::mpsc;

use crate::error::QueueError;
use crate::messaging::{Acknowledger, InboundMessage, MessageSource};
use crate::types::DeliverySettings;

pub const INGEST_PATH: &str = "/api/weather/logs";

/// In-process stand-in for the ingestion API.
///
/// Replies with `statuses[n]` to the n-th request, repeating the last entry
/// once the list runs out.
pub struct StubApi {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

#[derive(Clone)]
struct StubState {
    statuses: Arc<Vec<u16>>,
    delay: Duration,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
}

async fn ingest(State(state): State<StubState>, Json(body): Json<serde_json::Value>) -> StatusCode {
    let n = state.hits.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().unwrap().push(body);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let code = state
        .statuses
        .get(n)
        .or_else(|| state.statuses.last())
        .copied()
        .unwrap_or(200);
    StatusCode::from_u16(code).unwrap()
}

impl StubApi {
    pub async fn start(statuses: &[u16]) -> Self {
        Self::start_with_delay(statuses, Duration::ZERO).await
    }

    /// Like `start`, but every response is held back by `delay`.
    pub async fn start_with_delay(statuses: &[u16], delay: Duration) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            statuses: Arc::new(statuses.to_vec()),
            delay,
            hits: hits.clone(),
            bodies: bodies.clone(),
        };

        let app = Router::new().route(INGEST_PATH, post(ingest)).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
            bodies,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn settings(&self, max_attempts: u32, base_delay: Duration) -> DeliverySettings {
        delivery_settings(&self.base_url, max_attempts, base_delay)
    }
}

pub fn delivery_settings(base_url: &str, max_attempts: u32, base_delay: Duration) -> DeliverySettings {
    DeliverySettings {
        base_url: base_url.to_string(),
        endpoint_path: INGEST_PATH.to_string(),
        max_attempts,
        base_delay,
        request_timeout: Duration::from_secs(5),
    }
}

/// What happened to a message pushed through a `ChannelSource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Acked(u64),
    Rejected(u64),
}

struct RecordingAcker {
    delivery_tag: u64,
    settled: Arc<Mutex<Vec<Settled>>>,
}

#[async_trait]
impl Acknowledger for RecordingAcker {
    async fn ack(&self) -> Result<(), QueueError> {
        self.settled
            .lock()
            .unwrap()
            .push(Settled::Acked(self.delivery_tag));
        Ok(())
    }

    async fn reject(&self) -> Result<(), QueueError> {
        self.settled
            .lock()
            .unwrap()
            .push(Settled::Rejected(self.delivery_tag));
        Ok(())
    }
}

/// Message source fed from a tokio channel. Dropping the sender simulates
/// the broker closing the channel.
pub struct ChannelSource {
    receiver: mpsc::Receiver<Vec<u8>>,
    next_tag: u64,
    settled: Arc<Mutex<Vec<Settled>>>,
    closed: Arc<AtomicUsize>,
}

/// Observers kept by the test after the source moves into the loop.
pub struct SourceObserver {
    settled: Arc<Mutex<Vec<Settled>>>,
    closed: Arc<AtomicUsize>,
}

impl SourceObserver {
    pub fn settled(&self) -> Vec<Settled> {
        self.settled.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ChannelSource {
    pub fn new() -> (Self, mpsc::Sender<Vec<u8>>, SourceObserver) {
        let (sender, receiver) = mpsc::channel(16);
        let settled = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicUsize::new(0));
        (
            Self {
                receiver,
                next_tag: 1,
                settled: settled.clone(),
                closed: closed.clone(),
            },
            sender,
            SourceObserver { settled, closed },
        )
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn next_message(&mut self) -> Option<Result<InboundMessage, QueueError>> {
        let payload = self.receiver.recv().await?;
        let delivery_tag = self.next_tag;
        self.next_tag += 1;

        let acker = RecordingAcker {
            delivery_tag,
            settled: self.settled.clone(),
        };
        Some(Ok(InboundMessage::new(
            delivery_tag,
            false,
            payload,
            Box::new(acker),
        )))
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

//! Scripted collaborators shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::{Barrier, oneshot};

use crate::net::transport::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError, resolve_url};
use crate::state::session::SessionStore;
use crate::storage::{KeyValueStore, MemoryStore, StorageError};

/// API root every mock route is registered under.
pub const BASE_URL: &str = "http://api.test/api";

// =============================================================================
// MockTransport
// =============================================================================

enum MockReply {
    Ready(HttpResponse),
    Unreachable(String),
    Deferred(oneshot::Receiver<HttpResponse>),
}

impl MockReply {
    fn repeatable(&self) -> Option<Self> {
        match self {
            Self::Ready(r) => Some(Self::Ready(r.clone())),
            Self::Unreachable(e) => Some(Self::Unreachable(e.clone())),
            Self::Deferred(_) => None,
        }
    }
}

#[derive(Default)]
struct Route {
    queue: VecDeque<MockReply>,
    last: Option<MockReply>,
}

/// Routes requests by method and URL. Replies queued for a route are used
/// in order; once the queue is empty the last ready reply repeats.
/// Unrouted requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    gate: Option<Arc<Barrier>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every response until `parties` requests are in flight together.
    #[must_use]
    pub fn gated(parties: usize) -> Self {
        Self { gate: Some(Arc::new(Barrier::new(parties))), ..Self::default() }
    }

    /// Queue a JSON reply for `method` + `endpoint`.
    pub fn on(&self, method: Method, endpoint: &str, status: u16, body: serde_json::Value) {
        self.push(method, endpoint, MockReply::Ready(HttpResponse::new(status, body.to_string())));
    }

    /// Queue a raw-body reply.
    pub fn on_raw(&self, method: Method, endpoint: &str, status: u16, body: &str) {
        self.push(method, endpoint, MockReply::Ready(HttpResponse::new(status, body)));
    }

    /// Queue a connection failure.
    pub fn unreachable(&self, method: Method, endpoint: &str) {
        self.push(method, endpoint, MockReply::Unreachable("connection refused".to_owned()));
    }

    /// Queue a reply that arrives only when the returned sender fires.
    pub fn defer(&self, method: Method, endpoint: &str) -> oneshot::Sender<HttpResponse> {
        let (tx, rx) = oneshot::channel();
        self.push(method, endpoint, MockReply::Deferred(rx));
        tx
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests sent to `endpoint`, resolved the same way routes are.
    pub fn requests_to(&self, endpoint: &str) -> Vec<HttpRequest> {
        let url = resolve_url(BASE_URL, endpoint);
        self.requests().into_iter().filter(|r| r.url == url).collect()
    }

    fn push(&self, method: Method, endpoint: &str, reply: MockReply) {
        let key = (method, resolve_url(BASE_URL, endpoint));
        self.routes.lock().unwrap().entry(key).or_default().queue.push_back(reply);
    }

    fn next_reply(&self, method: &Method, url: &str) -> Option<MockReply> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.get_mut(&(method.clone(), url.to_owned()))?;
        match route.queue.pop_front() {
            Some(reply) => {
                if let Some(again) = reply.repeatable() {
                    route.last = Some(again);
                }
                Some(reply)
            }
            None => route.last.as_ref().and_then(MockReply::repeatable),
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.next_reply(&request.method, &request.url);
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        match reply {
            Some(MockReply::Ready(response)) => Ok(response),
            Some(MockReply::Unreachable(e)) => Err(TransportError::Request(e)),
            Some(MockReply::Deferred(rx)) => rx
                .await
                .map_err(|_| TransportError::Request("deferred reply dropped".to_owned())),
            None => Ok(HttpResponse::new(404, r#"{"error":"no route"}"#)),
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Storage whose every operation fails.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A restored session store over `transport` and `storage`.
pub async fn session_with(transport: &Arc<MockTransport>, storage: &Arc<MemoryStore>) -> SessionStore {
    SessionStore::restore(transport.clone(), storage.clone(), BASE_URL).await
}

/// Login response body for `{ id, name }` with `token`.
pub fn auth_body(id: i64, name: &str, token: &str) -> serde_json::Value {
    serde_json::json!({ "user": { "id": id, "name": name }, "access_token": token })
}

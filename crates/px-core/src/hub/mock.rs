//! In-memory hub transport for tests.
//!
//! [`MockTransport`] records every connect request and every session it
//! hands out. Tests script failures up front (`fail_next_connect`,
//! `queue_ping`, `reject`) and then drive inbound traffic through the
//! returned [`MockSession`]s (`push`, `close`).

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::{HubReceiver, HubRequest, HubSession, HubTransport, PING_METHOD};
use crate::error::HubError;

/// How a session answers `ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PingBehavior {
    #[default]
    Ok,
    /// Complete with an invocation error.
    Fail,
    /// Never complete.
    Hang,
}

/// A recorded `invoke` or `send`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
}

impl Call {
    pub fn new(method: &str, args: Vec<Value>) -> Self {
        Self { method: method.to_string(), args }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Script {
    connect_failures: VecDeque<HubError>,
    start_failures: VecDeque<HubError>,
    pings: VecDeque<PingBehavior>,
    requests: Vec<HubRequest>,
    sessions: Vec<Arc<MockSession>>,
}

/// Scriptable [`HubTransport`].
#[derive(Default, Clone)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
    rejected: Arc<Mutex<HashSet<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `connect` call fails with `err`. Calls queue up.
    pub fn fail_next_connect(&self, err: HubError) {
        lock(&self.script).connect_failures.push_back(err);
    }

    /// The next session handed out fails its `start` with `err`.
    pub fn fail_next_start(&self, err: HubError) {
        lock(&self.script).start_failures.push_back(err);
    }

    /// Ping behavior of the next session handed out. Sessions without a
    /// queued behavior answer pings successfully.
    pub fn queue_ping(&self, behavior: PingBehavior) {
        lock(&self.script).pings.push_back(behavior);
    }

    /// Every session rejects `invoke(method, ..)` from now on.
    pub fn reject(&self, method: &str) {
        lock(&self.rejected).insert(method.to_string());
    }

    pub fn accept(&self, method: &str) {
        lock(&self.rejected).remove(method);
    }

    /// Number of `connect` calls, successful or not.
    pub fn connect_count(&self) -> usize {
        lock(&self.script).requests.len()
    }

    pub fn requests(&self) -> Vec<HubRequest> {
        lock(&self.script).requests.clone()
    }

    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        lock(&self.script).sessions.clone()
    }

    /// Most recently created session.
    pub fn latest(&self) -> Option<Arc<MockSession>> {
        lock(&self.script).sessions.last().cloned()
    }
}

#[async_trait]
impl HubTransport for MockTransport {
    async fn connect(
        &self,
        request: HubRequest,
        receiver: Arc<dyn HubReceiver>,
    ) -> Result<Arc<dyn HubSession>, HubError> {
        let mut script = lock(&self.script);
        script.requests.push(request);
        if let Some(err) = script.connect_failures.pop_front() {
            return Err(err);
        }
        let session = Arc::new(MockSession {
            id: script.sessions.len(),
            receiver,
            rejected: Arc::clone(&self.rejected),
            start_failure: Mutex::new(script.start_failures.pop_front()),
            ping: Mutex::new(script.pings.pop_front().unwrap_or_default()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            invocations: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
        });
        script.sessions.push(Arc::clone(&session));
        Ok(session)
    }
}

/// Session produced by [`MockTransport`].
pub struct MockSession {
    id: usize,
    receiver: Arc<dyn HubReceiver>,
    rejected: Arc<Mutex<HashSet<String>>>,
    start_failure: Mutex<Option<HubError>>,
    ping: Mutex<PingBehavior>,
    started: AtomicBool,
    stopped: AtomicBool,
    invocations: Mutex<Vec<Call>>,
    sends: Mutex<Vec<Call>>,
}

impl MockSession {
    /// Position of this session in [`MockTransport::sessions`].
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn set_ping(&self, behavior: PingBehavior) {
        *lock(&self.ping) = behavior;
    }

    /// Invocations other than `ping`, in call order.
    pub fn invocations(&self) -> Vec<Call> {
        lock(&self.invocations).clone()
    }

    pub fn sends(&self) -> Vec<Call> {
        lock(&self.sends).clone()
    }

    /// Deliver a push event as if the hub sent it.
    pub fn push(&self, target: &str, args: Vec<Value>) {
        self.receiver.on_event(target, args);
    }

    /// Simulate an unsolicited close from the server side.
    pub fn close(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.receiver.connection_closed();
    }
}

#[async_trait]
impl HubSession for MockSession {
    async fn start(&self) -> Result<(), HubError> {
        if let Some(err) = lock(&self.start_failure).take() {
            return Err(err);
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, HubError> {
        if self.is_stopped() {
            return Err(HubError::Closed);
        }
        if method == PING_METHOD {
            let behavior = *lock(&self.ping);
            return match behavior {
                PingBehavior::Ok => Ok(Value::Null),
                PingBehavior::Fail => Err(HubError::Invocation("ping failed".to_string())),
                PingBehavior::Hang => std::future::pending().await,
            };
        }
        lock(&self.invocations).push(Call::new(method, args));
        if lock(&self.rejected).contains(method) {
            return Err(HubError::Invocation(format!("{method} not allowed")));
        }
        Ok(Value::Null)
    }

    async fn send(&self, method: &str, args: Vec<Value>) -> Result<(), HubError> {
        if self.is_stopped() {
            return Err(HubError::Closed);
        }
        lock(&self.sends).push(Call::new(method, args));
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

//! Realtime channel with subscription registry and auto-reconnect.
//!
//! A `RealtimeChannel` owns at most one live hub session. After `connect()` a
//! supervisor task runs until `disconnect()`:
//!
//! 1. Every `health_interval` it pings the live session; a failed or timed
//!    out ping moves the channel to Reconnecting.
//! 2. An unsolicited close of the live session does the same.
//! 3. On Reconnecting it retries with exponential backoff. Each fresh
//!    session must answer a probe ping before it is installed; then every
//!    remembered topic is re-sent and the channel is Connected again.
//!
//! Every session carries a generation number. Events and close
//! notifications from a session that is no longer live are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use super::notify::{ConnectionHandler, StateNotifier};
use super::registry::SubscriptionRegistry;
use super::{ChannelKind, ConnectionState, Dispatch, ReconnectPolicy};
use crate::context::ClientContext;
use crate::error::{ChannelError, HubError};
use crate::hub::{HubReceiver, HubRequest, HubSession, HubTransport, PING_METHOD};

/// Why a ping did not pass. Only ever logged.
#[derive(Debug, Error)]
enum ProbeFailure {
    #[error("ping failed: {0}")]
    Rejected(HubError),
    #[error("ping timed out after {0:?}")]
    TimedOut(Duration),
}

fn probe_outcome(
    result: Result<Result<Value, HubError>, tokio::time::error::Elapsed>,
    limit: Duration,
) -> Result<(), ProbeFailure> {
    match result {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(ProbeFailure::Rejected(e)),
        Err(_) => Err(ProbeFailure::TimedOut(limit)),
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct Supervisor {
    shutdown: watch::Sender<bool>,
    trigger: mpsc::Sender<()>,
}

struct Shared<C: ChannelKind> {
    state: ConnectionState,
    session: Option<Arc<dyn HubSession>>,
    registry: SubscriptionRegistry<C::Key, C::Kind>,
    extra: C::Extra,
    attempts: u32,
    notifier: StateNotifier,
    supervisor: Option<Supervisor>,
}

impl<C: ChannelKind> Shared<C> {
    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!("[{}] state {} -> {}", C::NAME, self.state, state);
            self.state = state;
            self.notifier.notify(state);
        }
    }

    /// Move to Reconnecting and wake the supervisor. A trigger that is
    /// already pending absorbs this one.
    fn request_reconnect(&mut self) {
        self.set_state(ConnectionState::Reconnecting);
        if let Some(sup) = &self.supervisor {
            let _ = sup.trigger.try_send(());
        }
    }

    fn cancel_supervisor(&mut self) {
        if let Some(sup) = self.supervisor.take() {
            sup.shutdown.send_replace(true);
        }
    }

    fn live_session(&self) -> Result<Arc<dyn HubSession>, ChannelError> {
        match (&self.session, self.state) {
            (Some(session), ConnectionState::Connected) => Ok(Arc::clone(session)),
            (_, state) => Err(ChannelError::NotConnected(state)),
        }
    }
}

struct Inner<C: ChannelKind> {
    hub_url: Url,
    context: Arc<ClientContext>,
    transport: Arc<dyn HubTransport>,
    policy: ReconnectPolicy,
    dispatcher: Arc<C::Dispatcher>,
    /// Generation of the installed session, 0 when none.
    live_generation: AtomicU64,
    next_generation: AtomicU64,
    shared: Mutex<Shared<C>>,
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Connection, subscription registry and recovery for one hub.
///
/// Cloning yields another handle to the same channel.
pub struct RealtimeChannel<C: ChannelKind> {
    inner: Arc<Inner<C>>,
}

impl<C: ChannelKind> Clone for RealtimeChannel<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: ChannelKind> RealtimeChannel<C> {
    pub fn new(
        hub_url: Url,
        context: Arc<ClientContext>,
        transport: Arc<dyn HubTransport>,
        policy: ReconnectPolicy,
        dispatcher: C::Dispatcher,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                hub_url,
                context,
                transport,
                policy,
                dispatcher: Arc::new(dispatcher),
                live_generation: AtomicU64::new(0),
                next_generation: AtomicU64::new(0),
                shared: Mutex::new(Shared {
                    state: ConnectionState::Disconnected,
                    session: None,
                    registry: SubscriptionRegistry::new(),
                    extra: C::Extra::default(),
                    attempts: 0,
                    notifier: StateNotifier::default(),
                    supervisor: None,
                }),
            }),
        }
    }

    pub fn dispatcher(&self) -> &C::Dispatcher {
        &self.inner.dispatcher
    }

    pub fn hub_url(&self) -> &Url {
        &self.inner.hub_url
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.inner.policy
    }

    /// Open a session and start the supervisor.
    ///
    /// Succeeds without doing anything when already Connected. When called
    /// while Reconnecting, the running recovery is abandoned first.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let inner = &self.inner;
        let mut shared = inner.shared.lock().await;

        match shared.state {
            ConnectionState::Connected | ConnectionState::Connecting => return Ok(()),
            ConnectionState::Reconnecting => {
                info!("[{}] connect requested during recovery, restarting", C::NAME);
                shared.cancel_supervisor();
                inner.live_generation.store(0, Ordering::SeqCst);
                if let Some(stale) = shared.session.take() {
                    stale.stop().await;
                }
            }
            ConnectionState::Disconnected => {}
        }

        shared.set_state(ConnectionState::Connecting);

        let Some(token) = inner.context.token() else {
            shared.set_state(ConnectionState::Disconnected);
            return Err(ChannelError::AuthTokenMissing);
        };

        info!("[{}] connecting to {}", C::NAME, inner.hub_url);
        let (session, generation) = match inner.open_session(&token).await {
            Ok(opened) => opened,
            Err(e) => {
                warn!("[{}] connection setup failed: {e}", C::NAME);
                shared.set_state(ConnectionState::Disconnected);
                return Err(ChannelError::ConnectionSetup(e));
            }
        };

        shared.session = Some(session);
        inner.live_generation.store(generation, Ordering::SeqCst);
        shared.attempts = 0;
        shared.set_state(ConnectionState::Connected);
        Inner::spawn_supervisor(inner, &mut shared);
        info!("[{}] connected", C::NAME);
        Ok(())
    }

    /// Stop the supervisor and the live session, then forget every
    /// subscription. No-op when already Disconnected.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        let mut shared = inner.shared.lock().await;
        if shared.state == ConnectionState::Disconnected {
            return;
        }

        shared.cancel_supervisor();
        inner.live_generation.store(0, Ordering::SeqCst);
        if let Some(session) = shared.session.take() {
            session.stop().await;
        }
        shared.set_state(ConnectionState::Disconnected);
        shared.registry.clear();
        shared.extra = C::Extra::default();
        shared.attempts = 0;
        info!("[{}] disconnected", C::NAME);
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.shared.lock().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Register the observer of state changes, replacing any previous one.
    pub async fn set_connection_handler(&self, handler: ConnectionHandler) {
        self.inner.shared.lock().await.notifier.set_handler(handler);
    }

    /// Invoke the subscribe method for `kind` and remember the topic.
    pub async fn subscribe(&self, key: C::Key, kind: C::Kind, args: Vec<Value>) -> Result<(), ChannelError> {
        self.subscribe_with(key, kind, args, |_| {}).await
    }

    /// Like [`subscribe`](Self::subscribe); `remember` updates the channel's
    /// extra state in the same critical section once the hub accepted.
    pub async fn subscribe_with<F>(
        &self,
        key: C::Key,
        kind: C::Kind,
        args: Vec<Value>,
        remember: F,
    ) -> Result<(), ChannelError>
    where
        F: FnOnce(&mut C::Extra) + Send,
    {
        let mut shared = self.inner.shared.lock().await;
        let session = shared.live_session()?;
        let method = C::subscribe_method(kind);
        session
            .invoke(method, args)
            .await
            .map_err(|source| ChannelError::RemoteRejected { method, source })?;
        shared.registry.insert(key, kind);
        remember(&mut shared.extra);
        debug!("[{}] {method} ok", C::NAME);
        Ok(())
    }

    /// Invoke the unsubscribe method for `kind` and forget the topic.
    pub async fn unsubscribe(&self, key: C::Key, kind: C::Kind, args: Vec<Value>) -> Result<(), ChannelError> {
        let mut shared = self.inner.shared.lock().await;
        let session = shared.live_session()?;
        let method = C::unsubscribe_method(kind);
        session
            .invoke(method, args)
            .await
            .map_err(|source| ChannelError::RemoteRejected { method, source })?;
        shared.registry.remove(&key, kind);
        debug!("[{}] {method} ok", C::NAME);
        Ok(())
    }

    /// Copy of the registry.
    pub async fn subscriptions(&self) -> BTreeMap<C::Key, BTreeSet<C::Kind>> {
        self.inner.shared.lock().await.registry.snapshot()
    }

    /// Keys that currently hold at least one topic.
    pub async fn subscribed_keys(&self) -> Vec<C::Key> {
        self.inner.shared.lock().await.registry.keys()
    }

    pub async fn extra(&self) -> C::Extra {
        self.inner.shared.lock().await.extra.clone()
    }

    /// Mutate the extra state under the channel lock.
    pub async fn update_extra<R>(&self, f: impl FnOnce(&mut C::Extra) -> R) -> R {
        f(&mut self.inner.shared.lock().await.extra)
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle and supervisor
// ---------------------------------------------------------------------------

impl<C: ChannelKind> Inner<C> {
    /// Construct and start a session tagged with a new generation.
    ///
    /// The generation is published before the transport connects so pushes
    /// sent right after `start` are dispatched. Callers that end up not
    /// installing the session must [`retire`](Self::retire) it.
    async fn open_session(self: &Arc<Self>, token: &str) -> Result<(Arc<dyn HubSession>, u64), HubError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let receiver: Arc<dyn HubReceiver> = Arc::new(SessionReceiver {
            inner: Arc::downgrade(self),
            generation,
            runtime: Handle::current(),
        });
        self.live_generation.store(generation, Ordering::SeqCst);
        let session = match self.transport.connect(HubRequest::new(&self.hub_url, token), receiver).await {
            Ok(session) => session,
            Err(e) => {
                self.retire(generation);
                return Err(e);
            }
        };
        if let Err(e) = session.start().await {
            self.retire(generation);
            session.stop().await;
            return Err(e);
        }
        Ok((session, generation))
    }

    fn is_live(&self, generation: u64) -> bool {
        self.live_generation.load(Ordering::SeqCst) == generation
    }

    /// Stop routing events of `generation`, unless a newer session took over.
    fn retire(&self, generation: u64) {
        let _ = self.live_generation.compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn spawn_supervisor(self: &Arc<Self>, shared: &mut Shared<C>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (trigger_tx, trigger_rx) = mpsc::channel::<()>(1);
        shared.supervisor = Some(Supervisor { shutdown: shutdown_tx, trigger: trigger_tx });
        tokio::spawn(supervise(Arc::downgrade(self), self.policy, shutdown_rx, trigger_rx));
    }

    /// Ping the live session; on failure hand over to the reconnect loop.
    async fn check_health(&self, shutdown: &mut watch::Receiver<bool>) {
        let (session, generation) = {
            let shared = self.shared.lock().await;
            match (&shared.session, shared.state) {
                (Some(session), ConnectionState::Connected) => {
                    (Arc::clone(session), self.live_generation.load(Ordering::SeqCst))
                }
                _ => return,
            }
        };

        let limit = self.policy.health_timeout;
        let result = tokio::select! {
            _ = shutdown.changed() => return,
            r = tokio::time::timeout(limit, session.invoke(PING_METHOD, Vec::new())) => r,
        };
        let Err(failure) = probe_outcome(result, limit) else {
            return;
        };

        let mut shared = self.shared.lock().await;
        if *shutdown.borrow() {
            return;
        }
        if shared.state == ConnectionState::Connected && self.is_live(generation) {
            warn!("[{}] health check failed: {failure}", C::NAME);
            shared.request_reconnect();
        }
    }

    /// Retry until a fresh session passes its probe, or until cancelled.
    async fn reconnect(self: &Arc<Self>, shutdown: &mut watch::Receiver<bool>) {
        loop {
            let attempt = {
                let mut shared = self.shared.lock().await;
                if *shutdown.borrow() || shared.state != ConnectionState::Reconnecting {
                    return;
                }
                shared.attempts = shared.attempts.saturating_add(1);
                shared.attempts
            };

            let delay = self.policy.delay_for_attempt(attempt);
            info!("[{}] reconnect attempt {attempt} in {delay:?}", C::NAME);
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut shared = self.shared.lock().await;
                if *shutdown.borrow() || shared.state != ConnectionState::Reconnecting {
                    return;
                }
                self.live_generation.store(0, Ordering::SeqCst);
                if let Some(stale) = shared.session.take() {
                    stale.stop().await;
                }
            }

            let Some(token) = self.context.token() else {
                warn!("[{}] no auth token, cannot reconnect yet", C::NAME);
                continue;
            };

            let (session, generation) = match self.open_session(&token).await {
                Ok(opened) => opened,
                Err(e) => {
                    warn!("[{}] reconnect attempt {attempt} failed: {e}", C::NAME);
                    continue;
                }
            };

            let limit = self.policy.probe_timeout;
            let result = tokio::select! {
                _ = shutdown.changed() => {
                    self.retire(generation);
                    session.stop().await;
                    return;
                }
                r = tokio::time::timeout(limit, session.invoke(PING_METHOD, Vec::new())) => r,
            };
            if let Err(failure) = probe_outcome(result, limit) {
                warn!("[{}] reconnect attempt {attempt} probe failed: {failure}", C::NAME);
                self.retire(generation);
                session.stop().await;
                continue;
            }

            let mut shared = self.shared.lock().await;
            if *shutdown.borrow() || shared.state != ConnectionState::Reconnecting {
                self.retire(generation);
                session.stop().await;
                return;
            }
            shared.session = Some(Arc::clone(&session));
            self.live_generation.store(generation, Ordering::SeqCst);
            shared.attempts = 0;
            shared.set_state(ConnectionState::Connected);
            let resent = Self::replay(&shared, session.as_ref()).await;
            info!("[{}] reconnected after {attempt} attempt(s), {resent} topic(s) resent", C::NAME);
            return;
        }
    }

    /// Re-send every remembered topic on `session`. Send failures are logged.
    async fn replay(shared: &Shared<C>, session: &dyn HubSession) -> usize {
        let mut resent = 0;
        for (key, kind) in shared.registry.topics() {
            let Some(args) = C::replay_args(key, kind, &shared.extra) else {
                continue;
            };
            let method = C::subscribe_method(kind);
            match session.send(method, args).await {
                Ok(()) => resent += 1,
                Err(e) => warn!("[{}] resubscribe {method} {key:?} failed: {e}", C::NAME),
            }
        }
        resent
    }

    /// Close notification from the session of `generation`.
    async fn on_session_closed(&self, generation: u64) {
        let mut shared = self.shared.lock().await;
        if shared.state == ConnectionState::Connected && self.is_live(generation) {
            warn!("[{}] connection closed by hub", C::NAME);
            shared.request_reconnect();
        }
    }
}

async fn supervise<C: ChannelKind>(
    inner: Weak<Inner<C>>,
    policy: ReconnectPolicy,
    mut shutdown: watch::Receiver<bool>,
    mut trigger: mpsc::Receiver<()>,
) {
    let period = policy.health_period();
    let mut health = tokio::time::interval_at(Instant::now() + period, period);
    health.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = health.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                inner.check_health(&mut shutdown).await;
            }
            Some(()) = trigger.recv() => {
                let Some(inner) = inner.upgrade() else { break };
                inner.reconnect(&mut shutdown).await;
                health.reset();
            }
        }
        if *shutdown.borrow() {
            break;
        }
    }
    debug!("[{}] supervisor stopped", C::NAME);
}

// ---------------------------------------------------------------------------
// Inbound path
// ---------------------------------------------------------------------------

struct SessionReceiver<C: ChannelKind> {
    inner: Weak<Inner<C>>,
    generation: u64,
    /// Runtime that opened the session; close reports may come from a
    /// transport thread outside it.
    runtime: Handle,
}

impl<C: ChannelKind> HubReceiver for SessionReceiver<C> {
    fn on_event(&self, target: &str, args: Vec<Value>) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if !inner.is_live(self.generation) {
            debug!("[{}] dropping {target} from stale session", C::NAME);
            return;
        }
        inner.dispatcher.dispatch(target, args);
    }

    fn connection_closed(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let generation = self.generation;
        self.runtime.spawn(async move { inner.on_session_closed(generation).await });
    }
}

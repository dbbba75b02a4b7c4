//! Per-plugin sessions.
//!
//! A session is host-side bookkeeping for one configured plugin identity,
//! independent of any transport instance. Sessions are created at bootstrap
//! and destroyed only at host shutdown; the transport may attach and detach
//! many times in between (plugin restarts, reconnects).
//!
//! Invariants enforced here:
//! - at most one live transport per session; attaching a new one cancels the
//!   prior one,
//! - the send queue is FIFO and bounded; overflow drops the new message and
//!   never blocks the caller,
//! - every pending-reply entry is removed exactly once: by the matching
//!   result, by timeout discard, or by close,
//! - close wakes all pending slots as cancelled and joins its tasks under a
//!   fixed budget.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use strata_core::PluginId;
use strata_proto::{
    EventResult, EventType, HostToPlugin, PluginHello, PluginInfo, PluginPayload, PluginToHost,
};

use crate::inbound::InboundRouter;
use crate::transport::{FrameSink, FrameSource, FrameStream, TransportError};

/// Depth of the bounded outbound queue.
pub(crate) const SEND_QUEUE_DEPTH: usize = 64;

/// How long `close` waits for the session tasks to finish.
const CLOSE_JOIN_BUDGET: Duration = Duration::from_secs(5);

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    /// Created from config; nothing heard from the plugin yet.
    Spawned,
    /// A transport identified this plugin id.
    Connected,
    /// A Subscribe has been received; eligible for dispatch.
    Ready,
    /// Close in progress.
    Draining,
    /// Closed for good.
    Closed,
}

/// What a reply slot resolved to.
pub(crate) enum ReplyOutcome {
    /// The plugin answered in time.
    Result(EventResult),
    /// The deadline passed first.
    Timeout,
    /// The slot was torn down (session close or discard).
    Cancelled,
}

pub(crate) struct Session {
    id: PluginId,
    state: Mutex<SessionState>,
    hello: Mutex<Option<PluginHello>>,
    subscriptions: RwLock<HashSet<EventType>>,
    /// Set once the first Subscribe arrives; persists across reconnects.
    ready: AtomicBool,
    connected: AtomicBool,
    closed: AtomicBool,
    /// Incremented per attach so a stale transport's loops cannot demote a
    /// newer transport.
    generation: AtomicU64,
    outbound: Mutex<Option<mpsc::Sender<HostToPlugin>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<EventResult>>>,
    transport: Mutex<TransportTasks>,
    root: CancellationToken,
}

#[derive(Default)]
struct TransportTasks {
    cancel: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    pub(crate) fn new(id: PluginId, root: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(SessionState::Spawned),
            hello: Mutex::new(None),
            subscriptions: RwLock::new(HashSet::new()),
            ready: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            outbound: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            transport: Mutex::new(TransportTasks::default()),
            root,
        })
    }

    pub(crate) fn id(&self) -> &PluginId {
        &self.id
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Record that a transport's first frame identified this session.
    pub(crate) fn mark_identified(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == SessionState::Spawned {
            *state = SessionState::Connected;
        }
    }

    /// Attach a transport, replacing any prior one, and start the send and
    /// receive loops. `greeting` is guaranteed to be the first frame written
    /// on the new transport.
    pub(crate) fn attach(
        self: &Arc<Self>,
        stream: FrameStream,
        inbound: Arc<InboundRouter>,
        greeting: HostToPlugin,
    ) {
        if self.closed.load(Ordering::Acquire) {
            debug!(plugin_id = %self.id, "ignoring transport attach on closed session");
            return;
        }

        let (sink, source) = stream.split();
        let cancel = self.root.child_token();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let (tx, rx) = mpsc::channel(SEND_QUEUE_DEPTH);

        {
            let mut transport = self.transport.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(prev) = transport.cancel.take() {
                info!(plugin_id = %self.id, "replacing live transport");
                prev.cancel();
            }
            transport.cancel = Some(cancel.clone());
        }

        // The greeting goes onto the fresh, empty queue before the sender is
        // published, so it precedes anything enqueued concurrently.
        let _ = tx.try_send(greeting);
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        self.connected.store(true, Ordering::Release);
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = if self.ready.load(Ordering::Acquire) {
                SessionState::Ready
            } else {
                SessionState::Connected
            };
        }

        let send_task = tokio::spawn(send_loop(Arc::clone(self), generation, rx, sink));
        let recv_task = tokio::spawn(recv_loop(
            Arc::clone(self),
            generation,
            cancel,
            source,
            inbound,
        ));
        let mut transport = self.transport.lock().unwrap_or_else(PoisonError::into_inner);
        transport.tasks.push(send_task);
        transport.tasks.push(recv_task);
    }

    /// Queue an outbound message. Never blocks; drops (with a log line) when
    /// the session is closed, disconnected, or the queue is full.
    pub(crate) fn enqueue(&self, msg: HostToPlugin) {
        if self.closed.load(Ordering::Acquire) {
            debug!(plugin_id = %self.id, reason = "closed", "dropping message");
            return;
        }
        let sender = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            debug!(plugin_id = %self.id, reason = "disconnected", "dropping message");
            return;
        };
        match sender.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(plugin_id = %self.id, reason = "queue full", "dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(plugin_id = %self.id, reason = "disconnected", "dropping message");
            }
        }
    }

    /// Register a reply slot for `event_id`. Must happen before the event is
    /// enqueued so a fast plugin cannot answer into a missing slot.
    pub(crate) fn expect(&self, event_id: &str) -> oneshot::Receiver<EventResult> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_id.to_string(), tx);
        rx
    }

    /// Wait on a reply slot until `deadline`.
    pub(crate) async fn await_reply(
        rx: oneshot::Receiver<EventResult>,
        deadline: Instant,
    ) -> ReplyOutcome {
        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(result)) => ReplyOutcome::Result(result),
            Ok(Err(_)) => ReplyOutcome::Cancelled,
            Err(_) => ReplyOutcome::Timeout,
        }
    }

    /// Drop the reply slot for `event_id`, if still present. Idempotent.
    pub(crate) fn discard(&self, event_id: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(event_id);
    }

    /// Resolve the reply slot matching this result.
    pub(crate) fn deliver_result(&self, result: EventResult) {
        let slot = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&result.event_id);
        match slot {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => {
                warn!(plugin_id = %self.id, event_id = %result.event_id, "unexpected event result");
            }
        }
    }

    /// Replace the subscription set and mark the session ready.
    pub(crate) fn update_subscriptions(&self, events: Vec<EventType>) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let set: HashSet<EventType> = events.into_iter().collect();
        debug!(plugin_id = %self.id, count = set.len(), "subscriptions updated");
        *self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner) = set;
        self.ready.store(true, Ordering::Release);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SessionState::Connected) {
            *state = SessionState::Ready;
        }
    }

    /// Whether this session should receive events of type `ty`: it has seen
    /// a Subscribe, and the current set contains `ty` or the all-sentinel.
    pub(crate) fn has_subscription(&self, ty: EventType) -> bool {
        if !self.ready.load(Ordering::Acquire) {
            return false;
        }
        let set = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        set.contains(&EventType::All) || set.contains(&ty)
    }

    /// Store the plugin's Hello. Re-sent Hellos overwrite.
    pub(crate) fn set_hello(&self, hello: PluginHello) {
        *self.hello.lock().unwrap_or_else(PoisonError::into_inner) = Some(hello);
    }

    pub(crate) fn hello(&self) -> Option<PluginHello> {
        self.hello
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A roster entry describing this session.
    pub(crate) fn info(&self) -> PluginInfo {
        let hello = self.hello();
        PluginInfo {
            id: self.id.clone(),
            name: hello.as_ref().map(|h| h.name.clone()),
            version: hello.as_ref().map(|h| h.version.clone()),
            api_version: hello.map(|h| h.api_version),
            ready: self.is_ready(),
        }
    }

    /// Close the session: drain the send queue, drop the transport, wake
    /// every pending reply slot as cancelled, and join the session tasks.
    /// Idempotent.
    pub(crate) async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SessionState::Draining;
        self.connected.store(false, Ordering::Release);

        // Dropping the sender lets the send loop flush what is queued and
        // exit on its own; the receive loop is cancelled outright.
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let (cancel, tasks) = {
            let mut transport = self.transport.lock().unwrap_or_else(PoisonError::into_inner);
            (transport.cancel.take(), std::mem::take(&mut transport.tasks))
        };
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if !tasks.is_empty() {
            let joined = futures::future::join_all(tasks);
            if tokio::time::timeout(CLOSE_JOIN_BUDGET, joined).await.is_err() {
                warn!(plugin_id = %self.id, "timeout waiting for session tasks to finish");
            }
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SessionState::Closed;
        debug!(plugin_id = %self.id, "session closed");
    }

    /// Demote to disconnected after a transport failure, unless a newer
    /// transport has already been attached.
    fn disconnect_if_current(&self, generation: u64) {
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.connected.store(false, Ordering::Release);
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = None;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, SessionState::Ready | SessionState::Connected) {
            *state = SessionState::Connected;
        }
    }

    fn log_transport_failure(&self, direction: &str, err: &TransportError) {
        if err.is_expected() {
            info!(plugin_id = %self.id, direction, reason = %err, "plugin transport disconnected");
        } else {
            error!(plugin_id = %self.id, direction, error = %err, "plugin transport failed");
        }
    }
}

/// Drains the outbound queue onto the wire, preserving enqueue order. Exits
/// when the queue's sender is dropped (close/disconnect) or a write fails.
async fn send_loop(
    session: Arc<Session>,
    generation: u64,
    mut rx: mpsc::Receiver<HostToPlugin>,
    mut sink: FrameSink,
) {
    while let Some(msg) = rx.recv().await {
        let payload = match strata_proto::encode(&msg) {
            Ok(payload) => payload,
            Err(e) => {
                error!(plugin_id = %session.id(), error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = sink.send(&payload).await {
            session.log_transport_failure("send", &e);
            session.disconnect_if_current(generation);
            return;
        }
    }
}

/// Reads frames, decodes them, and routes payloads: event results into this
/// session's pending table, everything else to the host's inbound router.
/// Malformed frames are skipped; transport failures end the loop and demote
/// the session to disconnected.
async fn recv_loop(
    session: Arc<Session>,
    generation: u64,
    cancel: CancellationToken,
    mut source: FrameSource,
    inbound: Arc<InboundRouter>,
) {
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => return,
            frame = source.recv() => frame,
        };
        match frame {
            Ok(payload) => {
                let msg: PluginToHost = match strata_proto::decode(&payload) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(plugin_id = %session.id(), error = %e, "skipping undecodable frame");
                        continue;
                    }
                };
                match msg.payload {
                    PluginPayload::EventResult(result) => session.deliver_result(result),
                    other => inbound.handle(&session, other).await,
                }
            }
            Err(e) => {
                session.log_transport_failure("receive", &e);
                session.disconnect_if_current(generation);
                return;
            }
        }
    }
}

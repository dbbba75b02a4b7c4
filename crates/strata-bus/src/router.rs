//! Event fan-out and result aggregation.
//!
//! The router is stateless apart from the event-id counter and runs on the
//! caller's task (the engine callback fiber). Fan-out is parallel: every
//! subscribed session gets the event enqueued, then all registered reply
//! slots are awaited together under one shared deadline measured from
//! enqueue time. A slow plugin therefore costs the engine at most the
//! deadline, never the sum of per-plugin waits.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use strata_core::{EngineContext, PluginId};
use strata_proto::{
    EventEnvelope, EventPayload, EventResult, EventType, HostPayload, HostToPlugin,
};

use crate::session::{ReplyOutcome, Session};

/// The shared per-event response deadline. This is the only bus-induced
/// latency an engine callback can observe.
pub const EVENT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Default)]
pub(crate) struct EventRouter {
    counter: AtomicU64,
}

impl EventRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate the next monotonic event id.
    pub(crate) fn next_event_id(&self) -> String {
        (self.counter.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    /// Fan an event out to every subscribed session.
    ///
    /// With `expects_response`, reply slots are registered before the event
    /// is enqueued (a plugin answering faster than we return must still find
    /// its slot), then awaited in parallel under one deadline. Timed-out
    /// slots are discarded and logged once; slot errors are swallowed.
    /// Without `expects_response`, this returns immediately after enqueueing.
    pub(crate) async fn dispatch(
        &self,
        sessions: &HashMap<PluginId, Arc<Session>>,
        event_type: EventType,
        payload: EventPayload,
        expects_response: bool,
    ) -> Vec<EventResult> {
        let subscribed: Vec<Arc<Session>> = sessions
            .values()
            .filter(|s| s.has_subscription(event_type))
            .cloned()
            .collect();
        if subscribed.is_empty() {
            return Vec::new();
        }

        let envelope = EventEnvelope {
            event_id: self.next_event_id(),
            event_type,
            expects_response,
            payload,
        };

        if !expects_response {
            for session in &subscribed {
                session.enqueue(event_message(session, &envelope));
            }
            return Vec::new();
        }

        let mut waits = Vec::with_capacity(subscribed.len());
        for session in &subscribed {
            let rx = session.expect(&envelope.event_id);
            session.enqueue(event_message(session, &envelope));
            waits.push((Arc::clone(session), rx));
        }

        let deadline = tokio::time::Instant::now() + EVENT_RESPONSE_TIMEOUT;
        let event_id = envelope.event_id;
        let outcomes = futures::future::join_all(waits.into_iter().map(|(session, rx)| {
            let event_id = event_id.clone();
            async move {
                match Session::await_reply(rx, deadline).await {
                    ReplyOutcome::Result(result) => Some(result),
                    ReplyOutcome::Timeout => {
                        warn!(
                            plugin_id = %session.id(),
                            event_id = %event_id,
                            event_type = %event_type,
                            wait_ms = EVENT_RESPONSE_TIMEOUT.as_millis() as u64,
                            "plugin did not respond to event"
                        );
                        session.discard(&event_id);
                        None
                    }
                    ReplyOutcome::Cancelled => {
                        session.discard(&event_id);
                        None
                    }
                }
            }
        }))
        .await;

        outcomes.into_iter().flatten().collect()
    }

    /// Dispatch a cancellable event. If any result carries `cancel=true`,
    /// the engine context is cancelled and NO results are returned, so no
    /// mutation can be applied.
    pub(crate) async fn dispatch_cancellable(
        &self,
        sessions: &HashMap<PluginId, Arc<Session>>,
        ctx: &dyn EngineContext,
        event_type: EventType,
        payload: EventPayload,
    ) -> Vec<EventResult> {
        let results = self.dispatch(sessions, event_type, payload, true).await;
        if results.iter().any(EventResult::is_cancel) {
            ctx.cancel();
            return Vec::new();
        }
        results
    }
}

fn event_message(session: &Session, envelope: &EventEnvelope) -> HostToPlugin {
    HostToPlugin {
        plugin_id: session.id().clone(),
        payload: HostPayload::Event(envelope.clone()),
    }
}

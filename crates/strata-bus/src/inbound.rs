//! Inbound plugin message handling.
//!
//! The session receive loop resolves event results against its own pending
//! table and hands everything else here: Hello, Subscribe, action batches,
//! forwarded log lines, and server-info requests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use strata_core::{EngineServices, PluginId};
use strata_proto::{
    HostPayload, HostToPlugin, LogLevel, PluginHello, PluginPayload, ServerInfo,
};

use crate::actions::ActionDispatcher;
use crate::commands::CommandTable;
use crate::registry::Registry;
use crate::session::Session;

pub(crate) struct InboundRouter {
    engine: Arc<dyn EngineServices>,
    dispatcher: ActionDispatcher,
    commands: CommandTable,
    hello_seen: Mutex<HashSet<PluginId>>,
    hello_notify: Notify,
    /// Set once at bootstrap, after every session exists. Needed only for
    /// the server-info roster.
    sessions: OnceLock<Arc<HashMap<PluginId, Arc<Session>>>>,
}

impl InboundRouter {
    pub(crate) fn new(engine: Arc<dyn EngineServices>, registry: Arc<Registry>) -> Self {
        Self {
            dispatcher: ActionDispatcher::new(registry, Arc::clone(&engine)),
            engine,
            commands: CommandTable::new(),
            hello_seen: Mutex::new(HashSet::new()),
            hello_notify: Notify::new(),
            sessions: OnceLock::new(),
        }
    }

    /// Publish the session roster. Called exactly once during bootstrap.
    pub(crate) fn set_sessions(&self, sessions: Arc<HashMap<PluginId, Arc<Session>>>) {
        let _ = self.sessions.set(sessions);
    }

    /// The set of plugins whose Hello has arrived.
    pub(crate) fn hellos(&self) -> HashSet<PluginId> {
        self.hello_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A future resolving on the next Hello. Create it before checking the
    /// condition it guards.
    pub(crate) fn hello_notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.hello_notify.notified()
    }

    pub(crate) async fn handle(&self, session: &Arc<Session>, payload: PluginPayload) {
        match payload {
            PluginPayload::Hello(hello) => self.handle_hello(session, hello),
            PluginPayload::Subscribe(subscribe) => {
                session.update_subscriptions(subscribe.events);
            }
            PluginPayload::Actions(batch) => {
                self.dispatcher.apply_batch(session, batch).await;
            }
            PluginPayload::Log(log) => {
                let plugin_id = session.id();
                match log.level {
                    LogLevel::Debug => debug!(plugin_id = %plugin_id, "{}", log.message),
                    LogLevel::Info => info!(plugin_id = %plugin_id, "{}", log.message),
                    LogLevel::Warn => warn!(plugin_id = %plugin_id, "{}", log.message),
                    LogLevel::Error => error!(plugin_id = %plugin_id, "{}", log.message),
                }
            }
            PluginPayload::ServerInfoRequest => self.handle_server_info(session),
            // Already resolved by the receive loop; tolerated here for the
            // connection's first frame.
            PluginPayload::EventResult(result) => session.deliver_result(result),
        }
    }

    fn handle_hello(&self, session: &Arc<Session>, hello: PluginHello) {
        info!(
            plugin_id = %session.id(),
            name = %hello.name,
            version = %hello.version,
            api_version = %hello.api_version,
            commands = hello.commands.len(),
            custom_items = hello.custom_items.len(),
            custom_blocks = hello.custom_blocks.len(),
            "plugin hello"
        );
        self.commands
            .register(self.engine.as_ref(), session.id(), &hello.commands);
        session.set_hello(hello);
        self.hello_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().clone());
        self.hello_notify.notify_waiters();
    }

    fn handle_server_info(&self, session: &Arc<Session>) {
        let mut plugins: Vec<_> = self
            .sessions
            .get()
            .map(|sessions| sessions.values().map(|s| s.info()).collect())
            .unwrap_or_default();
        plugins.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        session.enqueue(HostToPlugin {
            plugin_id: session.id().clone(),
            payload: HostPayload::ServerInfo(ServerInfo { plugins }),
        });
    }

    /// A router over empty state for session-level unit tests.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Arc<Self> {
        use strata_core::{Biome, BlockState, CommandSpec};

        struct NullEngine;
        impl EngineServices for NullEngine {
            fn resolve_block(&self, _state: &BlockState) -> Option<BlockState> {
                None
            }
            fn resolve_item(&self, _name: &str, _meta: i16) -> bool {
                false
            }
            fn biome_by_id(&self, _id: i32) -> Option<Biome> {
                None
            }
            fn biome_by_name(&self, _name: &str) -> Option<Biome> {
                None
            }
            fn register_command(&self, _spec: &CommandSpec) {}
            fn broadcast_chat(&self, _message: &str) {}
        }

        Arc::new(Self::new(Arc::new(NullEngine), Arc::new(Registry::new())))
    }
}

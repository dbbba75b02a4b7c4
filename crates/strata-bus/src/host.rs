//! Bootstrap and lifecycle.
//!
//! [`PluginHost::start`] binds the listener, creates one session per
//! configured plugin, launches the configured child processes, and starts
//! the accept loop. A connection's first frame must identify a configured
//! plugin id or the connection is rejected. The embedding server then calls
//! [`PluginHost::wait_for_hello`] before opening gameplay, attaches worlds
//! and players as the engine creates them, and calls the `emit_*` surface
//! from its handler callbacks.
//!
//! Shutdown cancels the root token (which stops the accept loop and kills
//! child processes), broadcasts `HostShutdown` to every session, closes the
//! sessions (each drains its queue under a join budget), and removes any
//! Unix socket file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use strata_config::Config;
use strata_core::{EngineServices, PlayerHandle, PluginId, WorldHandle, WorldId};
use strata_proto::{
    API_VERSION, HostHello, HostPayload, HostShutdown, HostToPlugin, PluginPayload, PluginToHost,
};

use crate::error::{BusError, BusResult};
use crate::inbound::InboundRouter;
use crate::process;
use crate::registry::Registry;
use crate::router::EventRouter;
use crate::session::Session;
use crate::transport::{BusListener, FrameStream, ListenAddr};

/// The plugin host: the engine's single entry point into the bus.
#[derive(Clone)]
pub struct PluginHost {
    pub(crate) inner: Arc<HostInner>,
}

pub(crate) struct HostInner {
    pub(crate) boot_id: String,
    pub(crate) engine: Arc<dyn EngineServices>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) router: EventRouter,
    pub(crate) inbound: Arc<InboundRouter>,
    pub(crate) sessions: Arc<HashMap<PluginId, Arc<Session>>>,
    required_plugins: Vec<PluginId>,
    hello_timeout: Duration,
    listen_addr: ListenAddr,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutting_down: AtomicBool,
}

impl PluginHost {
    /// Boot the bus: bind the listener, create sessions, launch child
    /// processes, start accepting connections.
    ///
    /// # Errors
    ///
    /// Only configuration-class failures abort boot: an unparseable or
    /// unbindable listen address, or an invalid plugin id. A child process
    /// that fails to launch is logged and its session kept for a plugin
    /// arriving by other means.
    pub async fn start(config: Config, engine: Arc<dyn EngineServices>) -> BusResult<Self> {
        let addr = ListenAddr::parse(&config.server_port).map_err(BusError::InvalidAddress)?;
        let listener = BusListener::bind(&addr).await?;
        let listen_addr = listener.local_addr().clone();

        let boot_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let registry = Arc::new(Registry::new());
        let inbound = Arc::new(InboundRouter::new(Arc::clone(&engine), Arc::clone(&registry)));

        let mut sessions = HashMap::new();
        for plugin in &config.plugins {
            let id = PluginId::new(plugin.id.as_str())?;
            sessions.insert(id.clone(), Session::new(id, cancel.child_token()));
        }
        let sessions = Arc::new(sessions);
        inbound.set_sessions(Arc::clone(&sessions));

        let mut required_plugins = Vec::with_capacity(config.required_plugins.len());
        for id in &config.required_plugins {
            required_plugins.push(PluginId::new(id.as_str())?);
        }

        for plugin in &config.plugins {
            if plugin.command.is_empty() {
                continue;
            }
            let address = match &plugin.address {
                Some(address) => ListenAddr::parse(address)
                    .map_err(BusError::InvalidAddress)?
                    .advertise(),
                None => listen_addr.advertise(),
            };
            if let Err(e) = process::spawn(plugin, &address, &boot_id, cancel.child_token()) {
                error!(plugin_id = %plugin.id, error = %e, "failed to launch plugin process");
            }
        }

        let inner = Arc::new(HostInner {
            boot_id,
            engine,
            registry,
            router: EventRouter::new(),
            inbound,
            sessions,
            required_plugins,
            hello_timeout: Duration::from_millis(config.hello_timeout_ms),
            listen_addr,
            cancel,
            tasks: Mutex::new(Vec::new()),
            shutting_down: AtomicBool::new(false),
        });

        let accept = tokio::spawn(accept_loop(Arc::clone(&inner), listener));
        inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(accept);

        info!(address = %inner.listen_addr, boot_id = %inner.boot_id, "plugin host listening");
        Ok(Self { inner })
    }

    /// The actual listen address, with an ephemeral port resolved.
    #[must_use]
    pub fn local_addr(&self) -> &ListenAddr {
        &self.inner.listen_addr
    }

    /// This run's boot id, as advertised to plugins.
    #[must_use]
    pub fn boot_id(&self) -> &str {
        &self.inner.boot_id
    }

    /// The world/player directory.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Block until the required plugins have said Hello, bounded by the
    /// configured timeout.
    ///
    /// With a non-empty `required_plugins` list, waits for all of them; with
    /// an empty list, waits for any Hello (or returns at once when no
    /// plugins are configured). Returns normally even on timeout; the host
    /// logs a warning and the missing plugins' custom blocks and items are
    /// simply absent from the resource pack.
    pub async fn wait_for_hello(&self) {
        if self.inner.sessions.is_empty() {
            return;
        }
        let deadline = tokio::time::Instant::now() + self.inner.hello_timeout;
        loop {
            let notified = self.inner.inbound.hello_notified();
            let missing = self.missing_hellos();
            if missing.is_empty() {
                return;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let missing: Vec<String> =
                    missing.iter().map(|id| id.as_str().to_string()).collect();
                warn!(
                    missing = ?missing,
                    "plugins missing after hello wait; their custom blocks and items will be absent from the resource pack"
                );
                return;
            }
        }
    }

    fn missing_hellos(&self) -> Vec<PluginId> {
        let seen = self.inner.inbound.hellos();
        if self.inner.required_plugins.is_empty() {
            if seen.is_empty() {
                self.inner.sessions.keys().cloned().collect()
            } else {
                Vec::new()
            }
        } else {
            self.inner
                .required_plugins
                .iter()
                .filter(|id| !seen.contains(id))
                .cloned()
                .collect()
        }
    }

    /// Register a world and return its host-assigned id. The engine calls
    /// this when it installs the bus handlers on a world.
    pub fn attach_world(&self, handle: Arc<dyn WorldHandle>) -> WorldId {
        self.inner.registry.attach_world(handle)
    }

    /// Register a player and announce the join to subscribed plugins.
    pub async fn attach_player(&self, handle: Arc<dyn PlayerHandle>) {
        let player = strata_core::PlayerRef {
            uuid: handle.uuid().to_string(),
            name: handle.name(),
        };
        self.inner.registry.attach_player(handle);
        self.emit_player_join(&player).await;
    }

    /// Announce a quit to subscribed plugins and drop the player.
    pub async fn player_quit(&self, handle: &Arc<dyn PlayerHandle>) {
        let player = strata_core::PlayerRef {
            uuid: handle.uuid().to_string(),
            name: handle.name(),
        };
        self.emit_player_quit(&player).await;
        self.inner.registry.detach_player(handle.uuid());
    }

    /// Shut the bus down: stop accepting, notify and close every session,
    /// kill child processes, remove socket files. Idempotent.
    pub async fn shutdown(&self, reason: &str) {
        if self.inner.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(reason = %reason, "plugin host shutting down");
        self.inner.cancel.cancel();

        for session in self.inner.sessions.values() {
            session.enqueue(HostToPlugin {
                plugin_id: session.id().clone(),
                payload: HostPayload::Shutdown(HostShutdown {
                    reason: reason.to_string(),
                }),
            });
        }
        for session in self.inner.sessions.values() {
            session.close().await;
        }

        let tasks = std::mem::take(
            &mut *self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let joined = futures::future::join_all(tasks);
        if tokio::time::timeout(Duration::from_secs(5), joined).await.is_err() {
            warn!("timeout waiting for host tasks to finish");
        }
    }
}

/// Accepts connections until the root token fires, then removes the socket
/// file. Each connection is identified on its own task so a stalled client
/// cannot block the listener.
async fn accept_loop(inner: Arc<HostInner>, listener: BusListener) {
    loop {
        let accepted = tokio::select! {
            () = inner.cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok(stream) => {
                let inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    if let Err(e) = identify_connection(&inner, stream).await {
                        info!(error = %e, "plugin connection rejected");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
            }
        }
    }
    listener.cleanup();
}

/// Read the first frame of a fresh connection, match it to a configured
/// session, handle that first message, and attach the transport (which sends
/// `HostHello` before anything else).
async fn identify_connection(inner: &Arc<HostInner>, mut stream: FrameStream) -> BusResult<()> {
    let first = stream.recv().await?;
    let msg: PluginToHost = strata_proto::decode(&first)?;
    let Some(session) = inner.sessions.get(&msg.plugin_id) else {
        return Err(BusError::UnknownPlugin(msg.plugin_id));
    };

    info!(plugin_id = %msg.plugin_id, "plugin connected");
    session.mark_identified();
    match msg.payload {
        PluginPayload::EventResult(result) => session.deliver_result(result),
        other => inner.inbound.handle(session, other).await,
    }

    let greeting = HostToPlugin {
        plugin_id: session.id().clone(),
        payload: HostPayload::Hello(HostHello {
            api_version: API_VERSION.to_string(),
            boot_id: inner.boot_id.clone(),
        }),
    };
    session.attach(stream, Arc::clone(&inner.inbound), greeting);
    Ok(())
}

//! Outer wire messages, one per frame.

use serde::{Deserialize, Serialize};
use strata_core::{CommandSpec, PluginId};

use crate::action::{ActionBatch, QueryResult};
use crate::event::{EventEnvelope, EventResult, EventType};

/// A frame sent host → plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostToPlugin {
    /// The session the frame belongs to.
    pub plugin_id: PluginId,
    /// The payload variant.
    pub payload: HostPayload,
}

/// Host → plugin payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostPayload {
    /// Sent once per transport attach.
    Hello(HostHello),
    /// The host is shutting down.
    Shutdown(HostShutdown),
    /// A routed game event.
    Event(EventEnvelope),
    /// Reply to a correlated action.
    ActionResult(ActionResult),
    /// Reply to a `ServerInfoRequest`.
    ServerInfo(ServerInfo),
}

/// Host greeting sent on every transport attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostHello {
    /// Protocol API version.
    pub api_version: String,
    /// Fresh per host start; plugins compare it to detect a host restart and
    /// reset client-side state.
    pub boot_id: String,
}

/// Host shutdown notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostShutdown {
    /// Human-readable reason.
    pub reason: String,
}

/// Reply to a correlated action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Echo of the request's correlation id.
    pub correlation_id: String,
    /// Whether the action succeeded.
    pub ok: bool,
    /// Failure reason when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Query payload for query actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
}

impl ActionResult {
    /// A successful mutating-action reply.
    #[must_use]
    pub fn ok(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            ok: true,
            error: None,
            result: None,
        }
    }

    /// A failed-action reply with the given reason.
    #[must_use]
    pub fn error(correlation_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            ok: false,
            error: Some(reason.into()),
            result: None,
        }
    }

    /// A successful query reply carrying its payload.
    #[must_use]
    pub fn query(correlation_id: impl Into<String>, result: QueryResult) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            ok: true,
            error: None,
            result: Some(result),
        }
    }
}

/// Host plugin roster sent in reply to `ServerInfoRequest`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    /// One entry per configured plugin session.
    pub plugins: Vec<PluginInfo>,
}

/// One configured plugin as seen by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// The configured plugin id.
    pub id: PluginId,
    /// Name from the plugin's Hello, if received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version from the plugin's Hello, if received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// API version from the plugin's Hello, if received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Whether the session is currently eligible for dispatch.
    pub ready: bool,
}

/// A frame sent plugin → host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginToHost {
    /// The sending plugin's configured id. The first frame on a new
    /// transport identifies the session; an unknown id rejects the
    /// connection.
    pub plugin_id: PluginId,
    /// The payload variant.
    pub payload: PluginPayload,
}

/// Plugin → host payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginPayload {
    /// Plugin identification and declarations. Re-sent Hellos overwrite.
    Hello(PluginHello),
    /// Replace the session's subscription set.
    Subscribe(EventSubscribe),
    /// Response to a response-expecting event.
    EventResult(EventResult),
    /// A batch of actions against game state.
    Actions(ActionBatch),
    /// A log line forwarded into the host log.
    Log(LogMessage),
    /// Ask for the host's plugin roster.
    ServerInfoRequest,
}

/// Plugin identification and declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PluginHello {
    /// Plugin display name.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Plugin-side protocol API version.
    pub api_version: String,
    /// Commands to register with the engine.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
    /// Custom items the plugin contributes to the resource pack.
    #[serde(default)]
    pub custom_items: Vec<CustomItemSpec>,
    /// Custom blocks the plugin contributes to the resource pack.
    #[serde(default)]
    pub custom_blocks: Vec<CustomBlockSpec>,
}

/// A custom item declaration, forwarded to the engine's resource pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomItemSpec {
    /// Namespaced identifier.
    pub identifier: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
}

/// A custom block declaration, forwarded to the engine's resource pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomBlockSpec {
    /// Namespaced identifier.
    pub identifier: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
}

/// Replace the session's subscription set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventSubscribe {
    /// The new set of subscribed tags. May contain the `"*"` sentinel.
    pub events: Vec<EventType>,
}

/// A log line from a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
}

/// Plugin log severities, mapped onto host log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug output.
    Debug,
    /// Informational output.
    Info,
    /// Warnings.
    #[serde(alias = "warning")]
    Warn,
    /// Errors.
    Error,
}

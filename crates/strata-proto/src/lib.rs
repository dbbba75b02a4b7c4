//! Strata Proto - Wire protocol for the Strata plugin host.
//!
//! One bidirectional frame stream runs per plugin. Each frame carries one
//! outer message, [`HostToPlugin`] or [`PluginToHost`], whose payload is a
//! tagged variant. The bus routes on the outer kind only and treats variant
//! contents as opaque; interpretation happens at the edges (emit helpers,
//! mutation appliers, the action dispatcher, plugin SDKs).
//!
//! The event tag set ([`EventType`]) is closed and enforced at the schema
//! level; the sentinel [`EventType::All`] (wire tag `"*"`) matches every
//! concrete tag in subscription filters.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod action;
pub mod codec;
pub mod error;
pub mod event;
pub mod message;

pub use action::{Action, ActionBatch, ActionKind, QueryResult};
pub use codec::{decode, encode};
pub use error::{ProtoError, ProtoResult};
pub use event::{
    BlockBreakEvent, BlockBreakMutation, BlockPlaceEvent, ChatEvent, ChatMutation, CommandEvent,
    EventEnvelope, EventMutation, EventPayload, EventResult, EventType, PlayerDeathEvent,
    PlayerExperienceGainEvent, PlayerExperienceGainMutation, PlayerFoodLossEvent,
    PlayerFoodLossMutation, PlayerHealEvent, PlayerHealMutation, PlayerHurtEvent,
    PlayerHurtMutation, PlayerItemDropEvent, PlayerJoinEvent, PlayerMoveEvent, PlayerMoveMutation,
    PlayerQuitEvent, PlayerTeleportEvent, PlayerTeleportMutation, WorldCloseEvent,
    WorldExplosionEvent, WorldExplosionMutation, WorldFireSpreadEvent, WorldLiquidFlowEvent,
};
pub use message::{
    ActionResult, CustomBlockSpec, CustomItemSpec, EventSubscribe, HostHello, HostPayload,
    HostShutdown, HostToPlugin, LogLevel, LogMessage, PluginHello, PluginInfo, PluginPayload,
    PluginToHost, ServerInfo,
};

/// The protocol API version advertised in `HostHello`.
pub const API_VERSION: &str = "v1";

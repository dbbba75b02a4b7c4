//! Event envelopes, the closed tag set, and mutation variants.
//!
//! Events flow host → plugin. A plugin subscribed to an event's tag may
//! answer with an [`EventResult`] carrying `cancel` and/or a mutation whose
//! variant matches the event type; mutation fields are all optional and an
//! absent field leaves the host value untouched.

use serde::{Deserialize, Serialize};
use strata_core::{BlockPos, BlockState, ItemStack, LiquidState, Rotation, Vec3, WorldRef};

/// The closed set of event tags, plus the subscription sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Subscription sentinel matching every concrete tag. Never emitted.
    #[serde(rename = "*")]
    All,
    /// A player joined the server.
    PlayerJoin,
    /// A player left the server.
    PlayerQuit,
    /// A player sent a chat message.
    Chat,
    /// A player executed a command.
    Command,
    /// A player is breaking a block.
    BlockBreak,
    /// A player is placing a block.
    BlockPlace,
    /// A player is taking damage.
    PlayerHurt,
    /// A player is being healed.
    PlayerHeal,
    /// A player is losing food.
    PlayerFoodLoss,
    /// A player moved.
    PlayerMove,
    /// A player is being teleported.
    PlayerTeleport,
    /// A player is gaining experience.
    PlayerExperienceGain,
    /// A player is dropping an item.
    PlayerItemDrop,
    /// A player died.
    PlayerDeath,
    /// Liquid is flowing into a position.
    WorldLiquidFlow,
    /// Fire is spreading between positions.
    WorldFireSpread,
    /// An explosion is resolving.
    WorldExplosion,
    /// A world is closing.
    WorldClose,
}

impl EventType {
    /// The tag as it appears on the wire.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::All => "*",
            Self::PlayerJoin => "PLAYER_JOIN",
            Self::PlayerQuit => "PLAYER_QUIT",
            Self::Chat => "CHAT",
            Self::Command => "COMMAND",
            Self::BlockBreak => "BLOCK_BREAK",
            Self::BlockPlace => "BLOCK_PLACE",
            Self::PlayerHurt => "PLAYER_HURT",
            Self::PlayerHeal => "PLAYER_HEAL",
            Self::PlayerFoodLoss => "PLAYER_FOOD_LOSS",
            Self::PlayerMove => "PLAYER_MOVE",
            Self::PlayerTeleport => "PLAYER_TELEPORT",
            Self::PlayerExperienceGain => "PLAYER_EXPERIENCE_GAIN",
            Self::PlayerItemDrop => "PLAYER_ITEM_DROP",
            Self::PlayerDeath => "PLAYER_DEATH",
            Self::WorldLiquidFlow => "WORLD_LIQUID_FLOW",
            Self::WorldFireSpread => "WORLD_FIRE_SPREAD",
            Self::WorldExplosion => "WORLD_EXPLOSION",
            Self::WorldClose => "WORLD_CLOSE",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// The outer event message routed to subscribed sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Host-assigned monotonic id, rendered as a string.
    pub event_id: String,
    /// The event's tag.
    pub event_type: EventType,
    /// Whether the host will wait for an [`EventResult`].
    pub expects_response: bool,
    /// The typed payload matching `event_type`.
    pub payload: EventPayload,
}

/// Typed event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// Payload for [`EventType::PlayerJoin`].
    PlayerJoin(PlayerJoinEvent),
    /// Payload for [`EventType::PlayerQuit`].
    PlayerQuit(PlayerQuitEvent),
    /// Payload for [`EventType::Chat`].
    Chat(ChatEvent),
    /// Payload for [`EventType::Command`].
    Command(CommandEvent),
    /// Payload for [`EventType::BlockBreak`].
    BlockBreak(BlockBreakEvent),
    /// Payload for [`EventType::BlockPlace`].
    BlockPlace(BlockPlaceEvent),
    /// Payload for [`EventType::PlayerHurt`].
    PlayerHurt(PlayerHurtEvent),
    /// Payload for [`EventType::PlayerHeal`].
    PlayerHeal(PlayerHealEvent),
    /// Payload for [`EventType::PlayerFoodLoss`].
    PlayerFoodLoss(PlayerFoodLossEvent),
    /// Payload for [`EventType::PlayerMove`].
    PlayerMove(PlayerMoveEvent),
    /// Payload for [`EventType::PlayerTeleport`].
    PlayerTeleport(PlayerTeleportEvent),
    /// Payload for [`EventType::PlayerExperienceGain`].
    PlayerExperienceGain(PlayerExperienceGainEvent),
    /// Payload for [`EventType::PlayerItemDrop`].
    PlayerItemDrop(PlayerItemDropEvent),
    /// Payload for [`EventType::PlayerDeath`].
    PlayerDeath(PlayerDeathEvent),
    /// Payload for [`EventType::WorldLiquidFlow`].
    WorldLiquidFlow(WorldLiquidFlowEvent),
    /// Payload for [`EventType::WorldFireSpread`].
    WorldFireSpread(WorldFireSpreadEvent),
    /// Payload for [`EventType::WorldExplosion`].
    WorldExplosion(WorldExplosionEvent),
    /// Payload for [`EventType::WorldClose`].
    WorldClose(WorldCloseEvent),
}

/// A player joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name.
    pub name: String,
}

/// A player quit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerQuitEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name.
    pub name: String,
}

/// A chat message before broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name.
    pub name: String,
    /// The message as typed.
    pub message: String,
}

/// A command execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name.
    pub name: String,
    /// The raw line, with leading slash.
    pub raw: String,
    /// The command name, without slash.
    pub command: String,
    /// The argument list.
    pub args: Vec<String>,
}

/// A block break in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBreakEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name.
    pub name: String,
    /// The world the block is in.
    pub world: WorldRef,
    /// The block position.
    pub position: BlockPos,
}

/// A block placement in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPlaceEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name.
    pub name: String,
    /// The world the block is in.
    pub world: WorldRef,
    /// The block position.
    pub position: BlockPos,
    /// The block being placed.
    pub block: BlockState,
}

/// A player taking damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerHurtEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Damage about to be applied.
    pub damage: f64,
    /// Attack immunity about to be granted, in milliseconds.
    pub immunity_ms: u64,
    /// Damage source description.
    pub source: String,
}

/// A player being healed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerHealEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Health about to be restored.
    pub amount: f64,
    /// Healing source description.
    pub source: String,
}

/// A player losing food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFoodLossEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Food level before the loss.
    pub from: i32,
    /// Food level about to be set.
    pub to: i32,
}

/// A player movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoveEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// The target position.
    pub position: Vec3,
    /// The target rotation.
    pub rotation: Rotation,
}

/// A player teleport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTeleportEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// The target position.
    pub position: Vec3,
}

/// A player gaining experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerExperienceGainEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Points about to be added.
    pub amount: i64,
}

/// A player dropping an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerItemDropEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// The stack being dropped.
    pub item: ItemStack,
}

/// A player died.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDeathEvent {
    /// Player UUID.
    pub player_uuid: String,
    /// Player name.
    pub name: String,
    /// Damage source description.
    pub source: String,
}

/// Liquid flowing into a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldLiquidFlowEvent {
    /// The world.
    pub world: WorldRef,
    /// Where the liquid flows from.
    pub from: BlockPos,
    /// Where the liquid flows into.
    pub into: BlockPos,
    /// The flowing liquid.
    pub liquid: LiquidState,
    /// The block being replaced, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced: Option<BlockState>,
}

/// Fire spreading between positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldFireSpreadEvent {
    /// The world.
    pub world: WorldRef,
    /// The burning source position.
    pub from: BlockPos,
    /// The position catching fire.
    pub to: BlockPos,
}

/// An explosion resolving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldExplosionEvent {
    /// The world.
    pub world: WorldRef,
    /// The explosion center.
    pub position: Vec3,
    /// Blocks about to be destroyed.
    pub block_positions: Vec<BlockPos>,
    /// Chance for destroyed blocks to drop items, `0.0..=1.0`.
    pub item_drop_chance: f64,
    /// Whether fire will be spawned.
    pub spawn_fire: bool,
}

/// A world closing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldCloseEvent {
    /// The closing world.
    pub world: WorldRef,
}

/// A plugin's response to a response-expecting event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventResult {
    /// The id of the event being answered.
    pub event_id: String,
    /// Request cancellation of the engine event. Any subscriber cancelling
    /// suppresses all mutations from every subscriber.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<bool>,
    /// A mutation of the callback's exposed fields. Ignored unless its
    /// variant matches the event type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<EventMutation>,
}

impl EventResult {
    /// Whether this result requests cancellation.
    #[must_use]
    pub fn is_cancel(&self) -> bool {
        self.cancel.unwrap_or(false)
    }
}

/// Mutation variants, one per mutable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventMutation {
    /// Mutation for [`EventType::Chat`].
    Chat(ChatMutation),
    /// Mutation for [`EventType::BlockBreak`].
    BlockBreak(BlockBreakMutation),
    /// Mutation for [`EventType::PlayerHurt`].
    PlayerHurt(PlayerHurtMutation),
    /// Mutation for [`EventType::PlayerHeal`].
    PlayerHeal(PlayerHealMutation),
    /// Mutation for [`EventType::PlayerFoodLoss`].
    PlayerFoodLoss(PlayerFoodLossMutation),
    /// Mutation for [`EventType::PlayerMove`].
    PlayerMove(PlayerMoveMutation),
    /// Mutation for [`EventType::PlayerTeleport`].
    PlayerTeleport(PlayerTeleportMutation),
    /// Mutation for [`EventType::PlayerExperienceGain`].
    PlayerExperienceGain(PlayerExperienceGainMutation),
    /// Mutation for [`EventType::WorldExplosion`].
    WorldExplosion(WorldExplosionMutation),
}

/// Rewrite the chat message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatMutation {
    /// Replacement message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Rewrite block-break outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockBreakMutation {
    /// Replacement drop list (replaces, never merges).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drops: Option<Vec<ItemStack>>,
    /// Replacement experience reward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<i32>,
}

/// Rewrite damage outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerHurtMutation {
    /// Replacement damage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<f64>,
    /// Replacement attack immunity, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immunity_ms: Option<u64>,
}

/// Rewrite healing outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerHealMutation {
    /// Replacement heal amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

/// Rewrite food-loss outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerFoodLossMutation {
    /// Replacement food level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<i32>,
}

/// Rewrite movement outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerMoveMutation {
    /// Replacement target position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
}

/// Rewrite teleport outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerTeleportMutation {
    /// Replacement target position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
}

/// Rewrite experience-gain outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerExperienceGainMutation {
    /// Replacement point amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i32>,
}

/// Rewrite explosion outcomes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldExplosionMutation {
    /// Replacement destroyed-block list (replaces, never merges).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_positions: Option<Vec<BlockPos>>,
    /// Replacement item drop chance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_drop_chance: Option<f64>,
    /// Replacement fire flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_fire: Option<bool>,
}

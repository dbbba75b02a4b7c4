//! Plugin-issued actions against game state.
//!
//! Actions arrive in batches. Player actions address a player by UUID and run
//! inside that player's world transaction; world actions address a
//! [`WorldRef`] and run inside that world's transaction. Every action may
//! carry a `correlation_id`; the dispatcher answers correlated actions with
//! exactly one `ActionResult`.

use serde::{Deserialize, Serialize};
use strata_core::{
    BlockPos, BlockState, Dialogue, EntityRef, GameMode, ItemStack, LiquidState, PlayerRef,
    Rotation, Title, Vec3, WorldRef,
};

/// A batch of actions from one plugin, applied in encounter order except for
/// the per-world `WorldSetBlock` grouping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionBatch {
    /// The actions, in plugin-issued order.
    pub actions: Vec<Action>,
}

/// One action plus its optional reply correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// When present, the dispatcher replies with an `ActionResult` carrying
    /// this id. Absent means fire-and-forget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// The action variant.
    pub kind: ActionKind,
}

impl Action {
    /// Construct a fire-and-forget action.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            correlation_id: None,
            kind,
        }
    }

    /// Construct a correlated action.
    #[must_use]
    pub fn correlated(correlation_id: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            kind,
        }
    }
}

/// The action variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Send a chat message to one player, or to every player plus the global
    /// stream when `target_uuid` is absent.
    SendChat {
        /// Target player UUID; absent broadcasts.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_uuid: Option<String>,
        /// Message text.
        message: String,
    },
    /// Teleport a player.
    Teleport {
        /// Target player UUID.
        player_uuid: String,
        /// Destination.
        position: Vec3,
        /// Optional view rotation to apply.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<Rotation>,
    },
    /// Disconnect a player.
    Kick {
        /// Target player UUID.
        player_uuid: String,
        /// Disconnect reason shown to the player.
        reason: String,
    },
    /// Change a player's game mode.
    SetGameMode {
        /// Target player UUID.
        player_uuid: String,
        /// Game mode id; must be in the known set.
        game_mode: i32,
    },
    /// Add an item to a player's inventory.
    GiveItem {
        /// Target player UUID.
        player_uuid: String,
        /// The stack to give.
        item: ItemStack,
    },
    /// Set a player's health, optionally adjusting the maximum first.
    SetHealth {
        /// Target player UUID.
        player_uuid: String,
        /// New current health.
        health: f64,
        /// New maximum health.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_health: Option<f64>,
    },
    /// Set a player's food level.
    SetFood {
        /// Target player UUID.
        player_uuid: String,
        /// New food level.
        food: i32,
    },
    /// Adjust a player's experience.
    SetExperience {
        /// Target player UUID.
        player_uuid: String,
        /// New experience level.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<i64>,
        /// New progress within the level, `0.0..=1.0`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        /// Points to add (negative removes).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<i64>,
    },
    /// Apply an effect to a player.
    AddEffect {
        /// Target player UUID.
        player_uuid: String,
        /// Engine effect id.
        effect_id: i32,
        /// Effect level.
        level: i32,
        /// Duration in milliseconds; `0` means infinite.
        duration_ms: u64,
        /// Whether to show particles.
        #[serde(default)]
        show_particles: bool,
    },
    /// Remove an effect from a player.
    RemoveEffect {
        /// Target player UUID.
        player_uuid: String,
        /// Engine effect id.
        effect_id: i32,
    },
    /// Show a title to a player.
    SendTitle {
        /// Target player UUID.
        player_uuid: String,
        /// The title contents and timings.
        title: Title,
    },
    /// Show a popup to a player.
    SendPopup {
        /// Target player UUID.
        player_uuid: String,
        /// Popup text.
        message: String,
    },
    /// Show a tip to a player.
    SendTip {
        /// Target player UUID.
        player_uuid: String,
        /// Tip text.
        message: String,
    },
    /// Execute a command as a player.
    ExecuteCommand {
        /// Target player UUID.
        player_uuid: String,
        /// Command line; a leading slash is added when missing.
        command: String,
    },
    /// Open an entity-attached dialogue for a player.
    SendDialogue {
        /// Target player UUID.
        player_uuid: String,
        /// The dialogue contents.
        dialogue: Dialogue,
        /// The entity the dialogue attaches to; must be in the player's world.
        entity: EntityRef,
    },
    /// Set a block in a world. Co-world occurrences within one batch run in
    /// a single world transaction.
    WorldSetBlock {
        /// Target world.
        world: WorldRef,
        /// The block position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<BlockPos>,
        /// The block to set; absent clears to air.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block: Option<BlockState>,
    },
    /// Set a world's default game mode.
    WorldSetDefaultGameMode {
        /// Target world.
        world: WorldRef,
        /// Game mode id; must be in the known set.
        game_mode: i32,
    },
    /// Set a world's difficulty.
    WorldSetDifficulty {
        /// Target world.
        world: WorldRef,
        /// Difficulty id; must be in the known set.
        difficulty: i32,
    },
    /// Set a world's simulation tick range.
    WorldSetTickRange {
        /// Target world.
        world: WorldRef,
        /// Tick range in chunks; must be non-negative.
        range: i32,
    },
    /// Set a world's time.
    WorldSetTime {
        /// Target world.
        world: WorldRef,
        /// New world time.
        time: i64,
    },
    /// Stop a world's time advancing.
    WorldStopTime {
        /// Target world.
        world: WorldRef,
    },
    /// Resume a world's time advancing.
    WorldStartTime {
        /// Target world.
        world: WorldRef,
    },
    /// Set a world's spawn position.
    WorldSetSpawn {
        /// Target world.
        world: WorldRef,
        /// The spawn position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<BlockPos>,
    },
    /// Set the biome at a position.
    WorldSetBiome {
        /// Target world.
        world: WorldRef,
        /// The position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<BlockPos>,
        /// Biome id; checked against the engine's biome registry.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        biome_id: Option<i32>,
        /// Biome name; used when `biome_id` is absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        biome_name: Option<String>,
    },
    /// Set or clear the liquid at a position.
    WorldSetLiquid {
        /// Target world.
        world: WorldRef,
        /// The position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<BlockPos>,
        /// The liquid to set; absent clears an existing liquid.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        liquid: Option<LiquidState>,
    },
    /// Schedule a block update.
    WorldScheduleBlockUpdate {
        /// Target world.
        world: WorldRef,
        /// The position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<BlockPos>,
        /// Delay before the update, in milliseconds.
        delay_ms: u64,
    },
    /// Query the block at a position.
    WorldQueryBlock {
        /// Target world.
        world: WorldRef,
        /// The position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<BlockPos>,
    },
    /// Query the liquid at a position.
    WorldQueryLiquid {
        /// Target world.
        world: WorldRef,
        /// The position.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<BlockPos>,
    },
    /// Query the players currently in a world.
    WorldQueryPlayers {
        /// Target world.
        world: WorldRef,
    },
    /// Query a world's default game mode.
    WorldQueryDefaultGameMode {
        /// Target world.
        world: WorldRef,
    },
}

impl ActionKind {
    /// Whether this variant is a query (its reply carries a payload) rather
    /// than a mutation (its reply is plain ok/error).
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::WorldQueryBlock { .. }
                | Self::WorldQueryLiquid { .. }
                | Self::WorldQueryPlayers { .. }
                | Self::WorldQueryDefaultGameMode { .. }
        )
    }
}

/// Query payloads carried by `ActionResult` replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryResult {
    /// Reply to `WorldQueryBlock`; `None` means air.
    Block {
        /// The block found, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block: Option<BlockState>,
    },
    /// Reply to `WorldQueryLiquid`.
    Liquid {
        /// The liquid found.
        liquid: LiquidState,
    },
    /// Reply to `WorldQueryPlayers`.
    Players {
        /// Players in the world.
        players: Vec<PlayerRef>,
    },
    /// Reply to `WorldQueryDefaultGameMode`.
    GameMode {
        /// The default game mode.
        game_mode: GameMode,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trip() {
        let action = Action::correlated(
            "c1",
            ActionKind::WorldSetBlock {
                world: WorldRef::by_name("overworld"),
                position: Some(BlockPos::new(0, 64, 0)),
                block: Some(BlockState::named("minecraft:stone")),
            },
        );
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn query_classification() {
        let query = ActionKind::WorldQueryPlayers {
            world: WorldRef::by_name("overworld"),
        };
        assert!(query.is_query());
        let mutation = ActionKind::WorldSetTime {
            world: WorldRef::by_name("overworld"),
            time: 0,
        };
        assert!(!mutation.is_query());
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let json = r#"{"kind":{"kind":"send_chat","message":"hello"}}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert!(action.correlation_id.is_none());
        assert!(matches!(
            action.kind,
            ActionKind::SendChat {
                target_uuid: None,
                ..
            }
        ));
    }
}

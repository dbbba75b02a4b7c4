//! Engine ports consumed by the plugin bus.
//!
//! The embedding game server implements these traits; the bus only ever
//! talks to the engine through them. Two rules shape the surface:
//!
//! 1. **World writes are transactional.** All block-level mutation goes
//!    through [`WorldHandle::exec`], which runs the closure inside the
//!    engine's single-writer transaction for that world. The bus relies on
//!    this for per-world serialization and never implements its own.
//! 2. **Engine callbacks are cancellable views.** An engine event hands the
//!    bus an [`EngineContext`] plus `&mut` views of the fields the callback
//!    exposes; the bus mutates those views only after every plugin response
//!    has arrived and only when no plugin cancelled.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{
    Biome, BlockPos, BlockState, CommandSpec, Dialogue, Difficulty, GameMode, ItemStack,
    LiquidState, PlayerRef, Rotation, Title, Vec3,
};

/// A cancellable engine callback context.
///
/// Calling [`cancel`](EngineContext::cancel) before the callback returns
/// suppresses the engine-side effect of the event (chat not broadcast, block
/// not broken, ...).
pub trait EngineContext: Send + Sync {
    /// Cancel the engine event this context belongs to.
    fn cancel(&self);
}

/// Work executed inside a world transaction.
pub type WorldWork = Box<dyn FnOnce(&mut dyn WorldTx) + Send>;

/// Work executed inside the owning player's world transaction.
pub type PlayerWork = Box<dyn FnOnce(&mut dyn PlayerApi) + Send>;

/// The mutable view of a world available inside its transaction.
pub trait WorldTx {
    /// Set the block at `pos`. `None` clears the position to air.
    fn set_block(&mut self, pos: BlockPos, block: Option<BlockState>);

    /// Read the block at `pos`. `None` means air.
    fn block(&self, pos: BlockPos) -> Option<BlockState>;

    /// Set the biome at `pos`.
    fn set_biome(&mut self, pos: BlockPos, biome: &Biome);

    /// Read the liquid at `pos`, if the block there is a liquid.
    fn liquid(&self, pos: BlockPos) -> Option<LiquidState>;

    /// Set or clear the liquid at `pos`.
    fn set_liquid(&mut self, pos: BlockPos, liquid: Option<LiquidState>);

    /// Schedule a block update at `pos` after `delay`.
    fn schedule_block_update(&mut self, pos: BlockPos, delay: Duration);
}

/// A handle to one world instance.
///
/// Methods outside [`exec`](WorldHandle::exec) are world-scoped settings the
/// engine synchronizes internally; block-level access must go through the
/// transaction.
#[async_trait]
pub trait WorldHandle: Send + Sync {
    /// The world's display name.
    fn name(&self) -> String;

    /// The world's dimension name (e.g. `"overworld"`).
    fn dimension(&self) -> String;

    /// Run `work` inside this world's single-writer transaction, returning
    /// once the transaction has completed.
    async fn exec(&self, work: WorldWork);

    /// Set the default game mode for new players.
    fn set_default_game_mode(&self, mode: GameMode);

    /// The current default game mode.
    fn default_game_mode(&self) -> GameMode;

    /// Set the world difficulty.
    fn set_difficulty(&self, difficulty: Difficulty);

    /// Set the simulation tick range, in chunks. Callers validate sign.
    fn set_tick_range(&self, range: i32);

    /// Set the world time.
    fn set_time(&self, time: i64);

    /// Stop time advancing.
    fn stop_time(&self);

    /// Resume time advancing.
    fn start_time(&self);

    /// Set the world spawn position.
    fn set_spawn(&self, pos: BlockPos);

    /// The players currently in this world.
    fn players(&self) -> Vec<PlayerRef>;
}

/// A handle to one connected player.
#[async_trait]
pub trait PlayerHandle: Send + Sync {
    /// The player's UUID.
    fn uuid(&self) -> Uuid;

    /// The player's display name.
    fn name(&self) -> String;

    /// Run `work` against this player inside their world's transaction,
    /// returning once the transaction has completed.
    async fn exec(&self, work: PlayerWork);
}

/// The mutable view of a player available inside their world transaction.
///
/// This mirrors the action surface plugins can address; each method maps to
/// one engine operation and performs no validation of its own.
pub trait PlayerApi {
    /// Send a chat message to the player.
    fn message(&mut self, message: &str);
    /// Teleport the player.
    fn teleport(&mut self, position: Vec3);
    /// Set the player's view rotation.
    fn set_rotation(&mut self, rotation: Rotation);
    /// Disconnect the player with a reason.
    fn disconnect(&mut self, reason: &str);
    /// Change the player's game mode.
    fn set_game_mode(&mut self, mode: GameMode);
    /// Add an item stack to the player's inventory.
    fn give_item(&mut self, item: ItemStack);
    /// Current health.
    fn health(&self) -> f64;
    /// Set current health.
    fn set_health(&mut self, health: f64);
    /// Set maximum health.
    fn set_max_health(&mut self, max_health: f64);
    /// Set the food level.
    fn set_food(&mut self, food: i32);
    /// Set the experience level.
    fn set_experience_level(&mut self, level: i64);
    /// Set the experience progress within the current level, `0.0..=1.0`.
    fn set_experience_progress(&mut self, progress: f64);
    /// Add (or, negative, remove) experience points.
    fn add_experience(&mut self, amount: i64);
    /// Apply an effect. `duration` of `None` means infinite.
    fn add_effect(&mut self, effect_id: i32, level: i32, duration: Option<Duration>, particles: bool);
    /// Remove an effect by id.
    fn remove_effect(&mut self, effect_id: i32);
    /// Show a title.
    fn send_title(&mut self, title: &Title);
    /// Show a popup message.
    fn send_popup(&mut self, message: &str);
    /// Show a tip message.
    fn send_tip(&mut self, message: &str);
    /// Execute a command as the player.
    fn execute_command(&mut self, command: &str);
    /// Whether an entity with `uuid` exists in the player's world.
    fn has_entity(&self, uuid: Uuid) -> bool;
    /// Open a dialogue attached to the given entity.
    fn send_dialogue(&mut self, dialogue: &Dialogue, entity: Uuid);
}

/// Engine-global services outside any single world or player.
pub trait EngineServices: Send + Sync {
    /// Resolve a wire block state against the engine's block registry.
    /// Returns the canonical state, or `None` if it does not decode.
    fn resolve_block(&self, state: &BlockState) -> Option<BlockState>;

    /// Whether an item with this name/meta pair exists.
    fn resolve_item(&self, name: &str, meta: i16) -> bool;

    /// Look up a biome by numeric id.
    fn biome_by_id(&self, id: i32) -> Option<Biome>;

    /// Look up a biome by lowercase name.
    fn biome_by_name(&self, name: &str) -> Option<Biome>;

    /// Register a plugin-declared command binding with the engine. The
    /// engine-side runtime handler is a no-op; execution is reported back
    /// through the command event.
    fn register_command(&self, spec: &CommandSpec);

    /// Write a message to the global chat stream.
    fn broadcast_chat(&self, message: &str);
}

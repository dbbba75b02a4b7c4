//! Strata Core - Foundation types and engine ports for the Strata plugin host.
//!
//! This crate provides:
//! - Validated identifier newtypes ([`PluginId`], [`WorldId`])
//! - Value types shared between the wire protocol and the engine surface
//!   (geometry, block/item state, game-mode and difficulty sets, world refs)
//! - The engine port traits the plugin bus consumes: [`EngineContext`],
//!   [`WorldHandle`]/[`WorldTx`], [`PlayerHandle`]/[`PlayerApi`] and
//!   [`EngineServices`]
//!
//! The game engine itself is an external collaborator. The bus never reaches
//! into engine internals; everything it needs is expressed through the traits
//! in [`engine`], which the embedding server implements and test suites fake.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod engine;
pub mod error;
pub mod id;
pub mod types;

pub use engine::{
    EngineContext, EngineServices, PlayerApi, PlayerHandle, PlayerWork, WorldHandle, WorldTx,
    WorldWork,
};
pub use error::{CoreError, CoreResult};
pub use id::{PluginId, WorldId};
pub use types::{
    Biome, BlockPos, BlockState, CommandSpec, Dialogue, Difficulty, EntityRef, GameMode,
    ItemStack, LiquidState, PlayerRef, Rotation, Title, Vec3, WorldRef,
};

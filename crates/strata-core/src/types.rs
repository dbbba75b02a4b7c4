//! Value types shared between the wire protocol and the engine surface.
//!
//! Everything here is plain data with serde derives. References crossing the
//! wire never rely on pointer identity; worlds travel as [`WorldRef`] triples
//! and entities/players as UUID strings, re-resolved through the registry on
//! the way back in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::WorldId;

/// A position or direction in continuous world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Construct a vector from its components.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// An integer block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Construct a block position from its coordinates.
    #[must_use]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A yaw/pitch view rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
}

/// A block identified by name plus state properties.
///
/// Property values are kept as strings on the wire; the engine decides how to
/// interpret them when resolving the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    /// Namespaced block name, e.g. `"minecraft:stone"`.
    pub name: String,
    /// State properties, sorted by key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    /// Construct a block state with no properties.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }
}

/// A liquid occupying a block position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidState {
    /// Namespaced liquid name, e.g. `"minecraft:water"`.
    pub name: String,
    /// Spread depth.
    pub depth: u8,
    /// Whether the liquid is falling.
    pub falling: bool,
}

/// An item stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Namespaced item name.
    pub name: String,
    /// Item metadata value.
    #[serde(default)]
    pub meta: i16,
    /// Stack count.
    pub count: i32,
}

impl ItemStack {
    /// Construct an item stack with zero metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, count: i32) -> Self {
        Self {
            name: name.into(),
            meta: 0,
            count,
        }
    }
}

/// The closed set of player game modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Survival play.
    Survival,
    /// Creative play.
    Creative,
    /// Adventure play.
    Adventure,
    /// Spectator.
    Spectator,
}

impl GameMode {
    /// Resolve a wire integer into a game mode.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownGameMode`] for integers outside the set.
    pub fn from_id(id: i32) -> Result<Self, CoreError> {
        match id {
            0 => Ok(Self::Survival),
            1 => Ok(Self::Creative),
            2 => Ok(Self::Adventure),
            3 => Ok(Self::Spectator),
            other => Err(CoreError::UnknownGameMode(other)),
        }
    }

    /// The wire integer for this game mode.
    #[must_use]
    pub fn id(self) -> i32 {
        match self {
            Self::Survival => 0,
            Self::Creative => 1,
            Self::Adventure => 2,
            Self::Spectator => 3,
        }
    }
}

/// The closed set of world difficulties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// No hostile spawns.
    Peaceful,
    /// Easy.
    Easy,
    /// Normal.
    Normal,
    /// Hard.
    Hard,
}

impl Difficulty {
    /// Resolve a wire integer into a difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownDifficulty`] for integers outside the set.
    pub fn from_id(id: i32) -> Result<Self, CoreError> {
        match id {
            0 => Ok(Self::Peaceful),
            1 => Ok(Self::Easy),
            2 => Ok(Self::Normal),
            3 => Ok(Self::Hard),
            other => Err(CoreError::UnknownDifficulty(other)),
        }
    }
}

/// A biome known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Biome {
    /// Numeric biome id.
    pub id: i32,
    /// Lowercase biome name.
    pub name: String,
}

/// An entity reference crossing the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity UUID rendered as a string.
    pub uuid: String,
}

/// A player reference crossing the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    /// Player UUID rendered as a string.
    pub uuid: String,
    /// Display name.
    pub name: String,
}

/// An external world reference, resolved by the registry.
///
/// Resolution prefers `id`, then `dimension`, then `name`, so that two
/// same-named worlds can still be disambiguated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldRef {
    /// Host-assigned world id, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WorldId>,
    /// Dimension name, matched case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// World name, matched case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WorldRef {
    /// Reference a world by host-assigned id.
    #[must_use]
    pub fn by_id(id: WorldId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Reference a world by dimension.
    #[must_use]
    pub fn by_dimension(dimension: impl Into<String>) -> Self {
        Self {
            dimension: Some(dimension.into()),
            ..Self::default()
        }
    }

    /// Reference a world by name.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Whether the reference carries no usable key at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.dimension.is_none() && self.name.is_none()
    }
}

/// A command declared by a plugin in its Hello.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Primary command name, without the leading slash.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Alias names, without leading slashes.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A title display sent to a player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Title {
    /// Main title text.
    pub title: String,
    /// Optional subtitle text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Fade-in time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in_ms: Option<u64>,
    /// Display time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay_ms: Option<u64>,
    /// Fade-out time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out_ms: Option<u64>,
}

/// An NPC dialogue window shown to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    /// Dialogue title.
    pub title: String,
    /// Optional body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Button labels, clamped by the engine.
    #[serde(default)]
    pub buttons: Vec<String>,
}

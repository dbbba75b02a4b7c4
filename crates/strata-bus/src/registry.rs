//! World, player and command directories.
//!
//! Worlds are tracked under three independent indices: the host-assigned id,
//! the lowercase dimension, and the lowercase name. Lookup prefers id, then
//! dimension, then name, so two same-named worlds stay distinguishable as
//! long as the caller knows an id. References crossing the wire carry index
//! keys, never pointers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use strata_core::{PlayerHandle, WorldHandle, WorldId, WorldRef};

/// Read-mostly directory of worlds and players.
pub struct Registry {
    next_world_id: AtomicU64,
    worlds: RwLock<WorldIndex>,
    players: RwLock<HashMap<Uuid, Arc<dyn PlayerHandle>>>,
}

#[derive(Default)]
struct WorldIndex {
    by_id: HashMap<WorldId, Arc<dyn WorldHandle>>,
    by_dimension: HashMap<String, WorldId>,
    by_name: HashMap<String, WorldId>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_world_id: AtomicU64::new(1),
            worlds: RwLock::new(WorldIndex::default()),
            players: RwLock::new(HashMap::new()),
        }
    }

    /// Register a world, returning its host-assigned id.
    ///
    /// Idempotent by instance identity: registering the same handle again
    /// returns the existing id and leaves the indices untouched.
    pub fn attach_world(&self, handle: Arc<dyn WorldHandle>) -> WorldId {
        let mut worlds = self.worlds.write().unwrap_or_else(PoisonError::into_inner);
        for (id, existing) in &worlds.by_id {
            if Arc::ptr_eq(existing, &handle) {
                return *id;
            }
        }
        let id = WorldId(self.next_world_id.fetch_add(1, Ordering::Relaxed));
        let dimension = handle.dimension().to_lowercase();
        let name = handle.name().to_lowercase();
        worlds.by_id.insert(id, handle);
        if !dimension.is_empty() {
            worlds.by_dimension.insert(dimension, id);
        }
        if !name.is_empty() {
            worlds.by_name.insert(name, id);
        }
        id
    }

    /// Remove a world. Dimension/name index entries are removed only while
    /// they still point at this instance, so a replacement registered under
    /// the same name is not disturbed.
    pub fn detach_world(&self, id: WorldId) {
        let mut worlds = self.worlds.write().unwrap_or_else(PoisonError::into_inner);
        if worlds.by_id.remove(&id).is_none() {
            return;
        }
        worlds.by_dimension.retain(|_, v| *v != id);
        worlds.by_name.retain(|_, v| *v != id);
    }

    /// Look up a world by id.
    #[must_use]
    pub fn world(&self, id: WorldId) -> Option<Arc<dyn WorldHandle>> {
        self.worlds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(&id)
            .cloned()
    }

    /// Resolve an external reference: id first, then dimension, then name.
    #[must_use]
    pub fn world_from_ref(&self, r: &WorldRef) -> Option<(WorldId, Arc<dyn WorldHandle>)> {
        let worlds = self.worlds.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = r.id {
            return worlds.by_id.get(&id).map(|h| (id, Arc::clone(h)));
        }
        if let Some(dimension) = &r.dimension {
            if let Some(id) = worlds.by_dimension.get(&dimension.to_lowercase()) {
                if let Some(h) = worlds.by_id.get(id) {
                    return Some((*id, Arc::clone(h)));
                }
            }
        }
        if let Some(name) = &r.name {
            if let Some(id) = worlds.by_name.get(&name.to_lowercase()) {
                if let Some(h) = worlds.by_id.get(id) {
                    return Some((*id, Arc::clone(h)));
                }
            }
        }
        None
    }

    /// Build the full wire reference for a registered world. Falls back to a
    /// bare id reference when the world is no longer registered.
    #[must_use]
    pub fn world_ref(&self, id: WorldId) -> WorldRef {
        match self.world(id) {
            Some(handle) => WorldRef {
                id: Some(id),
                dimension: Some(handle.dimension().to_lowercase()),
                name: Some(handle.name()),
            },
            None => WorldRef::by_id(id),
        }
    }

    /// Register a player handle under its UUID.
    pub fn attach_player(&self, handle: Arc<dyn PlayerHandle>) {
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.uuid(), handle);
    }

    /// Remove a player on quit.
    pub fn detach_player(&self, uuid: Uuid) {
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&uuid);
    }

    /// Look up a player by UUID.
    #[must_use]
    pub fn player(&self, uuid: Uuid) -> Option<Arc<dyn PlayerHandle>> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uuid)
            .cloned()
    }

    /// All currently attached players.
    #[must_use]
    pub fn players(&self) -> Vec<Arc<dyn PlayerHandle>> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

//! The action dispatcher.
//!
//! Runs on the receiving session's task. Player actions resolve the target
//! through the player directory and run inside that player's world
//! transaction; world actions resolve a [`WorldRef`] and run inside the
//! world's transaction. All `WorldSetBlock` actions addressing the same
//! world within one batch are grouped into a single transaction, preserving
//! their encounter order; everything else executes individually.
//!
//! Correlated actions get exactly one reply: `ok`, an error with one of the
//! fixed reason strings, or a query payload. Uncorrelated actions are
//! fire-and-forget.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use uuid::Uuid;

use strata_core::{
    BlockPos, BlockState, Difficulty, EngineServices, GameMode, PlayerApi, WorldHandle, WorldId,
    WorldRef,
};
use strata_proto::{
    Action, ActionBatch, ActionKind, ActionResult, HostPayload, HostToPlugin, QueryResult,
};

use crate::registry::Registry;
use crate::session::Session;

pub(crate) struct ActionDispatcher {
    registry: Arc<Registry>,
    engine: Arc<dyn EngineServices>,
}

/// Co-world `WorldSetBlock` actions collected for one transaction.
struct SetBlockGroup {
    world_id: WorldId,
    handle: Arc<dyn WorldHandle>,
    items: Vec<SetBlockItem>,
}

struct SetBlockItem {
    correlation_id: Option<String>,
    position: Option<BlockPos>,
    block: Option<BlockState>,
}

impl ActionDispatcher {
    pub(crate) fn new(registry: Arc<Registry>, engine: Arc<dyn EngineServices>) -> Self {
        Self { registry, engine }
    }

    /// Apply one inbound batch from `session`.
    pub(crate) async fn apply_batch(&self, session: &Arc<Session>, batch: ActionBatch) {
        let mut groups: Vec<SetBlockGroup> = Vec::new();
        let mut singles: Vec<Action> = Vec::new();

        for action in batch.actions {
            match action.kind {
                ActionKind::WorldSetBlock {
                    world,
                    position,
                    block,
                } => {
                    let Some((world_id, handle)) = self.registry.world_from_ref(&world) else {
                        self.reply_error(session, action.correlation_id, "world not found");
                        continue;
                    };
                    let item = SetBlockItem {
                        correlation_id: action.correlation_id,
                        position,
                        block,
                    };
                    match groups.iter_mut().find(|g| g.world_id == world_id) {
                        Some(group) => group.items.push(item),
                        None => groups.push(SetBlockGroup {
                            world_id,
                            handle,
                            items: vec![item],
                        }),
                    }
                }
                kind => singles.push(Action {
                    correlation_id: action.correlation_id,
                    kind,
                }),
            }
        }

        for group in groups {
            self.set_block_batch(session, group).await;
        }
        for action in singles {
            self.apply_single(session, action).await;
        }
    }

    /// Execute one world's grouped `SetBlock`s inside a single transaction.
    /// Argument validation happens up front so invalid entries answer
    /// immediately and never enter the transaction.
    async fn set_block_batch(&self, session: &Arc<Session>, group: SetBlockGroup) {
        let mut ops: Vec<(BlockPos, Option<BlockState>)> = Vec::with_capacity(group.items.len());
        let mut done: Vec<String> = Vec::new();

        for item in group.items {
            let Some(position) = item.position else {
                self.reply_error(session, item.correlation_id, "missing position");
                continue;
            };
            let block = match item.block {
                None => None,
                Some(state) => match self.engine.resolve_block(&state) {
                    Some(resolved) => Some(resolved),
                    None => {
                        self.reply_error(session, item.correlation_id, "unknown block");
                        continue;
                    }
                },
            };
            ops.push((position, block));
            if let Some(cid) = item.correlation_id {
                done.push(cid);
            }
        }

        if !ops.is_empty() {
            group
                .handle
                .exec(Box::new(move |tx| {
                    for (position, block) in ops {
                        tx.set_block(position, block);
                    }
                }))
                .await;
        }
        for cid in done {
            self.reply(session, ActionResult::ok(cid));
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn apply_single(&self, session: &Arc<Session>, action: Action) {
        let cid = action.correlation_id;
        match action.kind {
            ActionKind::SendChat {
                target_uuid,
                message,
            } => match target_uuid {
                None => {
                    self.engine.broadcast_chat(&message);
                    for player in self.registry.players() {
                        let message = message.clone();
                        player.exec(Box::new(move |api| api.message(&message))).await;
                    }
                    self.reply_ok(session, cid);
                }
                Some(target) => {
                    self.exec_player(session, cid, &target, move |api| api.message(&message))
                        .await;
                }
            },
            ActionKind::Teleport {
                player_uuid,
                position,
                rotation,
            } => {
                self.exec_player(session, cid, &player_uuid, move |api| {
                    api.teleport(position);
                    if let Some(rotation) = rotation {
                        api.set_rotation(rotation);
                    }
                })
                .await;
            }
            ActionKind::Kick {
                player_uuid,
                reason,
            } => {
                self.exec_player(session, cid, &player_uuid, move |api| {
                    api.disconnect(&reason);
                })
                .await;
            }
            ActionKind::SetGameMode {
                player_uuid,
                game_mode,
            } => {
                let Ok(mode) = GameMode::from_id(game_mode) else {
                    self.reply_error(session, cid, "unknown game mode");
                    return;
                };
                self.exec_player(session, cid, &player_uuid, move |api| {
                    api.set_game_mode(mode);
                })
                .await;
            }
            ActionKind::GiveItem { player_uuid, item } => {
                // An unresolvable stack is skipped, like unresolvable drop
                // entries in a block-break mutation.
                let item = self
                    .engine
                    .resolve_item(&item.name, item.meta)
                    .then_some(item);
                self.exec_player(session, cid, &player_uuid, move |api| {
                    if let Some(item) = item {
                        api.give_item(item);
                    }
                })
                .await;
            }
            ActionKind::SetHealth {
                player_uuid,
                health,
                max_health,
            } => {
                self.exec_player(session, cid, &player_uuid, move |api| {
                    if let Some(max) = max_health {
                        api.set_max_health(max);
                    }
                    api.set_health(health);
                })
                .await;
            }
            ActionKind::SetFood { player_uuid, food } => {
                self.exec_player(session, cid, &player_uuid, move |api| api.set_food(food))
                    .await;
            }
            ActionKind::SetExperience {
                player_uuid,
                level,
                progress,
                amount,
            } => {
                self.exec_player(session, cid, &player_uuid, move |api| {
                    if let Some(level) = level {
                        api.set_experience_level(level);
                    }
                    if let Some(progress) = progress {
                        api.set_experience_progress(progress);
                    }
                    if let Some(amount) = amount {
                        api.add_experience(amount);
                    }
                })
                .await;
            }
            ActionKind::AddEffect {
                player_uuid,
                effect_id,
                level,
                duration_ms,
                show_particles,
            } => {
                let duration = if duration_ms == 0 {
                    None
                } else {
                    Some(Duration::from_millis(duration_ms))
                };
                self.exec_player(session, cid, &player_uuid, move |api| {
                    api.add_effect(effect_id, level, duration, show_particles);
                })
                .await;
            }
            ActionKind::RemoveEffect {
                player_uuid,
                effect_id,
            } => {
                self.exec_player(session, cid, &player_uuid, move |api| {
                    api.remove_effect(effect_id);
                })
                .await;
            }
            ActionKind::SendTitle { player_uuid, title } => {
                self.exec_player(session, cid, &player_uuid, move |api| api.send_title(&title))
                    .await;
            }
            ActionKind::SendPopup {
                player_uuid,
                message,
            } => {
                self.exec_player(session, cid, &player_uuid, move |api| {
                    api.send_popup(&message);
                })
                .await;
            }
            ActionKind::SendTip {
                player_uuid,
                message,
            } => {
                self.exec_player(session, cid, &player_uuid, move |api| api.send_tip(&message))
                    .await;
            }
            ActionKind::ExecuteCommand {
                player_uuid,
                command,
            } => {
                let command = if command.starts_with('/') || command.is_empty() {
                    command
                } else {
                    format!("/{command}")
                };
                self.exec_player(session, cid, &player_uuid, move |api| {
                    api.execute_command(&command);
                })
                .await;
            }
            ActionKind::SendDialogue {
                player_uuid,
                dialogue,
                entity,
            } => {
                let Ok(entity_uuid) = Uuid::parse_str(&entity.uuid) else {
                    self.reply_error(session, cid, "entity not found");
                    return;
                };
                let Ok(uuid) = Uuid::parse_str(&player_uuid) else {
                    self.reply_error(session, cid, "invalid player_uuid");
                    return;
                };
                let Some(player) = self.registry.player(uuid) else {
                    self.reply_error(session, cid, "player not found");
                    return;
                };
                let (tx, rx) = oneshot::channel();
                player
                    .exec(Box::new(move |api| {
                        let found = api.has_entity(entity_uuid);
                        if found {
                            api.send_dialogue(&dialogue, entity_uuid);
                        }
                        let _ = tx.send(found);
                    }))
                    .await;
                if rx.await.unwrap_or(false) {
                    self.reply_ok(session, cid);
                } else {
                    self.reply_error(session, cid, "entity not found");
                }
            }
            ActionKind::WorldSetBlock { .. } => {
                // Grouped by apply_batch; unreachable through that path.
            }
            ActionKind::WorldSetDefaultGameMode { world, game_mode } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Ok(mode) = GameMode::from_id(game_mode) else {
                    self.reply_error(session, cid, "unknown game mode");
                    return;
                };
                handle.set_default_game_mode(mode);
                self.reply_ok(session, cid);
            }
            ActionKind::WorldSetDifficulty { world, difficulty } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Ok(difficulty) = Difficulty::from_id(difficulty) else {
                    self.reply_error(session, cid, "unknown difficulty");
                    return;
                };
                handle.set_difficulty(difficulty);
                self.reply_ok(session, cid);
            }
            ActionKind::WorldSetTickRange { world, range } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                if range < 0 {
                    self.reply_error(session, cid, "tick range must be non-negative");
                    return;
                }
                handle.set_tick_range(range);
                self.reply_ok(session, cid);
            }
            ActionKind::WorldSetTime { world, time } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                handle.set_time(time);
                self.reply_ok(session, cid);
            }
            ActionKind::WorldStopTime { world } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                handle.stop_time();
                self.reply_ok(session, cid);
            }
            ActionKind::WorldStartTime { world } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                handle.start_time();
                self.reply_ok(session, cid);
            }
            ActionKind::WorldSetSpawn { world, position } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Some(position) = position else {
                    self.reply_error(session, cid, "missing spawn position");
                    return;
                };
                handle.set_spawn(position);
                self.reply_ok(session, cid);
            }
            ActionKind::WorldSetBiome {
                world,
                position,
                biome_id,
                biome_name,
            } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Some(position) = position else {
                    self.reply_error(session, cid, "missing position");
                    return;
                };
                let biome = if let Some(id) = biome_id {
                    match self.engine.biome_by_id(id) {
                        Some(biome) => biome,
                        None => {
                            self.reply_error(session, cid, "unknown biome ID");
                            return;
                        }
                    }
                } else if let Some(name) = biome_name {
                    match self.engine.biome_by_name(&name) {
                        Some(biome) => biome,
                        None => {
                            self.reply_error(session, cid, "unknown biome name");
                            return;
                        }
                    }
                } else {
                    // Neither selector given; distinct from a lookup miss.
                    self.reply_error(session, cid, "missing biome_id");
                    return;
                };
                handle
                    .exec(Box::new(move |tx| tx.set_biome(position, &biome)))
                    .await;
                self.reply_ok(session, cid);
            }
            ActionKind::WorldSetLiquid {
                world,
                position,
                liquid,
            } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Some(position) = position else {
                    self.reply_error(session, cid, "missing position");
                    return;
                };
                let (tx, rx) = oneshot::channel();
                handle
                    .exec(Box::new(move |world_tx| match liquid {
                        Some(liquid) => {
                            world_tx.set_liquid(position, Some(liquid));
                            let _ = tx.send(true);
                        }
                        None => {
                            // Clearing only makes sense on a liquid block.
                            if world_tx.liquid(position).is_some() {
                                world_tx.set_liquid(position, None);
                                let _ = tx.send(true);
                            } else {
                                let _ = tx.send(false);
                            }
                        }
                    }))
                    .await;
                if rx.await.unwrap_or(false) {
                    self.reply_ok(session, cid);
                } else {
                    self.reply_error(session, cid, "block is not a liquid");
                }
            }
            ActionKind::WorldScheduleBlockUpdate {
                world,
                position,
                delay_ms,
            } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Some(position) = position else {
                    self.reply_error(session, cid, "missing position");
                    return;
                };
                let delay = Duration::from_millis(delay_ms);
                handle
                    .exec(Box::new(move |tx| tx.schedule_block_update(position, delay)))
                    .await;
                self.reply_ok(session, cid);
            }
            ActionKind::WorldQueryBlock { world, position } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Some(position) = position else {
                    self.reply_error(session, cid, "missing position");
                    return;
                };
                let (tx, rx) = oneshot::channel();
                handle
                    .exec(Box::new(move |world_tx| {
                        let _ = tx.send(world_tx.block(position));
                    }))
                    .await;
                let block = rx.await.unwrap_or(None);
                self.reply_query(session, cid, QueryResult::Block { block });
            }
            ActionKind::WorldQueryLiquid { world, position } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let Some(position) = position else {
                    self.reply_error(session, cid, "missing position");
                    return;
                };
                let (tx, rx) = oneshot::channel();
                handle
                    .exec(Box::new(move |world_tx| {
                        let _ = tx.send(world_tx.liquid(position));
                    }))
                    .await;
                match rx.await.unwrap_or(None) {
                    Some(liquid) => {
                        self.reply_query(session, cid, QueryResult::Liquid { liquid });
                    }
                    None => self.reply_error(session, cid, "block is not a liquid"),
                }
            }
            ActionKind::WorldQueryPlayers { world } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let players = handle.players();
                self.reply_query(session, cid, QueryResult::Players { players });
            }
            ActionKind::WorldQueryDefaultGameMode { world } => {
                let Some((_, handle)) = self.world(session, &cid, &world) else {
                    return;
                };
                let game_mode = handle.default_game_mode();
                self.reply_query(session, cid, QueryResult::GameMode { game_mode });
            }
        }
    }

    /// Resolve a player by UUID string and run `work` inside their world
    /// transaction, answering a correlated action with ok or the matching
    /// error.
    async fn exec_player(
        &self,
        session: &Arc<Session>,
        cid: Option<String>,
        player_uuid: &str,
        work: impl FnOnce(&mut dyn PlayerApi) + Send + 'static,
    ) {
        let Ok(uuid) = Uuid::parse_str(player_uuid) else {
            self.reply_error(session, cid, "invalid player_uuid");
            return;
        };
        let Some(player) = self.registry.player(uuid) else {
            self.reply_error(session, cid, "player not found");
            return;
        };
        player.exec(Box::new(work)).await;
        self.reply_ok(session, cid);
    }

    /// Resolve a world reference, answering `world not found` on failure.
    fn world(
        &self,
        session: &Arc<Session>,
        cid: &Option<String>,
        world: &WorldRef,
    ) -> Option<(WorldId, Arc<dyn WorldHandle>)> {
        match self.registry.world_from_ref(world) {
            Some(found) => Some(found),
            None => {
                self.reply_error(session, cid.clone(), "world not found");
                None
            }
        }
    }

    fn reply(&self, session: &Arc<Session>, result: ActionResult) {
        session.enqueue(HostToPlugin {
            plugin_id: session.id().clone(),
            payload: HostPayload::ActionResult(result),
        });
    }

    fn reply_ok(&self, session: &Arc<Session>, cid: Option<String>) {
        if let Some(cid) = cid {
            self.reply(session, ActionResult::ok(cid));
        }
    }

    fn reply_error(&self, session: &Arc<Session>, cid: Option<String>, reason: &str) {
        if let Some(cid) = cid {
            self.reply(session, ActionResult::error(cid, reason));
        }
    }

    fn reply_query(&self, session: &Arc<Session>, cid: Option<String>, result: QueryResult) {
        if let Some(cid) = cid {
            self.reply(session, ActionResult::query(cid, result));
        }
    }
}

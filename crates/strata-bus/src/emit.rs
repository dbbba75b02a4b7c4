//! The emit surface: engine callbacks in, mutations out.
//!
//! The engine's handler implementations call these methods from their
//! callbacks, passing the cancellable context plus `&mut` views of the
//! fields the callback exposes. Each method builds the matching envelope,
//! fans it out through the router, and, when nothing cancelled, applies
//! returned mutations field by field. Because every result has arrived by
//! then, the callback observes one consistent post-state.
//!
//! Mutations whose variant does not match the event type are ignored. When
//! several sessions mutate the same field, the last one processed wins.

use std::time::Duration;

use strata_core::{
    BlockPos, BlockState, EngineContext, ItemStack, LiquidState, PlayerRef, Rotation, Vec3,
    WorldId,
};
use strata_proto::{
    BlockBreakEvent, BlockPlaceEvent, ChatEvent, CommandEvent, EventMutation, EventPayload,
    EventType, PlayerDeathEvent, PlayerExperienceGainEvent, PlayerFoodLossEvent, PlayerHealEvent,
    PlayerHurtEvent, PlayerItemDropEvent, PlayerJoinEvent, PlayerMoveEvent, PlayerQuitEvent,
    PlayerTeleportEvent, WorldCloseEvent, WorldExplosionEvent, WorldFireSpreadEvent,
    WorldLiquidFlowEvent,
};

use crate::host::PluginHost;
use crate::mutate;

impl PluginHost {
    /// Announce a player join. Broadcast; never waits.
    pub async fn emit_player_join(&self, player: &PlayerRef) {
        self.broadcast(
            EventType::PlayerJoin,
            EventPayload::PlayerJoin(PlayerJoinEvent {
                player_uuid: player.uuid.clone(),
                name: player.name.clone(),
            }),
        )
        .await;
    }

    /// Announce a player quit. Broadcast; never waits.
    pub async fn emit_player_quit(&self, player: &PlayerRef) {
        self.broadcast(
            EventType::PlayerQuit,
            EventPayload::PlayerQuit(PlayerQuitEvent {
                player_uuid: player.uuid.clone(),
                name: player.name.clone(),
            }),
        )
        .await;
    }

    /// A chat message is about to be broadcast. Plugins may cancel it or
    /// rewrite `message`.
    pub async fn emit_chat(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        message: &mut String,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::Chat,
                EventPayload::Chat(ChatEvent {
                    player_uuid: player.uuid.clone(),
                    name: player.name.clone(),
                    message: message.clone(),
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::Chat(m)) = result.mutation {
                mutate::apply(message, m.message);
            }
        }
    }

    /// A command is about to execute. Plugins may cancel it.
    pub async fn emit_command(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        command: &str,
        args: &[String],
    ) {
        let mut raw = format!("/{command}");
        if !args.is_empty() {
            raw.push(' ');
            raw.push_str(&args.join(" "));
        }
        let _ = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::Command,
                EventPayload::Command(CommandEvent {
                    player_uuid: player.uuid.clone(),
                    name: player.name.clone(),
                    raw,
                    command: command.to_string(),
                    args: args.to_vec(),
                }),
            )
            .await;
    }

    /// A block break is resolving. Plugins may cancel it, replace the drop
    /// list, or change the experience reward.
    pub async fn emit_block_break(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        world: WorldId,
        position: BlockPos,
        drops: &mut Vec<ItemStack>,
        xp: &mut i64,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::BlockBreak,
                EventPayload::BlockBreak(BlockBreakEvent {
                    player_uuid: player.uuid.clone(),
                    name: player.name.clone(),
                    world: self.inner.registry.world_ref(world),
                    position,
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::BlockBreak(m)) = result.mutation {
                mutate::apply_drops(drops, m.drops, self.inner.engine.as_ref());
                mutate::apply_widened(xp, m.xp);
            }
        }
    }

    /// A block placement is resolving. Plugins may cancel it.
    pub async fn emit_block_place(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        world: WorldId,
        position: BlockPos,
        block: &BlockState,
    ) {
        let _ = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::BlockPlace,
                EventPayload::BlockPlace(BlockPlaceEvent {
                    player_uuid: player.uuid.clone(),
                    name: player.name.clone(),
                    world: self.inner.registry.world_ref(world),
                    position,
                    block: block.clone(),
                }),
            )
            .await;
    }

    /// A player is about to take damage. Plugins may cancel, scale the
    /// damage, or adjust the attack immunity window.
    pub async fn emit_player_hurt(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        damage: &mut f64,
        immunity: &mut Duration,
        source: &str,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::PlayerHurt,
                EventPayload::PlayerHurt(PlayerHurtEvent {
                    player_uuid: player.uuid.clone(),
                    damage: *damage,
                    immunity_ms: u64::try_from(immunity.as_millis()).unwrap_or(u64::MAX),
                    source: source.to_string(),
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::PlayerHurt(m)) = result.mutation {
                mutate::apply(damage, m.damage);
                mutate::apply_ms(immunity, m.immunity_ms);
            }
        }
    }

    /// A player is about to be healed. Plugins may cancel or scale it.
    pub async fn emit_player_heal(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        amount: &mut f64,
        source: &str,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::PlayerHeal,
                EventPayload::PlayerHeal(PlayerHealEvent {
                    player_uuid: player.uuid.clone(),
                    amount: *amount,
                    source: source.to_string(),
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::PlayerHeal(m)) = result.mutation {
                mutate::apply(amount, m.amount);
            }
        }
    }

    /// A player is about to lose food. Plugins may cancel or override the
    /// resulting level.
    pub async fn emit_food_loss(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        from: i32,
        to: &mut i32,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::PlayerFoodLoss,
                EventPayload::PlayerFoodLoss(PlayerFoodLossEvent {
                    player_uuid: player.uuid.clone(),
                    from,
                    to: *to,
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::PlayerFoodLoss(m)) = result.mutation {
                mutate::apply(to, m.food);
            }
        }
    }

    /// A player moved. Plugins may cancel the movement or redirect it.
    pub async fn emit_player_move(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        position: &mut Vec3,
        rotation: Rotation,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::PlayerMove,
                EventPayload::PlayerMove(PlayerMoveEvent {
                    player_uuid: player.uuid.clone(),
                    position: *position,
                    rotation,
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::PlayerMove(m)) = result.mutation {
                mutate::apply(position, m.position);
            }
        }
    }

    /// A player is being teleported. Plugins may cancel or redirect it.
    pub async fn emit_player_teleport(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        position: &mut Vec3,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::PlayerTeleport,
                EventPayload::PlayerTeleport(PlayerTeleportEvent {
                    player_uuid: player.uuid.clone(),
                    position: *position,
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::PlayerTeleport(m)) = result.mutation {
                mutate::apply(position, m.position);
            }
        }
    }

    /// A player is gaining experience. Plugins may cancel or change the
    /// amount.
    pub async fn emit_experience_gain(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        amount: &mut i64,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::PlayerExperienceGain,
                EventPayload::PlayerExperienceGain(PlayerExperienceGainEvent {
                    player_uuid: player.uuid.clone(),
                    amount: *amount,
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::PlayerExperienceGain(m)) = result.mutation {
                mutate::apply_widened(amount, m.amount);
            }
        }
    }

    /// A player is dropping an item. Plugins may cancel it.
    pub async fn emit_item_drop(
        &self,
        ctx: &dyn EngineContext,
        player: &PlayerRef,
        item: &ItemStack,
    ) {
        let _ = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::PlayerItemDrop,
                EventPayload::PlayerItemDrop(PlayerItemDropEvent {
                    player_uuid: player.uuid.clone(),
                    item: item.clone(),
                }),
            )
            .await;
    }

    /// Announce a player death. Broadcast; never waits.
    pub async fn emit_player_death(&self, player: &PlayerRef, source: &str) {
        self.broadcast(
            EventType::PlayerDeath,
            EventPayload::PlayerDeath(PlayerDeathEvent {
                player_uuid: player.uuid.clone(),
                name: player.name.clone(),
                source: source.to_string(),
            }),
        )
        .await;
    }

    /// Liquid is flowing. Plugins may cancel the flow.
    pub async fn emit_world_liquid_flow(
        &self,
        ctx: &dyn EngineContext,
        world: WorldId,
        from: BlockPos,
        into: BlockPos,
        liquid: &LiquidState,
        replaced: Option<&BlockState>,
    ) {
        let _ = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::WorldLiquidFlow,
                EventPayload::WorldLiquidFlow(WorldLiquidFlowEvent {
                    world: self.inner.registry.world_ref(world),
                    from,
                    into,
                    liquid: liquid.clone(),
                    replaced: replaced.cloned(),
                }),
            )
            .await;
    }

    /// Fire is spreading. Plugins may cancel the spread.
    pub async fn emit_world_fire_spread(
        &self,
        ctx: &dyn EngineContext,
        world: WorldId,
        from: BlockPos,
        to: BlockPos,
    ) {
        let _ = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::WorldFireSpread,
                EventPayload::WorldFireSpread(WorldFireSpreadEvent {
                    world: self.inner.registry.world_ref(world),
                    from,
                    to,
                }),
            )
            .await;
    }

    /// An explosion is resolving. Plugins may cancel it, trim the destroyed
    /// block list, or adjust drop chance and fire.
    #[allow(clippy::too_many_arguments)]
    pub async fn emit_world_explosion(
        &self,
        ctx: &dyn EngineContext,
        world: WorldId,
        position: Vec3,
        block_positions: &mut Vec<BlockPos>,
        item_drop_chance: &mut f64,
        spawn_fire: &mut bool,
    ) {
        let results = self
            .inner
            .router
            .dispatch_cancellable(
                &self.inner.sessions,
                ctx,
                EventType::WorldExplosion,
                EventPayload::WorldExplosion(WorldExplosionEvent {
                    world: self.inner.registry.world_ref(world),
                    position,
                    block_positions: block_positions.clone(),
                    item_drop_chance: *item_drop_chance,
                    spawn_fire: *spawn_fire,
                }),
            )
            .await;
        for result in results {
            if let Some(EventMutation::WorldExplosion(m)) = result.mutation {
                mutate::apply(block_positions, m.block_positions);
                mutate::apply(item_drop_chance, m.item_drop_chance);
                mutate::apply(spawn_fire, m.spawn_fire);
            }
        }
    }

    /// A world is closing. Broadcast, then dropped from the registry.
    pub async fn emit_world_close(&self, world: WorldId) {
        let world_ref = self.inner.registry.world_ref(world);
        self.broadcast(
            EventType::WorldClose,
            EventPayload::WorldClose(WorldCloseEvent { world: world_ref }),
        )
        .await;
        self.inner.registry.detach_world(world);
    }

    async fn broadcast(&self, event_type: EventType, payload: EventPayload) {
        let _ = self
            .inner
            .router
            .dispatch(&self.inner.sessions, event_type, payload, false)
            .await;
    }
}

//! Action dispatcher coverage: the argument-validation error strings,
//! correlated replies, world-scoped writes, and query actions.

mod common;

use std::time::Duration;

use common::{FakeEngine, FakePlayer, FakeWorld, TestPlugin, init_tracing, start_host};
use strata_bus::PluginHost;
use strata_core::{
    BlockPos, BlockState, Dialogue, EntityRef, GameMode, ItemStack, LiquidState, PlayerRef, Vec3,
    WorldRef,
};
use strata_proto::{Action, ActionBatch, ActionKind, QueryResult};
use uuid::Uuid;

async fn world_host(plugin: &str) -> (PluginHost, std::sync::Arc<FakeWorld>, TestPlugin) {
    let engine = FakeEngine::new();
    let host = start_host(engine, &[plugin]).await;
    let world = FakeWorld::new("overworld", "overworld");
    host.attach_world(world.clone());
    let client = TestPlugin::connect(host.local_addr(), plugin).await;
    (host, world, client)
}

async fn expect_error(plugin: &mut TestPlugin, cid: &str, reason: &str) {
    let result = plugin.recv_action_result().await;
    assert_eq!(result.correlation_id, cid);
    assert!(!result.ok, "expected failure, got ok");
    assert_eq!(result.error.as_deref(), Some(reason));
}

async fn expect_ok(plugin: &mut TestPlugin, cid: &str) {
    let result = plugin.recv_action_result().await;
    assert_eq!(result.correlation_id, cid);
    assert!(result.ok, "unexpected error: {:?}", result.error);
}

#[tokio::test]
async fn missing_position_on_set_block() {
    init_tracing();
    let (host, _world, mut plugin) = world_host("builder").await;
    plugin
        .send_actions(ActionBatch {
            actions: vec![Action::correlated(
                "c1",
                ActionKind::WorldSetBlock {
                    world: WorldRef::by_name("overworld"),
                    position: None,
                    block: Some(BlockState::named("minecraft:stone")),
                },
            )],
        })
        .await;
    expect_error(&mut plugin, "c1", "missing position").await;
    host.shutdown("test done").await;
}

#[tokio::test]
async fn undecodable_block_state() {
    init_tracing();
    let (host, world, mut plugin) = world_host("builder").await;
    plugin
        .send_actions(ActionBatch {
            actions: vec![Action::correlated(
                "c1",
                ActionKind::WorldSetBlock {
                    world: WorldRef::by_name("overworld"),
                    position: Some(BlockPos::new(0, 0, 0)),
                    block: Some(BlockState::named("modded:mystery")),
                },
            )],
        })
        .await;
    expect_error(&mut plugin, "c1", "unknown block").await;
    assert_eq!(world.exec_count(), 0, "invalid entries never open a transaction");
    host.shutdown("test done").await;
}

#[tokio::test]
async fn unknown_game_mode_and_difficulty() {
    init_tracing();
    let (host, _world, mut plugin) = world_host("admin").await;
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "c1",
                    ActionKind::WorldSetDefaultGameMode {
                        world: WorldRef::by_name("overworld"),
                        game_mode: 9,
                    },
                ),
                Action::correlated(
                    "c2",
                    ActionKind::WorldSetDifficulty {
                        world: WorldRef::by_name("overworld"),
                        difficulty: -1,
                    },
                ),
            ],
        })
        .await;
    expect_error(&mut plugin, "c1", "unknown game mode").await;
    expect_error(&mut plugin, "c2", "unknown difficulty").await;
    host.shutdown("test done").await;
}

#[tokio::test]
async fn negative_tick_range() {
    init_tracing();
    let (host, world, mut plugin) = world_host("admin").await;
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "c1",
                    ActionKind::WorldSetTickRange {
                        world: WorldRef::by_name("overworld"),
                        range: -4,
                    },
                ),
                Action::correlated(
                    "c2",
                    ActionKind::WorldSetTickRange {
                        world: WorldRef::by_name("overworld"),
                        range: 8,
                    },
                ),
            ],
        })
        .await;
    expect_error(&mut plugin, "c1", "tick range must be non-negative").await;
    expect_ok(&mut plugin, "c2").await;
    assert_eq!(world.settings.lock().unwrap().tick_range, 8);
    host.shutdown("test done").await;
}

#[tokio::test]
async fn biome_errors_and_success() {
    init_tracing();
    let (host, world, mut plugin) = world_host("terraformer").await;
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "c1",
                    ActionKind::WorldSetBiome {
                        world: WorldRef::by_name("overworld"),
                        position: Some(BlockPos::new(0, 0, 0)),
                        biome_id: Some(777),
                        biome_name: None,
                    },
                ),
                Action::correlated(
                    "c2",
                    ActionKind::WorldSetBiome {
                        world: WorldRef::by_name("overworld"),
                        position: Some(BlockPos::new(0, 0, 0)),
                        biome_id: None,
                        biome_name: Some("the-moon".into()),
                    },
                ),
                Action::correlated(
                    "c3",
                    ActionKind::WorldSetBiome {
                        world: WorldRef::by_name("overworld"),
                        position: None,
                        biome_id: Some(0),
                        biome_name: None,
                    },
                ),
                // Position present but neither id nor name given.
                Action::correlated(
                    "c4",
                    ActionKind::WorldSetBiome {
                        world: WorldRef::by_name("overworld"),
                        position: Some(BlockPos::new(0, 0, 0)),
                        biome_id: None,
                        biome_name: None,
                    },
                ),
                Action::correlated(
                    "c5",
                    ActionKind::WorldSetBiome {
                        world: WorldRef::by_name("overworld"),
                        position: Some(BlockPos::new(5, 60, 5)),
                        biome_id: None,
                        biome_name: Some("desert".into()),
                    },
                ),
            ],
        })
        .await;
    expect_error(&mut plugin, "c1", "unknown biome ID").await;
    expect_error(&mut plugin, "c2", "unknown biome name").await;
    expect_error(&mut plugin, "c3", "missing position").await;
    expect_error(&mut plugin, "c4", "missing biome_id").await;
    expect_ok(&mut plugin, "c5").await;
    let state = world.state.lock().unwrap();
    assert_eq!(state.biomes.get(&BlockPos::new(5, 60, 5)).unwrap().name, "desert");
    drop(state);
    host.shutdown("test done").await;
}

#[tokio::test]
async fn liquid_actions_on_non_liquid_blocks() {
    init_tracing();
    let (host, world, mut plugin) = world_host("plumber").await;
    let pos = BlockPos::new(1, 62, 1);
    let water = LiquidState {
        name: "minecraft:water".into(),
        depth: 8,
        falling: false,
    };
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                // Clearing where nothing is liquid.
                Action::correlated(
                    "c1",
                    ActionKind::WorldSetLiquid {
                        world: WorldRef::by_name("overworld"),
                        position: Some(pos),
                        liquid: None,
                    },
                ),
                // Querying where nothing is liquid.
                Action::correlated(
                    "c2",
                    ActionKind::WorldQueryLiquid {
                        world: WorldRef::by_name("overworld"),
                        position: Some(pos),
                    },
                ),
                // Placing, then querying back.
                Action::correlated(
                    "c3",
                    ActionKind::WorldSetLiquid {
                        world: WorldRef::by_name("overworld"),
                        position: Some(pos),
                        liquid: Some(water.clone()),
                    },
                ),
                Action::correlated(
                    "c4",
                    ActionKind::WorldQueryLiquid {
                        world: WorldRef::by_name("overworld"),
                        position: Some(pos),
                    },
                ),
            ],
        })
        .await;
    expect_error(&mut plugin, "c1", "block is not a liquid").await;
    expect_error(&mut plugin, "c2", "block is not a liquid").await;
    expect_ok(&mut plugin, "c3").await;
    let result = plugin.recv_action_result().await;
    assert_eq!(result.correlation_id, "c4");
    assert!(result.ok);
    assert!(matches!(
        result.result,
        Some(QueryResult::Liquid { liquid }) if liquid == water
    ));
    assert!(world.state.lock().unwrap().liquids.contains_key(&pos));
    host.shutdown("test done").await;
}

#[tokio::test]
async fn block_query_round_trip() {
    init_tracing();
    let (host, _world, mut plugin) = world_host("surveyor").await;
    let pos = BlockPos::new(7, 70, 7);
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "set",
                    ActionKind::WorldSetBlock {
                        world: WorldRef::by_name("overworld"),
                        position: Some(pos),
                        block: Some(BlockState::named("minecraft:diamond_ore")),
                    },
                ),
                Action::correlated(
                    "get",
                    ActionKind::WorldQueryBlock {
                        world: WorldRef::by_name("overworld"),
                        position: Some(pos),
                    },
                ),
                Action::correlated(
                    "air",
                    ActionKind::WorldQueryBlock {
                        world: WorldRef::by_name("overworld"),
                        position: Some(BlockPos::new(-1, -1, -1)),
                    },
                ),
            ],
        })
        .await;
    expect_ok(&mut plugin, "set").await;
    let result = plugin.recv_action_result().await;
    assert_eq!(result.correlation_id, "get");
    assert!(matches!(
        result.result,
        Some(QueryResult::Block { block: Some(b) }) if b.name == "minecraft:diamond_ore"
    ));
    let result = plugin.recv_action_result().await;
    assert_eq!(result.correlation_id, "air");
    assert!(matches!(result.result, Some(QueryResult::Block { block: None })));
    host.shutdown("test done").await;
}

#[tokio::test]
async fn world_queries_for_players_and_game_mode() {
    init_tracing();
    let (host, world, mut plugin) = world_host("observer").await;
    world.players_in_world.lock().unwrap().push(PlayerRef {
        uuid: Uuid::new_v4().to_string(),
        name: "alex".into(),
    });
    world.settings.lock().unwrap().default_game_mode = GameMode::Creative;

    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "players",
                    ActionKind::WorldQueryPlayers {
                        world: WorldRef::by_dimension("overworld"),
                    },
                ),
                Action::correlated(
                    "mode",
                    ActionKind::WorldQueryDefaultGameMode {
                        world: WorldRef::by_name("overworld"),
                    },
                ),
            ],
        })
        .await;

    let result = plugin.recv_action_result().await;
    assert_eq!(result.correlation_id, "players");
    assert!(matches!(
        result.result,
        Some(QueryResult::Players { players }) if players.len() == 1 && players[0].name == "alex"
    ));
    let result = plugin.recv_action_result().await;
    assert!(matches!(
        result.result,
        Some(QueryResult::GameMode { game_mode: GameMode::Creative })
    ));
    host.shutdown("test done").await;
}

#[tokio::test]
async fn dialogue_requires_a_present_entity() {
    init_tracing();
    let engine = FakeEngine::new();
    let host = start_host(engine, &["narrator"]).await;
    let player = FakePlayer::new("alex");
    let npc = Uuid::new_v4();
    player.state.lock().unwrap().entities.insert(npc);
    host.attach_player(player.clone()).await;

    let mut plugin = TestPlugin::connect(host.local_addr(), "narrator").await;
    let dialogue = Dialogue {
        title: "Trader".into(),
        body: Some("Got wares.".into()),
        buttons: vec!["Buy".into(), "Leave".into()],
    };
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "c1",
                    ActionKind::SendDialogue {
                        player_uuid: player.player_ref().uuid,
                        dialogue: dialogue.clone(),
                        entity: EntityRef {
                            uuid: Uuid::new_v4().to_string(),
                        },
                    },
                ),
                Action::correlated(
                    "c2",
                    ActionKind::SendDialogue {
                        player_uuid: player.player_ref().uuid,
                        dialogue: dialogue.clone(),
                        entity: EntityRef {
                            uuid: npc.to_string(),
                        },
                    },
                ),
            ],
        })
        .await;
    expect_error(&mut plugin, "c1", "entity not found").await;
    expect_ok(&mut plugin, "c2").await;
    assert_eq!(player.state.lock().unwrap().dialogues.len(), 1);
    host.shutdown("test done").await;
}

#[tokio::test]
async fn player_lookup_failures() {
    init_tracing();
    let engine = FakeEngine::new();
    let host = start_host(engine, &["mover"]).await;
    let mut plugin = TestPlugin::connect(host.local_addr(), "mover").await;

    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "c1",
                    ActionKind::Kick {
                        player_uuid: "not-a-uuid".into(),
                        reason: "bye".into(),
                    },
                ),
                Action::correlated(
                    "c2",
                    ActionKind::Kick {
                        player_uuid: Uuid::new_v4().to_string(),
                        reason: "bye".into(),
                    },
                ),
            ],
        })
        .await;
    expect_error(&mut plugin, "c1", "invalid player_uuid").await;
    expect_error(&mut plugin, "c2", "player not found").await;
    host.shutdown("test done").await;
}

#[tokio::test]
async fn player_state_actions_apply_in_order() {
    init_tracing();
    let engine = FakeEngine::new();
    let host = start_host(engine, &["gm"]).await;
    let player = FakePlayer::new("alex");
    host.attach_player(player.clone()).await;
    let uuid = player.player_ref().uuid;

    let mut plugin = TestPlugin::connect(host.local_addr(), "gm").await;
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::correlated(
                    "mode",
                    ActionKind::SetGameMode {
                        player_uuid: uuid.clone(),
                        game_mode: 1,
                    },
                ),
                Action::correlated(
                    "health",
                    ActionKind::SetHealth {
                        player_uuid: uuid.clone(),
                        health: 12.5,
                        max_health: Some(30.0),
                    },
                ),
                Action::correlated(
                    "item",
                    ActionKind::GiveItem {
                        player_uuid: uuid.clone(),
                        item: ItemStack::new("minecraft:apple", 3),
                    },
                ),
                // Unknown to the engine's item registry: skipped, not an
                // error.
                Action::correlated(
                    "bad-item",
                    ActionKind::GiveItem {
                        player_uuid: uuid.clone(),
                        item: ItemStack::new("minecraft:unobtainium", 1),
                    },
                ),
                Action::correlated(
                    "effect",
                    ActionKind::AddEffect {
                        player_uuid: uuid.clone(),
                        effect_id: 1,
                        level: 2,
                        duration_ms: 30_000,
                        show_particles: true,
                    },
                ),
                Action::correlated(
                    "cmd",
                    ActionKind::ExecuteCommand {
                        player_uuid: uuid.clone(),
                        command: "spawn".into(),
                    },
                ),
                Action::correlated(
                    "move",
                    ActionKind::Teleport {
                        player_uuid: uuid,
                        position: Vec3::new(0.5, 80.0, 0.5),
                        rotation: Some(strata_core::Rotation {
                            yaw: 90.0,
                            pitch: 0.0,
                        }),
                    },
                ),
            ],
        })
        .await;
    for cid in ["mode", "health", "item", "bad-item", "effect", "cmd", "move"] {
        expect_ok(&mut plugin, cid).await;
    }

    let state = player.state.lock().unwrap();
    assert_eq!(state.game_mode, Some(GameMode::Creative));
    assert!((state.health - 12.5).abs() < f64::EPSILON);
    assert!((state.max_health - 30.0).abs() < f64::EPSILON);
    assert_eq!(state.items, vec![ItemStack::new("minecraft:apple", 3)]);
    assert_eq!(
        state.effects.get(&1),
        Some(&(2, Some(Duration::from_secs(30)), true))
    );
    assert_eq!(state.executed_commands, vec!["/spawn"]);
    assert!((state.rotation.yaw - 90.0).abs() < f32::EPSILON);
    drop(state);
    host.shutdown("test done").await;
}

#[tokio::test]
async fn uncorrelated_actions_get_no_reply() {
    init_tracing();
    let (host, world, mut plugin) = world_host("quiet").await;
    plugin
        .send_actions(ActionBatch {
            actions: vec![
                Action::new(ActionKind::WorldSetTime {
                    world: WorldRef::by_name("overworld"),
                    time: 6000,
                }),
                // A correlated follow-up proves the first produced no reply.
                Action::correlated(
                    "probe",
                    ActionKind::WorldSetTime {
                        world: WorldRef::by_name("overworld"),
                        time: 9000,
                    },
                ),
            ],
        })
        .await;
    let result = plugin.recv_action_result().await;
    assert_eq!(result.correlation_id, "probe");
    assert_eq!(world.settings.lock().unwrap().time, 9000);
    host.shutdown("test done").await;
}

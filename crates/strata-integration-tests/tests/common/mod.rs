//! Shared fixtures: a fake engine, fake worlds and players, and a
//! wire-level plugin client that talks to the host over real sockets.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use strata_bus::{FrameStream, ListenAddr, PluginHost};
use strata_config::Config;
use strata_core::{
    Biome, BlockPos, BlockState, CommandSpec, Dialogue, Difficulty, EngineContext, EngineServices,
    GameMode, ItemStack, LiquidState, PlayerApi, PlayerHandle, PlayerRef, PlayerWork, Rotation,
    Title, Vec3, WorldHandle, WorldWork,
};
use strata_proto::{
    ActionBatch, ActionResult, EventEnvelope, EventResult, EventSubscribe, EventType, HostPayload,
    HostToPlugin, PluginHello, PluginPayload, PluginToHost, ServerInfo,
};

/// How long client-side reads wait before a test fails.
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Engine fakes
// ---------------------------------------------------------------------------

/// An engine context recording whether the event was cancelled.
#[derive(Default)]
pub struct FakeContext {
    cancelled: AtomicBool,
}

impl FakeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl EngineContext for FakeContext {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Engine services over a fixed block/item/biome catalog.
#[derive(Default)]
pub struct FakeEngine {
    pub commands: Mutex<Vec<CommandSpec>>,
    pub global_chat: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn known_block(name: &str) -> bool {
        matches!(
            name,
            "minecraft:stone" | "minecraft:dirt" | "minecraft:air" | "minecraft:diamond_ore"
        )
    }
}

impl EngineServices for FakeEngine {
    fn resolve_block(&self, state: &BlockState) -> Option<BlockState> {
        Self::known_block(&state.name).then(|| state.clone())
    }

    fn resolve_item(&self, name: &str, _meta: i16) -> bool {
        matches!(
            name,
            "minecraft:stone" | "minecraft:diamond" | "minecraft:stick" | "minecraft:apple"
        )
    }

    fn biome_by_id(&self, id: i32) -> Option<Biome> {
        match id {
            0 => Some(Biome {
                id: 0,
                name: "plains".into(),
            }),
            1 => Some(Biome {
                id: 1,
                name: "desert".into(),
            }),
            _ => None,
        }
    }

    fn biome_by_name(&self, name: &str) -> Option<Biome> {
        match name {
            "plains" => self.biome_by_id(0),
            "desert" => self.biome_by_id(1),
            _ => None,
        }
    }

    fn register_command(&self, spec: &CommandSpec) {
        self.commands.lock().unwrap().push(spec.clone());
    }

    fn broadcast_chat(&self, message: &str) {
        self.global_chat.lock().unwrap().push(message.to_string());
    }
}

/// World-scoped settings mutated outside transactions.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub default_game_mode: GameMode,
    pub difficulty: Difficulty,
    pub tick_range: i32,
    pub time: i64,
    pub time_stopped: bool,
    pub spawn: BlockPos,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            default_game_mode: GameMode::Survival,
            difficulty: Difficulty::Normal,
            tick_range: 6,
            time: 0,
            time_stopped: false,
            spawn: BlockPos::default(),
        }
    }
}

/// Transactional world state.
#[derive(Default)]
pub struct WorldState {
    pub blocks: HashMap<BlockPos, BlockState>,
    pub liquids: HashMap<BlockPos, LiquidState>,
    pub biomes: HashMap<BlockPos, Biome>,
    pub scheduled_updates: Vec<(BlockPos, Duration)>,
}

/// An in-memory world recording every transaction it executes.
pub struct FakeWorld {
    name: String,
    dimension: String,
    pub state: Arc<Mutex<WorldState>>,
    pub settings: Arc<Mutex<WorldSettings>>,
    /// Number of `set_block` calls per `exec` invocation, in order.
    pub exec_log: Arc<Mutex<Vec<usize>>>,
    pub players_in_world: Arc<Mutex<Vec<PlayerRef>>>,
}

impl FakeWorld {
    pub fn new(name: &str, dimension: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            dimension: dimension.to_string(),
            state: Arc::new(Mutex::new(WorldState::default())),
            settings: Arc::new(Mutex::new(WorldSettings::default())),
            exec_log: Arc::new(Mutex::new(Vec::new())),
            players_in_world: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn block(&self, pos: BlockPos) -> Option<BlockState> {
        self.state.lock().unwrap().blocks.get(&pos).cloned()
    }

    pub fn exec_count(&self) -> usize {
        self.exec_log.lock().unwrap().len()
    }
}

struct TxView<'a> {
    state: &'a mut WorldState,
    set_blocks: usize,
}

impl strata_core::WorldTx for TxView<'_> {
    fn set_block(&mut self, pos: BlockPos, block: Option<BlockState>) {
        self.set_blocks += 1;
        match block {
            Some(block) => {
                self.state.blocks.insert(pos, block);
            }
            None => {
                self.state.blocks.remove(&pos);
            }
        }
    }

    fn block(&self, pos: BlockPos) -> Option<BlockState> {
        self.state.blocks.get(&pos).cloned()
    }

    fn set_biome(&mut self, pos: BlockPos, biome: &Biome) {
        self.state.biomes.insert(pos, biome.clone());
    }

    fn liquid(&self, pos: BlockPos) -> Option<LiquidState> {
        self.state.liquids.get(&pos).cloned()
    }

    fn set_liquid(&mut self, pos: BlockPos, liquid: Option<LiquidState>) {
        match liquid {
            Some(liquid) => {
                self.state.liquids.insert(pos, liquid);
            }
            None => {
                self.state.liquids.remove(&pos);
            }
        }
    }

    fn schedule_block_update(&mut self, pos: BlockPos, delay: Duration) {
        self.state.scheduled_updates.push((pos, delay));
    }
}

#[async_trait]
impl WorldHandle for FakeWorld {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn dimension(&self) -> String {
        self.dimension.clone()
    }

    async fn exec(&self, work: WorldWork) {
        let mut state = self.state.lock().unwrap();
        let mut view = TxView {
            state: &mut state,
            set_blocks: 0,
        };
        work(&mut view);
        let set_blocks = view.set_blocks;
        drop(state);
        self.exec_log.lock().unwrap().push(set_blocks);
    }

    fn set_default_game_mode(&self, mode: GameMode) {
        self.settings.lock().unwrap().default_game_mode = mode;
    }

    fn default_game_mode(&self) -> GameMode {
        self.settings.lock().unwrap().default_game_mode
    }

    fn set_difficulty(&self, difficulty: Difficulty) {
        self.settings.lock().unwrap().difficulty = difficulty;
    }

    fn set_tick_range(&self, range: i32) {
        self.settings.lock().unwrap().tick_range = range;
    }

    fn set_time(&self, time: i64) {
        self.settings.lock().unwrap().time = time;
    }

    fn stop_time(&self) {
        self.settings.lock().unwrap().time_stopped = true;
    }

    fn start_time(&self) {
        self.settings.lock().unwrap().time_stopped = false;
    }

    fn set_spawn(&self, pos: BlockPos) {
        self.settings.lock().unwrap().spawn = pos;
    }

    fn players(&self) -> Vec<PlayerRef> {
        self.players_in_world.lock().unwrap().clone()
    }
}

/// Everything a fake player records.
#[derive(Default)]
pub struct PlayerState {
    pub messages: Vec<String>,
    pub popups: Vec<String>,
    pub tips: Vec<String>,
    pub titles: Vec<Title>,
    pub position: Vec3,
    pub rotation: Rotation,
    pub game_mode: Option<GameMode>,
    pub health: f64,
    pub max_health: f64,
    pub food: i32,
    pub xp_level: i64,
    pub xp_progress: f64,
    pub xp_points: i64,
    pub effects: HashMap<i32, (i32, Option<Duration>, bool)>,
    pub items: Vec<ItemStack>,
    pub disconnected: Option<String>,
    pub executed_commands: Vec<String>,
    pub dialogues: Vec<(Dialogue, Uuid)>,
    pub entities: HashSet<Uuid>,
}

impl PlayerApi for PlayerState {
    fn message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
    fn teleport(&mut self, position: Vec3) {
        self.position = position;
    }
    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }
    fn disconnect(&mut self, reason: &str) {
        self.disconnected = Some(reason.to_string());
    }
    fn set_game_mode(&mut self, mode: GameMode) {
        self.game_mode = Some(mode);
    }
    fn give_item(&mut self, item: ItemStack) {
        self.items.push(item);
    }
    fn health(&self) -> f64 {
        self.health
    }
    fn set_health(&mut self, health: f64) {
        self.health = health;
    }
    fn set_max_health(&mut self, max_health: f64) {
        self.max_health = max_health;
    }
    fn set_food(&mut self, food: i32) {
        self.food = food;
    }
    fn set_experience_level(&mut self, level: i64) {
        self.xp_level = level;
    }
    fn set_experience_progress(&mut self, progress: f64) {
        self.xp_progress = progress;
    }
    fn add_experience(&mut self, amount: i64) {
        self.xp_points += amount;
    }
    fn add_effect(&mut self, effect_id: i32, level: i32, duration: Option<Duration>, particles: bool) {
        self.effects.insert(effect_id, (level, duration, particles));
    }
    fn remove_effect(&mut self, effect_id: i32) {
        self.effects.remove(&effect_id);
    }
    fn send_title(&mut self, title: &Title) {
        self.titles.push(title.clone());
    }
    fn send_popup(&mut self, message: &str) {
        self.popups.push(message.to_string());
    }
    fn send_tip(&mut self, message: &str) {
        self.tips.push(message.to_string());
    }
    fn execute_command(&mut self, command: &str) {
        self.executed_commands.push(command.to_string());
    }
    fn has_entity(&self, uuid: Uuid) -> bool {
        self.entities.contains(&uuid)
    }
    fn send_dialogue(&mut self, dialogue: &Dialogue, entity: Uuid) {
        self.dialogues.push((dialogue.clone(), entity));
    }
}

/// An in-memory player whose state stays inspectable after registration.
pub struct FakePlayer {
    uuid: Uuid,
    name: String,
    pub state: Arc<Mutex<PlayerState>>,
}

impl FakePlayer {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            state: Arc::new(Mutex::new(PlayerState {
                health: 20.0,
                max_health: 20.0,
                food: 20,
                ..PlayerState::default()
            })),
        })
    }

    pub fn player_ref(&self) -> PlayerRef {
        PlayerRef {
            uuid: self.uuid.to_string(),
            name: self.name.clone(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

#[async_trait]
impl PlayerHandle for FakePlayer {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn exec(&self, work: PlayerWork) {
        let mut state = self.state.lock().unwrap();
        work(&mut *state);
    }
}

// ---------------------------------------------------------------------------
// Host + client helpers
// ---------------------------------------------------------------------------

/// Start a host on an ephemeral loopback port with sessions for `plugins`.
pub async fn start_host(engine: Arc<FakeEngine>, plugins: &[&str]) -> PluginHost {
    start_host_with(engine, plugins, &[], 2000).await
}

/// Start a host with explicit required plugins and hello timeout.
pub async fn start_host_with(
    engine: Arc<FakeEngine>,
    plugins: &[&str],
    required: &[&str],
    hello_timeout_ms: u64,
) -> PluginHost {
    let mut yaml = String::from("server_port: \"127.0.0.1:0\"\n");
    yaml.push_str(&format!("hello_timeout_ms: {hello_timeout_ms}\n"));
    if !required.is_empty() {
        yaml.push_str("required_plugins:\n");
        for id in required {
            yaml.push_str(&format!("  - {id}\n"));
        }
    }
    if !plugins.is_empty() {
        yaml.push_str("plugins:\n");
        for id in plugins {
            yaml.push_str(&format!("  - id: {id}\n"));
        }
    }
    let config = Config::from_str(&yaml).unwrap();
    PluginHost::start(config, engine).await.unwrap()
}

/// A wire-level plugin client driving one session.
pub struct TestPlugin {
    pub id: String,
    stream: FrameStream,
}

impl TestPlugin {
    /// Connect and identify with a default Hello, then consume the host's
    /// greeting.
    pub async fn connect(addr: &ListenAddr, id: &str) -> Self {
        Self::connect_with_hello(
            addr,
            id,
            PluginHello {
                name: id.to_string(),
                version: "1.0.0".into(),
                api_version: "v1".into(),
                ..PluginHello::default()
            },
        )
        .await
    }

    /// Connect and identify with a specific Hello, then consume the host's
    /// greeting.
    pub async fn connect_with_hello(addr: &ListenAddr, id: &str, hello: PluginHello) -> Self {
        let stream = FrameStream::connect(addr).await.expect("connect to host");
        let mut plugin = Self {
            id: id.to_string(),
            stream,
        };
        plugin.send(PluginPayload::Hello(hello)).await;
        let greeting = plugin.recv().await;
        assert!(
            matches!(greeting.payload, HostPayload::Hello(_)),
            "expected host hello, got {greeting:?}"
        );
        plugin
    }

    pub async fn send(&mut self, payload: PluginPayload) {
        let msg = PluginToHost {
            plugin_id: strata_core::PluginId::from_static(&self.id),
            payload,
        };
        let bytes = strata_proto::encode(&msg).unwrap();
        self.stream.send(&bytes).await.expect("send frame");
    }

    pub async fn recv(&mut self) -> HostToPlugin {
        let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.recv())
            .await
            .expect("timed out waiting for a host frame")
            .expect("receive frame");
        strata_proto::decode(&frame).expect("decode host frame")
    }

    /// Receive frames until the next event envelope.
    pub async fn recv_event(&mut self) -> EventEnvelope {
        loop {
            if let HostPayload::Event(envelope) = self.recv().await.payload {
                return envelope;
            }
        }
    }

    /// Receive frames until the next action result.
    pub async fn recv_action_result(&mut self) -> ActionResult {
        loop {
            if let HostPayload::ActionResult(result) = self.recv().await.payload {
                return result;
            }
        }
    }

    /// Receive frames until the next server-info reply.
    pub async fn recv_server_info(&mut self) -> ServerInfo {
        loop {
            if let HostPayload::ServerInfo(info) = self.recv().await.payload {
                return info;
            }
        }
    }

    /// Replace the subscription set and wait until the host has applied it.
    ///
    /// The server-info round trip after the Subscribe doubles as a barrier:
    /// frames on one session are handled in order, so once the roster shows
    /// this plugin ready, the subscription is live.
    pub async fn subscribe(&mut self, events: Vec<EventType>) {
        self.send(PluginPayload::Subscribe(EventSubscribe { events }))
            .await;
        self.send(PluginPayload::ServerInfoRequest).await;
        let info = self.recv_server_info().await;
        let me = info
            .plugins
            .iter()
            .find(|p| p.id.as_str() == self.id)
            .expect("own roster entry");
        assert!(me.ready, "subscribe not applied");
    }

    /// Answer an event.
    pub async fn respond(&mut self, result: EventResult) {
        self.send(PluginPayload::EventResult(result)).await;
    }

    /// Send a batch of actions.
    pub async fn send_actions(&mut self, batch: ActionBatch) {
        self.send(PluginPayload::Actions(batch)).await;
    }
}

/// Install the default tracing subscriber once per test binary.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

//! Game state and core simulation types
//!
//! Everything the tick loop mutates lives in [`GameState`]; the pool, spawner,
//! replication buffer and both runners are owned here and handed out by
//! `&mut` for the duration of a tick.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::pool::EntityPool;
use super::replication::ReplicationBuffer;
use super::runner::{Control, RunnerBody};
use super::spawner::SectionSpawner;
use super::tick::TickInput;
use crate::Tuning;
use crate::consts::*;

/// Which half of the split screen an object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Input-driven, authoritative lane
    Primary,
    /// Delayed replay of the primary lane
    Mirror,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Primary, Side::Mirror];

    /// Center line x of this side
    pub fn offset(self) -> f32 {
        match self {
            Side::Primary => PRIMARY_SIDE_OFFSET,
            Side::Mirror => MIRROR_SIDE_OFFSET,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Primary => "primary",
            Side::Mirror => "mirror",
        }
    }
}

/// Pooled entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle,
    Collectible,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Obstacle, EntityKind::Collectible];
}

/// What a spawn instruction places (air orbs are collectibles placed high)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnKind {
    Obstacle,
    Orb,
    AirOrb,
}

impl SpawnKind {
    pub fn entity_kind(self) -> EntityKind {
        match self {
            SpawnKind::Obstacle => EntityKind::Obstacle,
            SpawnKind::Orb | SpawnKind::AirOrb => EntityKind::Collectible,
        }
    }
}

/// One of the three running lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lane {
    Left = 0,
    #[default]
    Center = 1,
    Right = 2,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Lane one step to the left (saturates at the edge)
    pub fn left(self) -> Self {
        match self {
            Lane::Left | Lane::Center => Lane::Left,
            Lane::Right => Lane::Center,
        }
    }

    /// Lane one step to the right (saturates at the edge)
    pub fn right(self) -> Self {
        match self {
            Lane::Left => Lane::Center,
            Lane::Center | Lane::Right => Lane::Right,
        }
    }
}

/// Process-wide instance identifier.
///
/// Allocated from a single monotonic counter, so a stale id can never alias a
/// later activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lateral oscillation for moving obstacles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    /// +1.0 or -1.0
    pub direction: f32,
    pub min_x: f32,
    pub max_x: f32,
}

impl Oscillation {
    /// Bounds span one lane either side of the side's center line
    pub fn centered(side_offset: f32, lane_distance: f32, direction: f32) -> Self {
        Self {
            direction: if direction < 0.0 { -1.0 } else { 1.0 },
            min_x: side_offset - lane_distance,
            max_x: side_offset + lane_distance,
        }
    }

    /// Advance `x` and bounce off the bounds; returns the new x
    pub fn step(&mut self, x: f32, speed: f32, dt: f32) -> f32 {
        let x = x + self.direction * speed * dt;
        if x <= self.min_x {
            self.direction = 1.0;
            self.min_x
        } else if x >= self.max_x {
            self.direction = -1.0;
            self.max_x
        } else {
            x
        }
    }
}

/// A pooled obstacle or collectible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub side: Side,
    pub kind: EntityKind,
    /// Set while checked out
    id: Option<EntityId>,
    pub pos: Vec3,
    pub lane: Lane,
    /// Present for moving obstacles
    pub motion: Option<Oscillation>,
    /// Collision layer tag; only runners on the same layer can touch it
    pub layer: Option<Side>,
    /// One-shot contact guard
    pub consumed: bool,
}

impl Entity {
    pub fn new(side: Side, kind: EntityKind) -> Self {
        Self {
            side,
            kind,
            id: None,
            pos: Vec3::ZERO,
            lane: Lane::Center,
            motion: None,
            layer: None,
            consumed: false,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Renderer attach/detach flag
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    pub(crate) fn activate(&mut self, id: EntityId) {
        self.id = Some(id);
        self.pos = Vec3::ZERO;
        self.lane = Lane::Center;
        self.motion = None;
        self.layer = None;
        self.consumed = false;
    }

    pub(crate) fn deactivate(&mut self) {
        self.id = None;
        self.motion = None;
        self.layer = None;
        self.consumed = false;
    }
}

/// Record of one primary-side placement, replayed onto the mirror lane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnInstruction {
    /// Primary instance the mirror copy is registered under
    pub source_id: EntityId,
    pub kind: SpawnKind,
    /// Primary-side world position
    pub position: Vec3,
    pub lane: Lane,
    pub moving: bool,
    /// Initial oscillation direction; ignored unless `moving`
    pub direction: f32,
    /// Simulation time of the placement (seconds)
    pub created_at: f32,
}

/// Discrete contact carried by a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotEvent {
    Collected(EntityId),
    Hit(EntityId),
}

/// Primary runner state at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub timestamp: f32,
    pub position: Vec3,
    pub lane: Lane,
    pub is_jumping: bool,
    pub is_grounded: bool,
    /// 0 when grounded
    pub jump_progress: f32,
    pub collected_id: Option<EntityId>,
    pub hit_id: Option<EntityId>,
}

impl PlayerSnapshot {
    pub fn new(
        timestamp: f32,
        position: Vec3,
        lane: Lane,
        is_jumping: bool,
        jump_progress: f32,
        event: Option<SnapshotEvent>,
    ) -> Self {
        let (collected_id, hit_id) = match event {
            Some(SnapshotEvent::Collected(id)) => (Some(id), None),
            Some(SnapshotEvent::Hit(id)) => (None, Some(id)),
            None => (None, None),
        };
        Self {
            timestamp,
            position,
            lane,
            is_jumping,
            is_grounded: !is_jumping,
            jump_progress: if is_jumping {
                jump_progress.clamp(0.0, 1.0)
            } else {
                0.0
            },
            collected_id,
            hit_id,
        }
    }

    pub fn event(&self) -> Option<SnapshotEvent> {
        match (self.collected_id, self.hit_id) {
            (Some(id), _) => Some(SnapshotEvent::Collected(id)),
            (None, Some(id)) => Some(SnapshotEvent::Hit(id)),
            (None, None) => None,
        }
    }
}

/// Notifications for UI, audio and bookkeeping collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RunStarted { seed: u64 },
    Jumped { side: Side },
    Landed { side: Side },
    OrbCollected { side: Side, id: EntityId, pos: Vec3 },
    ObstacleHit { side: Side, id: EntityId, pos: Vec3 },
    ScoreChanged(u32),
    LivesChanged(u8),
    GameOver { score: u32 },
}

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No run in progress (main menu)
    Idle,
    Playing,
    GameOver,
}

/// Score and lives for the current run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub score: u32,
    pub best_score: u32,
    pub lives: u8,
    pub orbs_collected: u32,
    pub obstacles_hit: u32,
    /// Forward distance covered by the primary runner
    pub distance: f32,
}

impl RunStats {
    /// Reset for a new run (best score survives)
    pub fn reset(&mut self, lives: u8) {
        *self = Self {
            best_score: self.best_score,
            lives,
            ..Self::default()
        };
    }
}

/// Complete simulation state for one session
#[derive(Debug)]
pub struct GameState {
    pub tuning: Tuning,
    pub phase: GamePhase,
    /// Simulation time in seconds since the run started
    pub time: f32,
    /// Physics tick counter
    pub time_ticks: u64,
    /// Unconsumed frame time for fixed-step physics
    pub accumulator: f32,
    /// Triggers waiting for the next physics step
    pub pending_input: TickInput,
    pub pool: EntityPool,
    pub spawner: SectionSpawner<Pcg32>,
    pub replication: ReplicationBuffer,
    pub primary: RunnerBody,
    pub mirror: RunnerBody,
    pub stats: RunStats,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Build every service from the tuning set; no run is started yet
    pub fn new(tuning: Tuning) -> Self {
        let rng = Pcg32::seed_from_u64(tuning.seed);
        let mut stats = RunStats::default();
        stats.lives = tuning.lives;
        Self {
            phase: GamePhase::Idle,
            time: 0.0,
            time_ticks: 0,
            accumulator: 0.0,
            pending_input: TickInput::default(),
            pool: EntityPool::new(tuning.pool_warm_count),
            spawner: SectionSpawner::new(tuning.spawn.clone(), tuning.runner.lane_distance, rng),
            replication: ReplicationBuffer::new(&tuning.sync, tuning.runner.lane_distance),
            primary: RunnerBody::new(Side::Primary, Control::Input, tuning.runner.clone()),
            mirror: RunnerBody::new(Side::Mirror, Control::Replay, tuning.runner.clone()),
            stats,
            events: Vec::new(),
            tuning,
        }
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all notifications raised since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn runner(&self, side: Side) -> &RunnerBody {
        match side {
            Side::Primary => &self.primary,
            Side::Mirror => &self.mirror,
        }
    }
}

//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep physics, frame-rate housekeeping
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod pool;
pub mod replication;
pub mod runner;
pub mod spawner;
pub mod state;
pub mod tick;

pub use collision::{Contact, aabb_overlap, find_contacts};
pub use pool::{EntityPool, PoolKey};
pub use replication::{BoundedQueue, MirrorRegistry, ReplicationBuffer, mirror_position};
pub use runner::{Control, JumpState, RunnerBody, RunnerEvent};
pub use spawner::{Pattern, SectionSpawner};
pub use state::{
    Entity, EntityId, EntityKind, GameEvent, GamePhase, GameState, Lane, Oscillation,
    PlayerSnapshot, RunStats, Side, SnapshotEvent, SpawnInstruction, SpawnKind,
};
pub use tick::{TickInput, advance, frame_tick, handle_contact, physics_tick, start_run};

//! Ghost Runner - A split-screen endless runner with a delayed mirror lane
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pooling, spawning, replication, runner physics)
//! - `tuning`: Data-driven game balance

pub mod sim;
pub mod tuning;

pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (50 Hz physics)
    pub const SIM_DT: f32 = 1.0 / 50.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Runner forward speed (units/s)
    pub const BASE_MOVE_SPEED: f32 = 10.0;
    /// Peak jump height above ground
    pub const JUMP_HEIGHT: f32 = 4.0;
    /// Jump duration in seconds, independent of forward speed
    pub const JUMP_DURATION: f32 = 0.6;
    /// Forward speed multiplier while airborne
    pub const JUMP_FORWARD_BOOST: f32 = 1.0;
    /// Downward acceleration (units/s²)
    pub const GRAVITY: f32 = 9.81;
    pub const GRAVITY_MULTIPLIER: f32 = 2.5;
    /// Runner center height when standing
    pub const GROUND_HEIGHT: f32 = 1.0;

    /// Distance between adjacent lane centers
    pub const LANE_DISTANCE: f32 = 2.5;
    /// Lateral speed when switching lanes (units/s)
    pub const LANE_SWITCH_SPEED: f32 = 12.0;

    /// Center line of the primary (input-driven) side
    pub const PRIMARY_SIDE_OFFSET: f32 = 3.75;
    /// Center line of the mirror (ghost) side
    pub const MIRROR_SIDE_OFFSET: f32 = -3.75;

    pub const PLAYER_LIVES: u8 = 5;

    /// Course section length
    pub const SECTION_DISTANCE: f32 = 25.0;
    /// How far ahead of the runner sections are always populated
    pub const SPAWN_LOOKAHEAD: f32 = 50.0;
    /// Z of the first section after a run starts
    pub const FIRST_SECTION_Z: f32 = 20.0;
    /// Entities further than this behind their runner are despawned (negative = behind)
    pub const DESPAWN_DISTANCE: f32 = -10.0;
    pub const MOVING_OBSTACLE_SPEED: f32 = 5.0;

    /// Placement heights
    pub const OBSTACLE_HEIGHT: f32 = 0.5;
    pub const GROUND_ORB_HEIGHT: f32 = 0.5;
    pub const AIR_ORB_HEIGHT: f32 = 2.5;
    /// Air orb sits this far ahead of the low obstacle in the air-gap pattern
    pub const AIR_ORB_LEAD: f32 = 2.0;
    /// Spacing between the stacked obstacles in the air-gap pattern
    pub const STACKED_OBSTACLE_GAP: f32 = 5.0;

    /// Mirror replay latency in seconds
    pub const SYNC_DELAY: f32 = 0.02;
    /// Player-state queue capacity (spawn queue is 3x this)
    pub const SYNC_BUFFER_CAPACITY: usize = 30;

    /// Instances pre-built per (side, kind) pool
    pub const POOL_WARM_COUNT: usize = 100;
}

/// X coordinate of a lane center on a side with the given center line
#[inline]
pub fn lane_x(side_offset: f32, lane_index: usize, lane_distance: f32) -> f32 {
    side_offset + (lane_index as f32 - 1.0) * lane_distance
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

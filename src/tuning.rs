//! Game tuning and balance
//!
//! Every gameplay constant can be overridden from a JSON file. Missing fields
//! fall back to the values in [`crate::consts`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Runner movement tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerTuning {
    pub move_speed: f32,
    pub jump_height: f32,
    pub jump_duration: f32,
    /// Forward speed multiplier while jumping
    pub jump_forward_boost: f32,
    pub gravity: f32,
    pub gravity_multiplier: f32,
    pub ground_height: f32,
    pub lane_distance: f32,
    pub lane_switch_speed: f32,
}

impl Default for RunnerTuning {
    fn default() -> Self {
        Self {
            move_speed: BASE_MOVE_SPEED,
            jump_height: JUMP_HEIGHT,
            jump_duration: JUMP_DURATION,
            jump_forward_boost: JUMP_FORWARD_BOOST,
            gravity: GRAVITY,
            gravity_multiplier: GRAVITY_MULTIPLIER,
            ground_height: GROUND_HEIGHT,
            lane_distance: LANE_DISTANCE,
            lane_switch_speed: LANE_SWITCH_SPEED,
        }
    }
}

/// Procedural course tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub section_length: f32,
    pub lookahead: f32,
    pub first_section_z: f32,
    /// Relative z behind the runner past which entities are recycled
    pub despawn_distance: f32,
    pub moving_obstacle_speed: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            section_length: SECTION_DISTANCE,
            lookahead: SPAWN_LOOKAHEAD,
            first_section_z: FIRST_SECTION_Z,
            despawn_distance: DESPAWN_DISTANCE,
            moving_obstacle_speed: MOVING_OBSTACLE_SPEED,
        }
    }
}

/// Mirror replication tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    /// Seconds between replay steps
    pub delay: f32,
    /// Player-state queue capacity
    pub state_capacity: usize,
    /// Spawn-instruction queue capacity
    pub spawn_capacity: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            delay: SYNC_DELAY,
            state_capacity: SYNC_BUFFER_CAPACITY,
            spawn_capacity: SYNC_BUFFER_CAPACITY * 3,
        }
    }
}

/// Complete tuning set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Run seed for the course generator
    pub seed: u64,
    pub lives: u8,
    /// Instances pre-built per (side, kind) pool
    pub pool_warm_count: usize,
    pub runner: RunnerTuning,
    pub spawn: SpawnTuning,
    pub sync: SyncTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            lives: PLAYER_LIVES,
            pool_warm_count: POOL_WARM_COUNT,
            runner: RunnerTuning::default(),
            spawn: SpawnTuning::default(),
            sync: SyncTuning::default(),
        }
    }
}

impl Tuning {
    /// Default tuning with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse tuning from JSON (absent fields keep their defaults)
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load tuning from a JSON file, falling back to defaults on any failure
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Invalid tuning file {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }
}

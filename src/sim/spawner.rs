//! Procedural course generation
//!
//! The course is cut into fixed-length sections. Every section within the
//! lookahead window of the primary runner is populated with one of four
//! patterns, in primary-side coordinates. Each placement is queued for replay
//! on the mirror side.

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::pool::EntityPool;
use super::replication::ReplicationBuffer;
use super::state::{Lane, Oscillation, Side, SpawnInstruction, SpawnKind};
use crate::consts::*;
use crate::lane_x;
use crate::tuning::SpawnTuning;

/// Section layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// Each lane: obstacle (2/3) or ground orb (1/3)
    RandomMix,
    /// Every lane blocked; must jump
    AllObstacles,
    /// One obstacle drifting across the lanes
    MovingObstacle,
    /// Low obstacle + air orb in one lane, double obstacles in the others
    AirGap,
}

impl Pattern {
    pub const ALL: [Pattern; 4] = [
        Pattern::RandomMix,
        Pattern::AllObstacles,
        Pattern::MovingObstacle,
        Pattern::AirGap,
    ];
}

/// Where placements go while a section is generated
struct SpawnSink<'a> {
    pool: &'a mut EntityPool,
    buffer: &'a mut ReplicationBuffer,
    now: f32,
    lane_distance: f32,
}

impl SpawnSink<'_> {
    fn place(&mut self, kind: SpawnKind, lane: Lane, z: f32, y: f32, drift: Option<f32>) {
        let side = Side::Primary;
        let position = Vec3::new(
            lane_x(side.offset(), lane.index(), self.lane_distance),
            y,
            z,
        );
        let id = self.pool.checkout(side, kind.entity_kind());
        if let Some(entity) = self.pool.get_mut(id) {
            entity.pos = position;
            entity.lane = lane;
            entity.layer = Some(side);
            entity.motion =
                drift.map(|dir| Oscillation::centered(side.offset(), self.lane_distance, dir));
        }

        self.buffer.record_spawn(SpawnInstruction {
            source_id: id,
            kind,
            position,
            lane,
            moving: drift.is_some(),
            direction: drift.unwrap_or(1.0),
            created_at: self.now,
        });
    }

    fn obstacle(&mut self, lane: Lane, z: f32) {
        self.place(SpawnKind::Obstacle, lane, z, OBSTACLE_HEIGHT, None);
    }
}

/// Generates sections ahead of the primary runner
#[derive(Debug)]
pub struct SectionSpawner<R = Pcg32> {
    tuning: SpawnTuning,
    lane_distance: f32,
    next_section_z: f32,
    sections_generated: u64,
    rng: R,
}

impl SectionSpawner<Pcg32> {
    /// Spawner with default tuning and a PCG stream from `seed`
    pub fn seeded(seed: u64) -> Self {
        use rand::SeedableRng;
        Self::new(SpawnTuning::default(), LANE_DISTANCE, Pcg32::seed_from_u64(seed))
    }
}

impl<R: Rng> SectionSpawner<R> {
    pub fn new(tuning: SpawnTuning, lane_distance: f32, rng: R) -> Self {
        Self {
            next_section_z: tuning.first_section_z,
            tuning,
            lane_distance,
            sections_generated: 0,
            rng,
        }
    }

    /// Z at which the next section will be generated
    pub fn next_section_z(&self) -> f32 {
        self.next_section_z
    }

    pub fn sections_generated(&self) -> u64 {
        self.sections_generated
    }

    /// Rewind the cursor for a new run
    pub fn reset(&mut self) {
        self.next_section_z = self.tuning.first_section_z;
        self.sections_generated = 0;
    }

    /// Generate every section now inside the lookahead window.
    /// Returns the number of sections generated.
    pub fn advance(
        &mut self,
        player_z: f32,
        now: f32,
        pool: &mut EntityPool,
        buffer: &mut ReplicationBuffer,
    ) -> usize {
        let mut sink = SpawnSink {
            pool,
            buffer,
            now,
            lane_distance: self.lane_distance,
        };
        let mut generated = 0;
        while player_z + self.tuning.lookahead > self.next_section_z {
            let z = self.next_section_z;
            let pattern = self.generate_section(z, &mut sink);
            log::trace!("Section {} at z={:.1}: {:?}", self.sections_generated, z, pattern);
            self.next_section_z += self.tuning.section_length;
            self.sections_generated += 1;
            generated += 1;
        }
        generated
    }

    fn generate_section(&mut self, z: f32, sink: &mut SpawnSink<'_>) -> Pattern {
        let pattern = Pattern::ALL[self.rng.random_range(0..Pattern::ALL.len())];
        match pattern {
            Pattern::RandomMix => {
                for lane in Lane::ALL {
                    if self.rng.random_ratio(2, 3) {
                        sink.obstacle(lane, z);
                    } else {
                        sink.place(SpawnKind::Orb, lane, z, GROUND_ORB_HEIGHT, None);
                    }
                }
            }
            Pattern::AllObstacles => {
                for lane in Lane::ALL {
                    sink.obstacle(lane, z);
                }
            }
            Pattern::MovingObstacle => {
                let lane = self.random_lane();
                let direction = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
                sink.place(SpawnKind::Obstacle, lane, z, OBSTACLE_HEIGHT, Some(direction));
            }
            Pattern::AirGap => {
                let safe = self.random_lane();
                for lane in Lane::ALL {
                    sink.obstacle(lane, z);
                    if lane == safe {
                        sink.place(SpawnKind::AirOrb, lane, z + AIR_ORB_LEAD, AIR_ORB_HEIGHT, None);
                    } else {
                        sink.obstacle(lane, z + STACKED_OBSTACLE_GAP);
                    }
                }
            }
        }
        pattern
    }

    fn random_lane(&mut self) -> Lane {
        Lane::ALL[self.rng.random_range(0..Lane::ALL.len())]
    }
}

//! Runner movement: forward motion, lane switching and the jump state machine
//!
//! The same body drives both sides. A primary body reacts to input triggers;
//! a replay body only ever changes lane or jump state through snapshots.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Lane, PlayerSnapshot, Side, SnapshotEvent};
use crate::tuning::RunnerTuning;
use crate::{lane_x, move_towards};

/// What drives a runner's discrete state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Control {
    /// Lane and jump triggers from the input layer
    Input,
    /// Lane and jump state from replayed snapshots
    Replay,
}

/// Vertical state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JumpState {
    Grounded,
    /// Progress runs 0..1 over the jump duration
    Jumping { progress: f32 },
}

/// Discrete happenings from a physics step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerEvent {
    Jumped,
    Landed,
}

/// A runner on one side of the split screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerBody {
    pub side: Side,
    pub control: Control,
    pub pos: Vec3,
    /// Vertical velocity derived from position deltas
    pub vel_y: f32,
    pub lane: Lane,
    target_x: f32,
    pub jump: JumpState,
    tuning: RunnerTuning,
}

impl RunnerBody {
    pub fn new(side: Side, control: Control, tuning: RunnerTuning) -> Self {
        let mut body = Self {
            side,
            control,
            pos: Vec3::ZERO,
            vel_y: 0.0,
            lane: Lane::Center,
            target_x: 0.0,
            jump: JumpState::Grounded,
            tuning,
        };
        body.reset();
        body
    }

    /// Back to the center lane at the start line
    pub fn reset(&mut self) {
        self.lane = Lane::Center;
        self.target_x = self.lane_target(Lane::Center);
        self.jump = JumpState::Grounded;
        self.vel_y = 0.0;
        self.pos = Vec3::new(self.target_x, self.tuning.ground_height, 0.0);
    }

    fn lane_target(&self, lane: Lane) -> f32 {
        lane_x(self.side.offset(), lane.index(), self.tuning.lane_distance)
    }

    pub fn target_x(&self) -> f32 {
        self.target_x
    }

    pub fn is_jumping(&self) -> bool {
        matches!(self.jump, JumpState::Jumping { .. })
    }

    pub fn jump_progress(&self) -> f32 {
        match self.jump {
            JumpState::Jumping { progress } => progress,
            JumpState::Grounded => 0.0,
        }
    }

    fn set_lane(&mut self, lane: Lane) {
        if lane != self.lane {
            self.lane = lane;
            self.target_x = self.lane_target(lane);
        }
    }

    /// Lane-left trigger (primary only)
    pub fn move_left(&mut self) {
        if self.control == Control::Input {
            self.set_lane(self.lane.left());
        }
    }

    /// Lane-right trigger (primary only)
    pub fn move_right(&mut self) {
        if self.control == Control::Input {
            self.set_lane(self.lane.right());
        }
    }

    /// Jump trigger (primary only); returns true if a jump started
    pub fn jump(&mut self) -> bool {
        if self.control != Control::Input || self.is_jumping() {
            return false;
        }
        self.jump = JumpState::Jumping { progress: 0.0 };
        true
    }

    /// Adopt a replayed snapshot. The snapshot is authoritative for lane and
    /// jump state; position is left to local integration.
    pub fn apply_snapshot(&mut self, snapshot: &PlayerSnapshot) -> Option<RunnerEvent> {
        if self.control != Control::Replay {
            log::debug!("Ignoring snapshot on input-driven {} runner", self.side.as_str());
            return None;
        }

        self.set_lane(snapshot.lane);

        match (snapshot.is_jumping, self.jump) {
            (true, JumpState::Grounded) => {
                self.jump = JumpState::Jumping {
                    progress: snapshot.jump_progress.clamp(0.0, 1.0),
                };
                Some(RunnerEvent::Jumped)
            }
            (false, JumpState::Jumping { .. }) => {
                self.jump = JumpState::Grounded;
                None
            }
            _ => None,
        }
    }

    /// Advance one fixed physics step
    pub fn step(&mut self, dt: f32) -> Option<RunnerEvent> {
        if dt <= 0.0 {
            return None;
        }
        let t = &self.tuning;

        // Forward
        let speed = if self.is_jumping() {
            t.move_speed * t.jump_forward_boost
        } else {
            t.move_speed
        };
        self.pos.z += speed * dt;

        // Lateral, orthogonal to jumping
        self.pos.x = move_towards(self.pos.x, self.target_x, t.lane_switch_speed * dt);

        // Jump arc: velocity from the position delta to the half-sine target
        let mut event = None;
        if let JumpState::Jumping { progress } = self.jump {
            let progress = progress + dt / t.jump_duration;
            if progress >= 1.0 {
                self.jump = JumpState::Grounded;
                self.vel_y = 0.0;
                event = Some(RunnerEvent::Landed);
            } else {
                self.jump = JumpState::Jumping { progress };
                let height = (progress * std::f32::consts::PI).sin() * t.jump_height;
                let target_y = t.ground_height + height;
                self.vel_y = (target_y - self.pos.y) / dt;
            }
        }

        // Gravity while grounded
        if !self.is_jumping() {
            if self.pos.y > t.ground_height {
                self.vel_y -= t.gravity * t.gravity_multiplier * dt;
            } else {
                self.vel_y = 0.0;
                self.pos.y = t.ground_height;
            }
        }

        self.pos.y += self.vel_y * dt;
        if !self.is_jumping() && self.pos.y <= t.ground_height {
            self.pos.y = t.ground_height;
            self.vel_y = 0.0;
        }

        event
    }

    /// Capture current state for replication
    pub fn snapshot(&self, timestamp: f32, event: Option<SnapshotEvent>) -> PlayerSnapshot {
        PlayerSnapshot::new(
            timestamp,
            self.pos,
            self.lane,
            self.is_jumping(),
            self.jump_progress(),
            event,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::state::EntityId;

    fn primary() -> RunnerBody {
        RunnerBody::new(Side::Primary, Control::Input, RunnerTuning::default())
    }

    fn mirror() -> RunnerBody {
        RunnerBody::new(Side::Mirror, Control::Replay, RunnerTuning::default())
    }

    #[test]
    fn test_starts_grounded_in_center() {
        let body = primary();
        assert_eq!(body.jump, JumpState::Grounded);
        assert_eq!(body.lane, Lane::Center);
        assert_eq!(body.pos.x, PRIMARY_SIDE_OFFSET);
        assert_eq!(body.pos.y, GROUND_HEIGHT);
        assert_eq!(mirror().pos.x, MIRROR_SIDE_OFFSET);
    }

    #[test]
    fn test_jump_completes_and_lands() {
        let mut body = primary();
        assert!(body.jump());
        assert!(!body.jump(), "no double jump");

        let steps = (JUMP_DURATION / SIM_DT).ceil() as usize + 3;
        let mut peak: f32 = 0.0;
        let mut landed = false;
        for _ in 0..steps {
            peak = peak.max(body.pos.y);
            if body.step(SIM_DT) == Some(RunnerEvent::Landed) {
                landed = true;
                break;
            }
        }
        assert!(landed);
        assert_eq!(body.jump, JumpState::Grounded);
        assert!(peak > GROUND_HEIGHT + JUMP_HEIGHT * 0.9);
        assert!(peak <= GROUND_HEIGHT + JUMP_HEIGHT + 1e-3);
    }

    #[test]
    fn test_lane_change_never_overshoots() {
        let mut body = primary();
        body.move_right();
        let target = body.target_x();
        assert!((target - (PRIMARY_SIDE_OFFSET + LANE_DISTANCE)).abs() < 1e-6);

        let mut last = body.pos.x;
        for _ in 0..50 {
            body.step(SIM_DT);
            assert!(body.pos.x <= target + 1e-6);
            assert!(body.pos.x >= last);
            last = body.pos.x;
        }
        assert!((body.pos.x - target).abs() < 1e-6);
    }

    #[test]
    fn test_lane_and_jump_are_orthogonal() {
        let mut body = primary();
        body.jump();
        body.move_left();
        body.step(SIM_DT);
        assert!(body.is_jumping());
        assert_eq!(body.lane, Lane::Left);
        assert!(body.pos.x < PRIMARY_SIDE_OFFSET);
    }

    #[test]
    fn test_gravity_pulls_back_to_ground() {
        let mut body = primary();
        body.pos.y = GROUND_HEIGHT + 2.0;
        for _ in 0..200 {
            body.step(SIM_DT);
        }
        assert_eq!(body.pos.y, GROUND_HEIGHT);
        assert_eq!(body.vel_y, 0.0);
    }

    #[test]
    fn test_replay_body_ignores_input() {
        let mut body = mirror();
        assert!(!body.jump());
        body.move_left();
        assert_eq!(body.lane, Lane::Center);
        assert_eq!(body.jump, JumpState::Grounded);
    }

    #[test]
    fn test_snapshot_drives_replay_body() {
        let source = primary();
        let mut ghost = mirror();

        let mut snap = source.snapshot(0.0, None);
        snap.is_jumping = true;
        snap.is_grounded = false;
        snap.jump_progress = 0.25;
        snap.lane = Lane::Right;

        assert_eq!(ghost.apply_snapshot(&snap), Some(RunnerEvent::Jumped));
        assert_eq!(ghost.jump, JumpState::Jumping { progress: 0.25 });
        assert_eq!(ghost.lane, Lane::Right);
        assert!((ghost.target_x() - (MIRROR_SIDE_OFFSET + LANE_DISTANCE)).abs() < 1e-6);

        // A grounded snapshot forces the landing regardless of local progress
        let grounded = source.snapshot(0.1, None);
        ghost.apply_snapshot(&grounded);
        assert_eq!(ghost.jump, JumpState::Grounded);
    }

    #[test]
    fn test_input_body_ignores_snapshots() {
        let mut body = primary();
        let mut snap = body.snapshot(0.0, None);
        snap.lane = Lane::Left;
        snap.is_jumping = true;
        assert_eq!(body.apply_snapshot(&snap), None);
        assert_eq!(body.lane, Lane::Center);
    }

    #[test]
    fn test_snapshot_carries_event() {
        let body = primary();
        let snap = body.snapshot(2.0, Some(SnapshotEvent::Collected(EntityId(9))));
        assert_eq!(snap.collected_id, Some(EntityId(9)));
        assert_eq!(snap.hit_id, None);
        assert_eq!(snap.timestamp, 2.0);
    }

    #[test]
    fn test_forward_speed_constant_on_ground() {
        let mut body = primary();
        for _ in 0..50 {
            body.step(SIM_DT);
        }
        assert!((body.pos.z - BASE_MOVE_SPEED * 50.0 * SIM_DT).abs() < 1e-3);
    }
}

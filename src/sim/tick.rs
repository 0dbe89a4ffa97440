//! Simulation tick loop
//!
//! Two clocks drive the game. The physics tick runs at a fixed rate and moves
//! the runners. The frame tick runs once per rendered frame and handles entity
//! lifetime, course generation and mirror replication, in that order.

use super::collision::{Contact, find_contacts};
use super::runner::RunnerEvent;
use super::state::{EntityId, EntityKind, GameEvent, GamePhase, GameState, Side, SnapshotEvent};
use crate::consts::*;

/// Input triggers for a single tick (one-shot)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub lane_left: bool,
    pub lane_right: bool,
    pub jump: bool,
}

impl TickInput {
    pub fn is_empty(&self) -> bool {
        !(self.lane_left || self.lane_right || self.jump)
    }

    /// Fold another frame's triggers into this one
    pub fn merge(&mut self, other: &TickInput) {
        self.lane_left |= other.lane_left;
        self.lane_right |= other.lane_right;
        self.jump |= other.jump;
    }
}

/// Begin a fresh run. All shared state is drained before anything else runs:
/// pool first, then the replication buffer, then the spawner cursor.
pub fn start_run(state: &mut GameState) {
    let recycled = state.pool.return_all();
    state.replication.clear();
    state.spawner.reset();

    state.primary.reset();
    state.mirror.reset();
    state.stats.reset(state.tuning.lives);
    state.time = 0.0;
    state.time_ticks = 0;
    state.accumulator = 0.0;
    state.pending_input = TickInput::default();
    state.phase = GamePhase::Playing;
    state.drain_events();

    log::info!(
        "Run started (seed {}, recycled {} entities)",
        state.tuning.seed,
        recycled
    );
    state.push_event(GameEvent::RunStarted {
        seed: state.tuning.seed,
    });
}

/// Advance both runners by one fixed step and resolve primary contacts
pub fn physics_tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if state.phase != GamePhase::Playing {
        return;
    }
    state.time_ticks += 1;

    if input.lane_left {
        state.primary.move_left();
    }
    if input.lane_right {
        state.primary.move_right();
    }
    if input.jump && state.primary.jump() {
        state.push_event(GameEvent::Jumped {
            side: Side::Primary,
        });
    }

    let start_z = state.primary.pos.z;
    if state.primary.step(dt) == Some(RunnerEvent::Landed) {
        state.push_event(GameEvent::Landed {
            side: Side::Primary,
        });
    }
    state.stats.distance += state.primary.pos.z - start_z;

    if state.mirror.step(dt) == Some(RunnerEvent::Landed) {
        state.push_event(GameEvent::Landed { side: Side::Mirror });
    }

    // Continuous stream for the mirror lane
    let snapshot = state.primary.snapshot(state.time, None);
    state.replication.record_state(snapshot);

    for contact in find_contacts(state.primary.pos, Side::Primary, &state.pool) {
        handle_contact(state, contact);
        if state.phase != GamePhase::Playing {
            break;
        }
    }
}

/// Resolve a first contact between the primary runner and an entity.
/// Repeated or stale contacts are ignored.
pub fn handle_contact(state: &mut GameState, contact: Contact) {
    if contact.side != Side::Primary {
        return;
    }
    let Some(entity) = state.pool.get_mut(contact.id) else {
        return;
    };
    if entity.consumed {
        return;
    }
    entity.consumed = true;
    let (kind, pos) = (entity.kind, entity.pos);

    let id = contact.id;
    match kind {
        EntityKind::Collectible => {
            record_event_snapshot(state, SnapshotEvent::Collected(id));
            state.push_event(GameEvent::OrbCollected {
                side: Side::Primary,
                id,
                pos,
            });
            state.stats.score += 1;
            state.stats.orbs_collected += 1;
            state.stats.best_score = state.stats.best_score.max(state.stats.score);
            state.push_event(GameEvent::ScoreChanged(state.stats.score));
        }
        EntityKind::Obstacle => {
            record_event_snapshot(state, SnapshotEvent::Hit(id));
            state.push_event(GameEvent::ObstacleHit {
                side: Side::Primary,
                id,
                pos,
            });
            state.stats.obstacles_hit += 1;
            state.stats.lives = state.stats.lives.saturating_sub(1);
            state.push_event(GameEvent::LivesChanged(state.stats.lives));
            if state.stats.lives == 0 {
                state.phase = GamePhase::GameOver;
                log::info!(
                    "Game over: score {} after {:.0} units",
                    state.stats.score,
                    state.stats.distance
                );
                state.push_event(GameEvent::GameOver {
                    score: state.stats.score,
                });
            }
        }
    }

    state.pool.return_entity(id);
}

fn record_event_snapshot(state: &mut GameState, event: SnapshotEvent) {
    let snapshot = state.primary.snapshot(state.time, Some(event));
    state.replication.record_state(snapshot);
}

/// Variable-rate housekeeping: entity lifetime, lookahead, replication
pub fn frame_tick(state: &mut GameState, dt: f32) {
    if state.phase != GamePhase::Playing {
        return;
    }
    state.time += dt;

    update_entities(state, dt);

    let player_z = state.primary.pos.z;
    let now = state.time;
    state
        .spawner
        .advance(player_z, now, &mut state.pool, &mut state.replication);

    let mirrored = state
        .replication
        .tick(dt, Some(&mut state.mirror), &mut state.pool);
    for event in mirrored {
        state.push_event(event);
    }
}

/// Move oscillating obstacles and recycle entities left behind their runner
fn update_entities(state: &mut GameState, dt: f32) {
    let speed = state.tuning.spawn.moving_obstacle_speed;
    let despawn = state.tuning.spawn.despawn_distance;

    for side in Side::ALL {
        let runner_z = state.runner(side).pos.z;
        let mut expired: Vec<EntityId> = Vec::new();

        for id in state.pool.active_on_side(side) {
            let Some(entity) = state.pool.get_mut(id) else {
                continue;
            };
            if entity.pos.z < runner_z + despawn {
                expired.push(id);
                continue;
            }
            if let Some(motion) = entity.motion.as_mut() {
                entity.pos.x = motion.step(entity.pos.x, speed, dt);
            }
        }

        for id in expired {
            state.pool.return_entity(id);
            if side == Side::Mirror {
                state.replication.forget_mirror(id);
            }
        }
    }
}

/// Run as many fixed physics steps as the frame time allows, then one frame tick.
/// Triggers arriving on a frame without a physics step carry over to the next.
pub fn advance(state: &mut GameState, input: &TickInput, frame_dt: f32) {
    let frame_dt = frame_dt.clamp(0.0, 0.25);
    state.accumulator += frame_dt;
    state.pending_input.merge(input);

    let mut substeps = 0;
    while state.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
        let input = std::mem::take(&mut state.pending_input);
        physics_tick(state, &input, SIM_DT);
        state.accumulator -= SIM_DT;
        substeps += 1;
    }
    if substeps == MAX_SUBSTEPS {
        state.accumulator = state.accumulator.min(SIM_DT);
    }

    frame_tick(state, frame_dt);
}

//! Delayed replication of the primary lane onto the mirror lane
//!
//! Primary snapshots and spawn instructions are queued in bounded FIFOs and
//! replayed once per delay gate. Each gate applies at most one snapshot, then
//! drains every pending spawn, in that order.

use std::collections::{HashMap, VecDeque};

use glam::Vec3;

use super::pool::EntityPool;
use super::runner::{RunnerBody, RunnerEvent};
use super::state::{
    EntityId, GameEvent, Oscillation, PlayerSnapshot, Side, SnapshotEvent, SpawnInstruction,
};
use crate::tuning::SyncTuning;

/// Map an x coordinate from one side's center line onto another's.
/// Lane-relative offset is preserved; y and z are untouched.
#[inline]
pub fn mirror_position(pos: Vec3, from_offset: f32, to_offset: f32) -> Vec3 {
    Vec3::new(to_offset + (pos.x - from_offset), pos.y, pos.z)
}

/// FIFO that evicts its oldest entry when full
#[derive(Debug, Clone)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
    dropped: u64,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Enqueue, returning the evicted entry if the queue was full
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            self.dropped += 1;
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.dropped += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, T> {
        self.items.drain(..)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries evicted by overflow since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Primary instance id → mirror instance id
#[derive(Debug, Clone, Default)]
pub struct MirrorRegistry {
    by_primary: HashMap<EntityId, EntityId>,
    by_mirror: HashMap<EntityId, EntityId>,
}

impl MirrorRegistry {
    /// First registration for a primary id wins
    pub fn register(&mut self, primary: EntityId, mirror: EntityId) {
        if self.by_primary.contains_key(&primary) {
            return;
        }
        self.by_primary.insert(primary, mirror);
        self.by_mirror.insert(mirror, primary);
    }

    pub fn get(&self, primary: EntityId) -> Option<EntityId> {
        self.by_primary.get(&primary).copied()
    }

    /// Remove by primary id
    pub fn take(&mut self, primary: EntityId) -> Option<EntityId> {
        let mirror = self.by_primary.remove(&primary)?;
        self.by_mirror.remove(&mirror);
        Some(mirror)
    }

    /// Remove by mirror id (mirror entity despawned)
    pub fn forget_mirror(&mut self, mirror: EntityId) -> Option<EntityId> {
        let primary = self.by_mirror.remove(&mirror)?;
        self.by_primary.remove(&primary);
        Some(primary)
    }

    pub fn len(&self) -> usize {
        self.by_primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_primary.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_primary.clear();
        self.by_mirror.clear();
    }
}

/// Delay line between the primary lane and the mirror lane
#[derive(Debug)]
pub struct ReplicationBuffer {
    delay: f32,
    timer: f32,
    states: BoundedQueue<PlayerSnapshot>,
    spawns: BoundedQueue<SpawnInstruction>,
    registry: MirrorRegistry,
    lane_distance: f32,
}

impl ReplicationBuffer {
    pub fn new(sync: &SyncTuning, lane_distance: f32) -> Self {
        Self {
            delay: sync.delay,
            timer: 0.0,
            states: BoundedQueue::new(sync.state_capacity),
            spawns: BoundedQueue::new(sync.spawn_capacity),
            registry: MirrorRegistry::default(),
            lane_distance,
        }
    }

    pub fn record_state(&mut self, snapshot: PlayerSnapshot) {
        if let Some(old) = self.states.push(snapshot) {
            log::debug!("State queue full, dropped snapshot @ {:.3}s", old.timestamp);
        }
    }

    pub fn record_spawn(&mut self, instruction: SpawnInstruction) {
        if let Some(old) = self.spawns.push(instruction) {
            log::debug!("Spawn queue full, dropped spawn of {}", old.source_id);
        }
    }

    /// Accumulate frame time and run one replay step per elapsed gate.
    /// Returns the mirror-side notifications produced.
    pub fn tick(
        &mut self,
        dt: f32,
        mirror: Option<&mut RunnerBody>,
        pool: &mut EntityPool,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.timer += dt;
        if self.timer < self.delay {
            return events;
        }
        self.timer = 0.0;

        if let Some(snapshot) = self.states.pop() {
            self.apply_state(&snapshot, mirror, pool, &mut events);
        }

        let pending: Vec<_> = self.spawns.drain().collect();
        for instruction in pending {
            self.replay_spawn(&instruction, pool);
        }

        events
    }

    fn apply_state(
        &mut self,
        snapshot: &PlayerSnapshot,
        mirror: Option<&mut RunnerBody>,
        pool: &mut EntityPool,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(mirror) = mirror else {
            return;
        };

        if mirror.apply_snapshot(snapshot) == Some(RunnerEvent::Jumped) {
            events.push(GameEvent::Jumped { side: mirror.side });
        }

        let Some(event) = snapshot.event() else {
            return;
        };
        let primary_id = match event {
            SnapshotEvent::Collected(id) | SnapshotEvent::Hit(id) => id,
        };
        let Some(mirror_id) = self.registry.take(primary_id) else {
            log::debug!("No mirror registered for {primary_id}, dropping event");
            return;
        };
        let Some(entity) = pool.get_mut(mirror_id) else {
            log::debug!("Mirror {mirror_id} for {primary_id} already recycled, dropping event");
            return;
        };
        if entity.consumed {
            return;
        }
        entity.consumed = true;
        let pos = entity.pos;

        events.push(match event {
            SnapshotEvent::Collected(_) => GameEvent::OrbCollected {
                side: Side::Mirror,
                id: mirror_id,
                pos,
            },
            SnapshotEvent::Hit(_) => GameEvent::ObstacleHit {
                side: Side::Mirror,
                id: mirror_id,
                pos,
            },
        });
        pool.return_entity(mirror_id);
    }

    fn replay_spawn(&mut self, instruction: &SpawnInstruction, pool: &mut EntityPool) {
        let id = pool.checkout(Side::Mirror, instruction.kind.entity_kind());
        if let Some(entity) = pool.get_mut(id) {
            entity.pos = self.mirrored(instruction.position);
            entity.lane = instruction.lane;
            entity.layer = Some(Side::Mirror);
            entity.motion = instruction.moving.then(|| {
                Oscillation::centered(
                    Side::Mirror.offset(),
                    self.lane_distance,
                    instruction.direction,
                )
            });
        }
        self.registry.register(instruction.source_id, id);
    }

    /// Primary-side position to mirror-side position
    pub fn mirrored(&self, pos: Vec3) -> Vec3 {
        mirror_position(pos, Side::Primary.offset(), Side::Mirror.offset())
    }

    /// Drop the registry entry of a mirror entity leaving the lane
    pub fn forget_mirror(&mut self, mirror_id: EntityId) {
        self.registry.forget_mirror(mirror_id);
    }

    /// Empty both queues and the registry and restart the delay gate
    pub fn clear(&mut self) {
        self.states.clear();
        self.spawns.clear();
        self.registry.clear();
        self.timer = 0.0;
    }

    pub fn registry(&self) -> &MirrorRegistry {
        &self.registry
    }

    pub fn pending_states(&self) -> usize {
        self.states.len()
    }

    pub fn pending_spawns(&self) -> usize {
        self.spawns.len()
    }

    pub fn state_queue(&self) -> &BoundedQueue<PlayerSnapshot> {
        &self.states
    }

    pub fn spawn_queue(&self) -> &BoundedQueue<SpawnInstruction> {
        &self.spawns
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::runner::{Control, JumpState};
    use crate::sim::state::{EntityKind, Lane, SpawnKind};
    use crate::tuning::RunnerTuning;
    use proptest::prelude::*;

    fn buffer() -> ReplicationBuffer {
        ReplicationBuffer::new(&SyncTuning::default(), LANE_DISTANCE)
    }

    fn ghost() -> RunnerBody {
        RunnerBody::new(Side::Mirror, Control::Replay, RunnerTuning::default())
    }

    fn snapshot(t: f32, jumping: bool, event: Option<SnapshotEvent>) -> PlayerSnapshot {
        PlayerSnapshot::new(
            t,
            Vec3::new(PRIMARY_SIDE_OFFSET, GROUND_HEIGHT, 0.0),
            Lane::Center,
            jumping,
            0.0,
            event,
        )
    }

    fn spawn_of(pool: &mut EntityPool, kind: SpawnKind, x: f32, z: f32) -> SpawnInstruction {
        let source_id = pool.checkout(Side::Primary, kind.entity_kind());
        SpawnInstruction {
            source_id,
            kind,
            position: Vec3::new(x, OBSTACLE_HEIGHT, z),
            lane: Lane::Center,
            moving: false,
            direction: 1.0,
            created_at: 0.0,
        }
    }

    #[test]
    fn test_queue_drops_oldest() {
        let mut q = BoundedQueue::new(3);
        for i in 0..3 {
            assert_eq!(q.push(i), None);
        }
        assert_eq!(q.push(3), Some(0));
        assert_eq!(q.len(), 3);
        assert_eq!(q.dropped(), 1);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mirror_position_preserves_lane_offset() {
        let right_lane = PRIMARY_SIDE_OFFSET + LANE_DISTANCE;
        let pos = mirror_position(
            Vec3::new(right_lane, 2.0, 40.0),
            PRIMARY_SIDE_OFFSET,
            MIRROR_SIDE_OFFSET,
        );
        assert!((pos.x - (MIRROR_SIDE_OFFSET + LANE_DISTANCE)).abs() < 1e-5);
        assert_eq!(pos.y, 2.0);
        assert_eq!(pos.z, 40.0);
    }

    #[test]
    fn test_no_application_before_delay() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(1);
        let mut mirror = ghost();

        buf.record_state(snapshot(0.0, true, None));
        buf.tick(SYNC_DELAY * 0.5, Some(&mut mirror), &mut pool);
        assert_eq!(mirror.jump, JumpState::Grounded);
        assert_eq!(buf.pending_states(), 1);

        let events = buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool);
        assert!(matches!(mirror.jump, JumpState::Jumping { .. }));
        assert_eq!(events, vec![GameEvent::Jumped { side: Side::Mirror }]);
        assert_eq!(buf.pending_states(), 0);
    }

    #[test]
    fn test_one_state_per_gate_but_all_spawns() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(4);
        let mut mirror = ghost();

        for i in 0..3 {
            buf.record_state(snapshot(i as f32, false, None));
        }
        for z in [20.0, 45.0, 70.0, 95.0] {
            let s = spawn_of(&mut pool, SpawnKind::Obstacle, PRIMARY_SIDE_OFFSET, z);
            buf.record_spawn(s);
        }

        buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool);
        assert_eq!(buf.pending_states(), 2);
        assert_eq!(buf.pending_spawns(), 0);
        assert_eq!(pool.active_count(Side::Mirror, EntityKind::Obstacle), 4);
        assert_eq!(buf.registry().len(), 4);
    }

    #[test]
    fn test_spawn_replay_mirrors_and_registers() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(4);
        let mut s = spawn_of(&mut pool, SpawnKind::AirOrb, PRIMARY_SIDE_OFFSET - LANE_DISTANCE, 22.0);
        s.lane = Lane::Left;
        buf.record_spawn(s);
        buf.tick(SYNC_DELAY, None, &mut pool);

        let mirror_id = buf.registry().get(s.source_id).unwrap();
        let entity = pool.get(mirror_id).unwrap();
        assert_eq!(entity.side, Side::Mirror);
        assert_eq!(entity.kind, EntityKind::Collectible);
        assert_eq!(entity.layer, Some(Side::Mirror));
        assert_eq!(entity.lane, Lane::Left);
        assert!((entity.pos.x - (MIRROR_SIDE_OFFSET - LANE_DISTANCE)).abs() < 1e-5);
        assert_eq!(entity.pos.z, 22.0);
    }

    #[test]
    fn test_moving_spawn_oscillates_around_mirror_side() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(1);
        let mut s = spawn_of(&mut pool, SpawnKind::Obstacle, PRIMARY_SIDE_OFFSET, 30.0);
        s.moving = true;
        s.direction = -1.0;
        buf.record_spawn(s);
        buf.tick(SYNC_DELAY, None, &mut pool);

        let mirror_id = buf.registry().get(s.source_id).unwrap();
        let motion = pool.get(mirror_id).unwrap().motion.unwrap();
        assert_eq!(motion.direction, -1.0);
        assert!((motion.min_x - (MIRROR_SIDE_OFFSET - LANE_DISTANCE)).abs() < 1e-5);
        assert!((motion.max_x - (MIRROR_SIDE_OFFSET + LANE_DISTANCE)).abs() < 1e-5);
    }

    #[test]
    fn test_state_applied_before_spawns_in_same_gate() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(2);
        let mut mirror = ghost();

        // Hit referencing an entity whose spawn is queued in the same gate:
        // the state goes first, so the event finds nothing to route yet.
        let s = spawn_of(&mut pool, SpawnKind::Obstacle, PRIMARY_SIDE_OFFSET, 20.0);
        buf.record_spawn(s);
        buf.record_state(snapshot(0.0, false, Some(SnapshotEvent::Hit(s.source_id))));

        let events = buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool);
        assert!(events.is_empty());
        assert_eq!(pool.active_count(Side::Mirror, EntityKind::Obstacle), 1);
    }

    #[test]
    fn test_routed_hit_consumes_mirror_entity() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(2);
        let mut mirror = ghost();

        let s = spawn_of(&mut pool, SpawnKind::Obstacle, PRIMARY_SIDE_OFFSET, 20.0);
        buf.record_spawn(s);
        buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool);
        let mirror_id = buf.registry().get(s.source_id).unwrap();

        buf.record_state(snapshot(0.1, false, Some(SnapshotEvent::Hit(s.source_id))));
        let events = buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            GameEvent::ObstacleHit { side: Side::Mirror, id, .. } if id == mirror_id
        ));
        assert!(!pool.is_active(mirror_id));
        assert!(buf.registry().is_empty());
        pool.check_invariants();
    }

    #[test]
    fn test_hit_on_recycled_mirror_is_dropped() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(2);
        let mut mirror = ghost();

        let s = spawn_of(&mut pool, SpawnKind::Obstacle, PRIMARY_SIDE_OFFSET, 20.0);
        buf.record_spawn(s);
        buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool);
        let mirror_id = buf.registry().get(s.source_id).unwrap();

        // Despawned without the registry hearing about it
        assert!(pool.return_entity(mirror_id));
        let free_before = pool.free_count(Side::Mirror, EntityKind::Obstacle);

        buf.record_state(snapshot(0.1, false, Some(SnapshotEvent::Hit(s.source_id))));
        let events = buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool);

        assert!(events.is_empty());
        assert!(!pool.is_active(mirror_id));
        assert_eq!(pool.free_count(Side::Mirror, EntityKind::Obstacle), free_before);
        assert!(buf.registry().is_empty());
        pool.check_invariants();
    }

    #[test]
    fn test_unregistered_event_and_missing_mirror_are_noops() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(1);
        let mut mirror = ghost();

        buf.record_state(snapshot(0.0, false, Some(SnapshotEvent::Collected(EntityId(77)))));
        assert!(buf.tick(SYNC_DELAY, Some(&mut mirror), &mut pool).is_empty());

        buf.record_state(snapshot(0.1, true, None));
        assert!(buf.tick(SYNC_DELAY, None, &mut pool).is_empty());
        assert_eq!(buf.pending_states(), 0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut buf = buffer();
        let mut pool = EntityPool::new(2);
        let s = spawn_of(&mut pool, SpawnKind::Orb, PRIMARY_SIDE_OFFSET, 20.0);
        buf.record_spawn(s);
        buf.tick(SYNC_DELAY, None, &mut pool);
        buf.record_state(snapshot(0.0, true, None));
        buf.record_spawn(s);
        buf.tick(SYNC_DELAY * 0.5, None, &mut pool);

        buf.clear();
        assert_eq!(buf.pending_states(), 0);
        assert_eq!(buf.pending_spawns(), 0);
        assert!(buf.registry().is_empty());

        // Timer restarted: half a delay is not enough again
        let mut mirror = ghost();
        buf.record_state(snapshot(1.0, true, None));
        buf.tick(SYNC_DELAY * 0.5, Some(&mut mirror), &mut pool);
        assert_eq!(mirror.jump, JumpState::Grounded);
    }

    proptest! {
        #[test]
        fn prop_queue_respects_capacity(cap in 1usize..40, items in prop::collection::vec(any::<u32>(), 0..200)) {
            let mut q = BoundedQueue::new(cap);
            for &item in &items {
                q.push(item);
                prop_assert!(q.len() <= cap);
            }
            let keep = items.len().min(cap);
            let expected: Vec<u32> = items[items.len() - keep..].to_vec();
            prop_assert_eq!(q.iter().copied().collect::<Vec<_>>(), expected);
            prop_assert_eq!(q.dropped() as usize, items.len() - keep);
        }

        #[test]
        fn prop_mirror_roundtrip(x in -20.0f32..20.0, y in 0.0f32..5.0, z in -100.0f32..1000.0) {
            let start = Vec3::new(x, y, z);
            let there = mirror_position(start, PRIMARY_SIDE_OFFSET, MIRROR_SIDE_OFFSET);
            let back = mirror_position(there, MIRROR_SIDE_OFFSET, PRIMARY_SIDE_OFFSET);
            prop_assert!((back.x - start.x).abs() < 1e-4);
            prop_assert_eq!(back.y, start.y);
            prop_assert_eq!(back.z, start.z);
        }
    }
}

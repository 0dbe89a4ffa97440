//! Object pool for obstacles and collectibles
//!
//! Instances live in a single slot arena and are never freed. Each
//! (side, kind) bucket tracks which slots are parked and which are checked out
//! under an id. Ids come from one counter shared by every bucket.

use std::collections::{BTreeMap, VecDeque};

use super::state::{Entity, EntityId, EntityKind, Side};

/// Composite bucket key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub side: Side,
    pub kind: EntityKind,
}

impl PoolKey {
    pub const ALL: [PoolKey; 4] = [
        PoolKey::new(Side::Primary, EntityKind::Obstacle),
        PoolKey::new(Side::Primary, EntityKind::Collectible),
        PoolKey::new(Side::Mirror, EntityKind::Obstacle),
        PoolKey::new(Side::Mirror, EntityKind::Collectible),
    ];

    pub const fn new(side: Side, kind: EntityKind) -> Self {
        Self { side, kind }
    }

    const fn index(self) -> usize {
        (self.side as usize) * 2 + self.kind as usize
    }
}

#[derive(Debug, Default)]
struct Bucket {
    /// Slots of parked instances
    free: VecDeque<usize>,
    /// Checked-out instances, ordered by id for stable iteration
    active: BTreeMap<EntityId, usize>,
    /// Instances ever built for this bucket
    constructed: usize,
}

/// Pool of every obstacle and collectible on both sides
#[derive(Debug)]
pub struct EntityPool {
    slots: Vec<Entity>,
    buckets: [Bucket; 4],
    next_id: u32,
}

impl EntityPool {
    /// Create a pool with `warm_count` parked instances per bucket
    pub fn new(warm_count: usize) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(warm_count * PoolKey::ALL.len()),
            buckets: Default::default(),
            next_id: 1,
        };
        for _ in 0..warm_count {
            for key in PoolKey::ALL {
                let slot = pool.construct(key);
                pool.buckets[key.index()].free.push_back(slot);
            }
        }
        log::debug!("Entity pool warmed with {} instances per bucket", warm_count);
        pool
    }

    fn construct(&mut self, key: PoolKey) -> usize {
        self.slots.push(Entity::new(key.side, key.kind));
        self.buckets[key.index()].constructed += 1;
        self.slots.len() - 1
    }

    /// Check out an instance, building one if the bucket is empty
    pub fn checkout(&mut self, side: Side, kind: EntityKind) -> EntityId {
        let key = PoolKey::new(side, kind);
        let slot = match self.buckets[key.index()].free.pop_front() {
            Some(slot) => slot,
            None => {
                let slot = self.construct(key);
                log::trace!(
                    "Pool {} {:?} grew to {}",
                    side.as_str(),
                    kind,
                    self.buckets[key.index()].constructed
                );
                slot
            }
        };

        let id = EntityId(self.next_id);
        self.next_id += 1;
        debug_assert!(self.locate(id).is_none(), "id {id} already active");

        self.slots[slot].activate(id);
        self.buckets[key.index()].active.insert(id, slot);
        id
    }

    /// Park an instance again. Unknown or already returned ids are ignored.
    pub fn return_entity(&mut self, id: EntityId) -> bool {
        let Some((key, slot)) = self.locate(id) else {
            log::debug!("Ignoring return of inactive entity {id}");
            return false;
        };
        let bucket = &mut self.buckets[key.index()];
        bucket.active.remove(&id);
        bucket.free.push_back(slot);
        self.slots[slot].deactivate();
        true
    }

    /// Park every active instance; returns how many were returned
    pub fn return_all(&mut self) -> usize {
        let mut returned = 0;
        for bucket in &mut self.buckets {
            for (_, slot) in std::mem::take(&mut bucket.active) {
                self.slots[slot].deactivate();
                bucket.free.push_back(slot);
                returned += 1;
            }
        }
        returned
    }

    fn locate(&self, id: EntityId) -> Option<(PoolKey, usize)> {
        PoolKey::ALL.into_iter().find_map(|key| {
            self.buckets[key.index()]
                .active
                .get(&id)
                .map(|&slot| (key, slot))
        })
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.locate(id).map(|(_, slot)| &self.slots[slot])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.locate(id).map(|(_, slot)| &mut self.slots[slot])
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.locate(id).is_some()
    }

    /// Active ids of one bucket in ascending order
    pub fn active_ids(&self, side: Side, kind: EntityKind) -> impl Iterator<Item = EntityId> + '_ {
        self.buckets[PoolKey::new(side, kind).index()]
            .active
            .keys()
            .copied()
    }

    /// Active ids of both kinds on one side, ascending
    pub fn active_on_side(&self, side: Side) -> Vec<EntityId> {
        let mut ids: Vec<_> = EntityKind::ALL
            .into_iter()
            .flat_map(|kind| self.active_ids(side, kind))
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn active_count(&self, side: Side, kind: EntityKind) -> usize {
        self.buckets[PoolKey::new(side, kind).index()].active.len()
    }

    pub fn free_count(&self, side: Side, kind: EntityKind) -> usize {
        self.buckets[PoolKey::new(side, kind).index()].free.len()
    }

    pub fn constructed_count(&self, side: Side, kind: EntityKind) -> usize {
        self.buckets[PoolKey::new(side, kind).index()].constructed
    }

    pub fn total_active(&self) -> usize {
        self.buckets.iter().map(|b| b.active.len()).sum()
    }

    /// Panics if any bucket leaks, double-books a slot, or shares an active id
    pub fn check_invariants(&self) {
        let mut seen_slots = vec![false; self.slots.len()];
        let mut seen_ids = std::collections::HashSet::new();

        for key in PoolKey::ALL {
            let bucket = &self.buckets[key.index()];
            assert_eq!(
                bucket.free.len() + bucket.active.len(),
                bucket.constructed,
                "bucket {key:?} leaked instances"
            );
            for &slot in &bucket.free {
                assert!(!seen_slots[slot], "slot {slot} owned twice");
                seen_slots[slot] = true;
                assert!(!self.slots[slot].is_active(), "parked slot {slot} is active");
            }
            for (&id, &slot) in &bucket.active {
                assert!(!seen_slots[slot], "slot {slot} owned twice");
                seen_slots[slot] = true;
                assert!(seen_ids.insert(id), "id {id} active in two buckets");
                let entity = &self.slots[slot];
                assert_eq!(entity.id(), Some(id));
                assert_eq!((entity.side, entity.kind), (key.side, key.kind));
            }
        }
        assert!(seen_slots.into_iter().all(|s| s), "orphaned slot");
    }
}

impl Default for EntityPool {
    fn default() -> Self {
        Self::new(crate::consts::POOL_WARM_COUNT)
    }
}

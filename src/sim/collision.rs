//! Contact detection between runners and pooled entities
//!
//! Stands in for a physics engine's contact callbacks: a runner touches an
//! entity when their boxes overlap and both share a collision layer. Only the
//! first contact counts; the caller marks the entity consumed.

use glam::Vec3;

use super::pool::EntityPool;
use super::state::{EntityId, EntityKind, Side};

/// Runner box half extents (1 wide, 2 tall, 1 deep)
pub const RUNNER_HALF_EXTENTS: Vec3 = Vec3::new(0.5, 1.0, 0.5);
/// Obstacle box half extents; narrower than a lane gap so lanes never overlap
pub const OBSTACLE_HALF_EXTENTS: Vec3 = Vec3::new(1.0, 0.5, 0.5);
/// Orb box half extents
pub const ORB_HALF_EXTENTS: Vec3 = Vec3::new(0.5, 0.5, 0.5);

pub fn half_extents(kind: EntityKind) -> Vec3 {
    match kind {
        EntityKind::Obstacle => OBSTACLE_HALF_EXTENTS,
        EntityKind::Collectible => ORB_HALF_EXTENTS,
    }
}

/// A first contact between a runner and an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub side: Side,
    pub id: EntityId,
    pub kind: EntityKind,
}

/// Strict box overlap (touching faces do not count)
#[inline]
pub fn aabb_overlap(a_center: Vec3, a_half: Vec3, b_center: Vec3, b_half: Vec3) -> bool {
    let d = (a_center - b_center).abs();
    let reach = a_half + b_half;
    d.x < reach.x && d.y < reach.y && d.z < reach.z
}

/// Find unconsumed entities on `side`'s layer touching a runner at `runner_pos`.
/// Results are in ascending id order.
pub fn find_contacts(runner_pos: Vec3, side: Side, pool: &EntityPool) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for id in pool.active_on_side(side) {
        let Some(entity) = pool.get(id) else {
            continue;
        };
        if entity.consumed || entity.layer != Some(side) {
            continue;
        }
        if aabb_overlap(runner_pos, RUNNER_HALF_EXTENTS, entity.pos, half_extents(entity.kind)) {
            contacts.push(Contact {
                side,
                id,
                kind: entity.kind,
            });
        }
    }
    contacts
}

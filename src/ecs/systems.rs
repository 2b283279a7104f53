use crate::ecs::physics::{separation, Aabb, PhysicsParams, SpatialHash, SpatialMetrics};
use crate::ecs::types::{Collider, RigidBody, Transform};
use crate::events::{EventBus, GameEvent};
use bevy_ecs::prelude::*;
use glam::Vec2;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Resource, Clone, Copy)]
pub struct TimeDelta(pub f32);

/// Semi-implicit Euler over dynamic bodies: gravity, linear drag, then
/// position advance. Static bodies and collider-only entities never move.
pub fn sys_integrate_bodies(
    params: Res<PhysicsParams>,
    dt: Res<TimeDelta>,
    mut q: Query<(&mut Transform, &mut RigidBody)>,
) {
    let dt = dt.0;
    for (mut transform, mut body) in &mut q {
        if !body.is_dynamic() {
            continue;
        }
        if body.use_gravity {
            let gravity = params.gravity;
            body.velocity += gravity * dt;
        }
        if body.drag > 0.0 {
            let decay = (1.0 - body.drag * dt).max(0.0);
            body.velocity *= decay;
        }
        let step = body.velocity * dt;
        transform.translation += step;
    }
}

fn world_aabb(transform: &Transform, collider: &Collider) -> Aabb {
    Aabb::new(transform.translation + collider.offset, collider.shape.half_extents())
}

/// Rebuild the uniform grid from scratch every step; there is no
/// incremental maintenance.
pub fn sys_build_spatial_hash(
    mut grid: ResMut<SpatialHash>,
    mut metrics: ResMut<SpatialMetrics>,
    q: Query<(Entity, &Transform, &Collider)>,
) {
    grid.clear();
    let mut entity_count = 0usize;
    for (entity, transform, collider) in &q {
        grid.insert(entity, &world_aabb(transform, collider));
        entity_count += 1;
    }
    let occupied_cells = grid.grid.len();
    let mut total_entries = 0usize;
    let mut max_cell_occupancy = 0usize;
    for list in grid.grid.values() {
        total_entries += list.len();
        max_cell_occupancy = max_cell_occupancy.max(list.len());
    }
    let average_occupancy = if occupied_cells > 0 {
        total_entries as f32 / occupied_cells as f32
    } else {
        0.0
    };
    *metrics = SpatialMetrics {
        entity_count,
        occupied_cells,
        max_cell_occupancy,
        average_occupancy,
        narrowphase_tests: 0,
        contacts: 0,
    };
}

#[derive(Clone, Copy)]
struct BodyView {
    entity: Entity,
    aabb: Aabb,
    collider: Collider,
    dynamic: bool,
    inv_mass: f32,
}

/// Broadphase query, AABB narrowphase, MTV resolution, event emission.
/// Pairs surface once (ordered by snapshot position), and resolved
/// positions feed later pairs within the same step.
pub fn sys_collide_and_resolve(
    grid: Res<SpatialHash>,
    params: Res<PhysicsParams>,
    mut metrics: ResMut<SpatialMetrics>,
    mut events: ResMut<EventBus>,
    mut q: Query<(Entity, &mut Transform, &Collider, Option<&mut RigidBody>)>,
) {
    let mut views: Vec<BodyView> = Vec::new();
    let mut slots: HashMap<Entity, usize> = HashMap::new();
    for (entity, transform, collider, body) in q.iter() {
        slots.insert(entity, views.len());
        views.push(BodyView {
            entity,
            aabb: world_aabb(transform, collider),
            collider: *collider,
            dynamic: body.map_or(false, |b| b.is_dynamic()),
            inv_mass: body.map_or(0.0, |b| b.inv_mass()),
        });
    }

    let mut candidates: SmallVec<[Entity; 16]> = SmallVec::new();
    for i in 0..views.len() {
        grid.query(&views[i].aabb, &mut candidates);
        for &other in &candidates {
            let j = slots[&other];
            if j <= i {
                continue;
            }
            let a = views[i];
            let b = views[j];
            metrics.narrowphase_tests += 1;
            if !a.collider.admits(&b.collider) {
                continue;
            }
            if !a.aabb.overlaps(&b.aabb) {
                continue;
            }
            if a.collider.is_trigger || b.collider.is_trigger {
                events.push(GameEvent::collision_started(a.entity, b.entity, true));
                metrics.contacts += 1;
                continue;
            }
            if !a.dynamic && !b.dynamic {
                continue;
            }

            let sep = separation(&a.aabb, &b.aabb);
            let inv_sum = a.inv_mass + b.inv_mass;
            let weight_a = if a.dynamic { a.inv_mass / inv_sum } else { 0.0 };
            let weight_b = if b.dynamic { b.inv_mass / inv_sum } else { 0.0 };
            let push = sep.normal * (sep.depth * params.correction_factor);

            let Ok([(_, mut transform_a, _, body_a), (_, mut transform_b, _, body_b)]) =
                q.get_many_mut([a.entity, b.entity])
            else {
                continue;
            };
            if weight_a > 0.0 {
                transform_a.translation += push * weight_a;
                views[i].aabb.center += push * weight_a;
                if let Some(mut body) = body_a {
                    zero_along_normal(&mut body.velocity, sep.normal);
                }
            }
            if weight_b > 0.0 {
                transform_b.translation -= push * weight_b;
                views[j].aabb.center -= push * weight_b;
                if let Some(mut body) = body_b {
                    zero_along_normal(&mut body.velocity, sep.normal);
                }
            }

            events.push(GameEvent::collision_started(a.entity, b.entity, false));
            metrics.contacts += 1;
        }
    }
}

fn zero_along_normal(velocity: &mut Vec2, normal: Vec2) {
    if normal.x != 0.0 {
        velocity.x = 0.0;
    } else {
        velocity.y = 0.0;
    }
}

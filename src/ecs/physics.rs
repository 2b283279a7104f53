use bevy_ecs::prelude::{Entity, Resource};
use glam::Vec2;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Resource, Clone, Copy)]
pub struct PhysicsParams {
    pub gravity: Vec2,
    /// Positional correction multiplier, slightly above 1 so resolved
    /// bodies don't re-sink from float error.
    pub correction_factor: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self { gravity: Vec2::new(0.0, 980.0), correction_factor: 1.01 }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Aabb {
    pub center: Vec2,
    pub half: Vec2,
}

impl Aabb {
    pub fn new(center: Vec2, half: Vec2) -> Self {
        Self { center, half }
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center.x - other.center.x).abs() < (self.half.x + other.half.x)
            && (self.center.y - other.center.y).abs() < (self.half.y + other.half.y)
    }

    /// Per-axis penetration depths of the intersection rectangle.
    /// Only meaningful when `overlaps` holds.
    pub fn penetration(&self, other: &Aabb) -> Vec2 {
        Vec2::new(
            (self.half.x + other.half.x) - (self.center.x - other.center.x).abs(),
            (self.half.y + other.half.y) - (self.center.y - other.center.y).abs(),
        )
    }
}

/// Minimum-translation-vector pick for an overlapping pair: the axis with
/// the smaller penetration, pushing `a` away from `b`.
#[derive(Clone, Copy, Debug)]
pub struct Separation {
    /// Unit vector along the chosen axis, pointing from `b` toward `a`.
    pub normal: Vec2,
    pub depth: f32,
}

pub fn separation(a: &Aabb, b: &Aabb) -> Separation {
    let depths = a.penetration(b);
    if depths.x < depths.y {
        let sign = if a.center.x >= b.center.x { 1.0 } else { -1.0 };
        Separation { normal: Vec2::new(sign, 0.0), depth: depths.x }
    } else {
        let sign = if a.center.y >= b.center.y { 1.0 } else { -1.0 };
        Separation { normal: Vec2::new(0.0, sign), depth: depths.y }
    }
}

/// Uniform grid keyed by integer cell coordinates, rebuilt from scratch
/// every logical step. Lookups return a conservative superset of true
/// overlaps for the narrowphase to prune.
#[derive(Resource)]
pub struct SpatialHash {
    pub cell: f32,
    pub grid: HashMap<(i32, i32), Vec<Entity>>,
}

impl SpatialHash {
    pub fn new(cell: f32) -> Self {
        Self { cell, grid: HashMap::new() }
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    pub fn key(&self, p: Vec2) -> (i32, i32) {
        ((p.x / self.cell).floor() as i32, (p.y / self.cell).floor() as i32)
    }

    pub fn insert(&mut self, e: Entity, aabb: &Aabb) {
        let (kx0, ky0) = self.key(aabb.min());
        let (kx1, ky1) = self.key(aabb.max());
        for ky in ky0..=ky1 {
            for kx in kx0..=kx1 {
                self.grid.entry((kx, ky)).or_default().push(e);
            }
        }
    }

    /// Union of all entities registered in the cells the box overlaps,
    /// deduplicated and sorted so downstream pair order is deterministic.
    pub fn query(&self, aabb: &Aabb, out: &mut SmallVec<[Entity; 16]>) {
        out.clear();
        let (kx0, ky0) = self.key(aabb.min());
        let (kx1, ky1) = self.key(aabb.max());
        for ky in ky0..=ky1 {
            for kx in kx0..=kx1 {
                if let Some(list) = self.grid.get(&(kx, ky)) {
                    out.extend(list.iter().copied());
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

/// Per-step broadphase/narrowphase counters. The scaling tests assert on
/// these instead of wall time.
#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct SpatialMetrics {
    pub entity_count: usize,
    pub occupied_cells: usize,
    pub max_cell_occupancy: usize,
    pub average_occupancy: f32,
    pub narrowphase_tests: usize,
    pub contacts: usize,
}

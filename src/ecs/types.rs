use crate::scene::{PropertyValue, SceneEntityId};
use bevy_ecs::prelude::*;
use bitflags::bitflags;
use glam::Vec2;
use std::collections::HashMap;

#[derive(Component, Clone, Copy)]
pub struct Transform {
    pub translation: Vec2,
    /// Degrees, the unit scene files are authored in.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self { translation: Vec2::ZERO, rotation: 0.0, scale: Vec2::splat(1.0) }
    }
}

#[derive(Component, Clone)]
pub struct Name(pub String);

#[derive(Component, Clone)]
pub struct SceneEntityTag {
    pub id: SceneEntityId,
}

impl SceneEntityTag {
    pub fn new(id: SceneEntityId) -> Self {
        Self { id }
    }
}

/// Linear rigid-body state. `mass == 0` marks a static body: immovable,
/// infinite effective mass. Velocity lives here and nowhere else; the
/// integrator and the script host read and write the same field.
#[derive(Component, Clone, Copy)]
pub struct RigidBody {
    pub mass: f32,
    pub drag: f32,
    pub use_gravity: bool,
    /// Carried for scene parity and a future impulse resolver; the current
    /// contact response is a hard stop and does not consume it.
    pub restitution: f32,
    pub friction: f32,
    pub velocity: Vec2,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            mass: 1.0,
            drag: 0.0,
            use_gravity: true,
            restitution: 0.5,
            friction: 0.5,
            velocity: Vec2::ZERO,
        }
    }
}

impl RigidBody {
    pub fn is_dynamic(&self) -> bool {
        self.mass > 0.0
    }

    pub fn inv_mass(&self) -> f32 {
        if self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }
}

bitflags! {
    /// Collision layer bits for the category/mask pair.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Layers: u32 {
        const DEFAULT = 1;
        const ALL = u32::MAX;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderShape {
    Box { half: Vec2 },
    /// Circles are overlap-tested as their bounding boxes. The radius is
    /// kept so a true circle test can be added without touching scene data.
    Circle { radius: f32 },
}

impl ColliderShape {
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            ColliderShape::Box { half } => half,
            ColliderShape::Circle { radius } => Vec2::splat(radius),
        }
    }
}

#[derive(Component, Clone, Copy)]
pub struct Collider {
    pub shape: ColliderShape,
    pub offset: Vec2,
    /// Triggers report overlap but are never positionally resolved.
    pub is_trigger: bool,
    pub category: Layers,
    pub mask: Layers,
}

impl Collider {
    /// Pair gate: both directions of the category/mask handshake must pass.
    pub fn admits(&self, other: &Collider) -> bool {
        self.category.intersects(other.mask) && other.category.intersects(self.mask)
    }
}

/// Behaviour binding authored in the scene; resolved by name through the
/// behaviour registry when the entity spawns.
#[derive(Component, Clone)]
pub struct ScriptRef {
    pub behaviour: String,
    pub properties: HashMap<String, PropertyValue>,
}

#[derive(Clone)]
pub struct ColliderInfo {
    pub shape: ColliderShape,
    pub offset: Vec2,
    pub is_trigger: bool,
}

/// Read-only per-entity snapshot handed to presentation once per logical
/// step.
#[derive(Clone)]
pub struct EntityInfo {
    pub scene_id: SceneEntityId,
    pub name: String,
    pub translation: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub velocity: Option<Vec2>,
    pub collider: Option<ColliderInfo>,
    pub behaviour: Option<String>,
}

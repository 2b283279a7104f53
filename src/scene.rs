use crate::ecs::types::{Collider, ColliderShape, Layers};
use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SceneEntityId(String);

impl SceneEntityId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SceneEntityId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub metadata: SceneMetadata,
    #[serde(default)]
    pub entities: Vec<SceneEntity>,
}

impl Default for Scene {
    fn default() -> Self {
        Self { metadata: SceneMetadata::default(), entities: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMetadata {
    #[serde(default = "SceneMetadata::default_name")]
    pub name: String,
    #[serde(default = "SceneMetadata::default_version")]
    pub version: u32,
}

impl SceneMetadata {
    fn default_name() -> String {
        "Untitled".to_string()
    }
    const fn default_version() -> u32 {
        1
    }
}

impl Default for SceneMetadata {
    fn default() -> Self {
        Self { name: Self::default_name(), version: Self::default_version() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEntity {
    #[serde(default)]
    pub id: SceneEntityId,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub transform: TransformData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rigid_body: Option<RigidBodyData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_collider: Option<BoxColliderData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_collider: Option<CircleColliderData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptData>,
}

impl SceneEntity {
    /// A prefab file holds exactly one entity template.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Reading prefab file {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Parsing prefab file {}", path.display()))
    }

    /// Fail-fast gate for everything that would silently poison the
    /// simulation downstream: non-finite transforms, negative mass/drag,
    /// degenerate collider extents.
    pub fn validate(&self) -> Result<()> {
        let t = &self.transform;
        let finite = t.translation.x.is_finite()
            && t.translation.y.is_finite()
            && t.rotation.is_finite()
            && t.scale.x.is_finite()
            && t.scale.y.is_finite();
        if !finite {
            return Err(anyhow!("Entity '{}' has a non-finite transform", self.name));
        }
        if let Some(rb) = &self.rigid_body {
            if !(rb.mass.is_finite() && rb.mass >= 0.0) {
                return Err(anyhow!("Entity '{}' has invalid mass {}", self.name, rb.mass));
            }
            if !(rb.drag.is_finite() && rb.drag >= 0.0) {
                return Err(anyhow!("Entity '{}' has invalid drag {}", self.name, rb.drag));
            }
            if !(rb.velocity.x.is_finite() && rb.velocity.y.is_finite()) {
                return Err(anyhow!("Entity '{}' has non-finite velocity", self.name));
            }
        }
        if let Some(collider) = &self.box_collider {
            if !(collider.size.x > 0.0 && collider.size.y > 0.0)
                || !(collider.size.x.is_finite() && collider.size.y.is_finite())
            {
                return Err(anyhow!("Entity '{}' has degenerate box collider size", self.name));
            }
        }
        if let Some(collider) = &self.circle_collider {
            if !(collider.radius > 0.0) || !collider.radius.is_finite() {
                return Err(anyhow!("Entity '{}' has degenerate circle radius", self.name));
            }
        }
        Ok(())
    }

    /// At most one collider per entity; when a scene authors both, the box
    /// wins and the circle is dropped with a warning.
    pub fn collider_component(&self) -> Option<Collider> {
        if self.box_collider.is_some() && self.circle_collider.is_some() {
            eprintln!(
                "[scene] Entity '{}' declares both collider variants; keeping the box",
                self.name
            );
        }
        if let Some(data) = &self.box_collider {
            return Some(Collider {
                shape: ColliderShape::Box {
                    half: Vec2::new(data.size.x * 0.5, data.size.y * 0.5),
                },
                offset: Vec2::new(data.offset.x, data.offset.y),
                is_trigger: data.is_trigger,
                category: Layers::from_bits_retain(data.category),
                mask: Layers::from_bits_retain(data.mask),
            });
        }
        if let Some(data) = &self.circle_collider {
            return Some(Collider {
                shape: ColliderShape::Circle { radius: data.radius },
                offset: Vec2::new(data.offset.x, data.offset.y),
                is_trigger: data.is_trigger,
                category: Layers::from_bits_retain(data.category),
                mask: Layers::from_bits_retain(data.mask),
            });
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Vec2Data {
    pub x: f32,
    pub y: f32,
}

impl Vec2Data {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Vec2> for Vec2Data {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vec2Data> for Vec2 {
    fn from(v: Vec2Data) -> Self {
        Vec2::new(v.x, v.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformData {
    #[serde(default)]
    pub translation: Vec2Data,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_unit_scale")]
    pub scale: Vec2Data,
}

impl Default for TransformData {
    fn default() -> Self {
        Self { translation: Vec2Data::default(), rotation: 0.0, scale: default_unit_scale() }
    }
}

fn default_unit_scale() -> Vec2Data {
    Vec2Data { x: 1.0, y: 1.0 }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBodyData {
    #[serde(default = "RigidBodyData::default_mass")]
    pub mass: f32,
    #[serde(default)]
    pub drag: f32,
    #[serde(default = "default_true")]
    pub use_gravity: bool,
    #[serde(default = "RigidBodyData::default_restitution")]
    pub restitution: f32,
    #[serde(default = "RigidBodyData::default_friction")]
    pub friction: f32,
    #[serde(default)]
    pub velocity: Vec2Data,
}

impl RigidBodyData {
    const fn default_mass() -> f32 {
        1.0
    }
    const fn default_restitution() -> f32 {
        0.5
    }
    const fn default_friction() -> f32 {
        0.5
    }
}

impl Default for RigidBodyData {
    fn default() -> Self {
        Self {
            mass: Self::default_mass(),
            drag: 0.0,
            use_gravity: true,
            restitution: Self::default_restitution(),
            friction: Self::default_friction(),
            velocity: Vec2Data::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxColliderData {
    #[serde(default = "BoxColliderData::default_size")]
    pub size: Vec2Data,
    #[serde(default)]
    pub offset: Vec2Data,
    #[serde(default)]
    pub is_trigger: bool,
    #[serde(default = "default_category")]
    pub category: u32,
    #[serde(default = "default_mask")]
    pub mask: u32,
}

impl BoxColliderData {
    fn default_size() -> Vec2Data {
        Vec2Data { x: 50.0, y: 50.0 }
    }
}

impl Default for BoxColliderData {
    fn default() -> Self {
        Self {
            size: Self::default_size(),
            offset: Vec2Data::default(),
            is_trigger: false,
            category: default_category(),
            mask: default_mask(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleColliderData {
    #[serde(default = "CircleColliderData::default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub offset: Vec2Data,
    #[serde(default)]
    pub is_trigger: bool,
    #[serde(default = "default_category")]
    pub category: u32,
    #[serde(default = "default_mask")]
    pub mask: u32,
}

impl CircleColliderData {
    const fn default_radius() -> f32 {
        25.0
    }
}

impl Default for CircleColliderData {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
            offset: Vec2Data::default(),
            is_trigger: false,
            category: default_category(),
            mask: default_mask(),
        }
    }
}

const fn default_category() -> u32 {
    1
}

const fn default_mask() -> u32 {
    u32::MAX
}

/// Scene-authored literal for seeding a behaviour's declared fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptData {
    /// Registry name of the behaviour, not a file path.
    pub behaviour: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl Scene {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Reading scene file {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Parsing scene file {}", path.display()))
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating scene directory {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(self).context("Serializing scene")?;
        fs::write(path, json).with_context(|| format!("Writing scene file {}", path.display()))
    }
}

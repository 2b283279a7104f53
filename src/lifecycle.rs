use crate::scene::SceneEntity;
use anyhow::{Context, Result};
use bevy_ecs::prelude::{Entity, Resource};
use glam::Vec2;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A deferred spawn raised from a script. The entity id is reserved at
/// enqueue time so the caller holds a stable handle; components appear
/// only when the queue drains.
#[derive(Debug, Clone)]
pub struct InstantiateRequest {
    pub target: Entity,
    pub template: String,
    pub position: Vec2,
    pub rotation: f32,
}

/// Structural mutations raised during a step. Nothing here is applied
/// synchronously: the queue drains after the collision and script passes,
/// in a fixed order (instantiate, destroy, scene swap), so no collection
/// is ever mutated while being iterated.
#[derive(Resource, Default)]
pub struct LifecycleQueue {
    pub instantiate: Vec<InstantiateRequest>,
    pub destroy: Vec<Entity>,
    pub scene_swap: Option<String>,
}

impl LifecycleQueue {
    pub fn queue_instantiate(&mut self, request: InstantiateRequest) {
        self.instantiate.push(request);
    }

    pub fn queue_destroy(&mut self, entity: Entity) {
        self.destroy.push(entity);
    }

    /// Last request wins when several scripts ask for a swap in one step.
    pub fn request_scene(&mut self, path: impl Into<String>) {
        self.scene_swap = Some(path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.instantiate.is_empty() && self.destroy.is_empty() && self.scene_swap.is_none()
    }
}

/// Named entity templates for deferred instantiation. Scene data and
/// scripts refer to templates by name; files register under their stem.
#[derive(Default)]
pub struct PrefabLibrary {
    templates: HashMap<String, SceneEntity>,
}

impl PrefabLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, template: SceneEntity) {
        self.templates.insert(name.into(), template);
    }

    /// Load every `*.json` template in a directory. A malformed file is an
    /// asset error: logged and skipped, never fatal.
    pub fn load_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let entries =
            fs::read_dir(dir).with_context(|| format!("Reading prefab directory {}", dir.display()))?;
        let mut loaded = 0usize;
        for entry in entries {
            let path = entry.context("Reading prefab directory entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                continue;
            };
            match SceneEntity::load_from_path(&path) {
                Ok(template) => {
                    self.templates.insert(name, template);
                    loaded += 1;
                }
                Err(err) => {
                    eprintln!("[prefab] Skipping {}: {err:#}", path.display());
                }
            }
        }
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> Option<&SceneEntity> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

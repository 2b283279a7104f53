use crate::ecs::physics::{PhysicsParams, SpatialHash, SpatialMetrics};
use crate::ecs::systems::{
    sys_build_spatial_hash, sys_collide_and_resolve, sys_integrate_bodies, TimeDelta,
};
use crate::ecs::types::{
    Collider, ColliderInfo, ColliderShape, EntityInfo, Name, RigidBody, SceneEntityTag, ScriptRef,
    Transform,
};
use crate::events::{EventBus, GameEvent};
use crate::lifecycle::LifecycleQueue;
use crate::scene::{Scene, SceneEntity, SceneEntityId};
use anyhow::{anyhow, Result};
use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use glam::Vec2;
use std::collections::HashMap;

/// The root simulation container: entities, fixed-step schedule, spatial
/// index, event bus and lifecycle queues. One loaded scene per lifetime;
/// a scene swap rebuilds the contents wholesale. There is no hidden
/// global; every subsystem receives `&mut SimWorld` explicitly.
pub struct SimWorld {
    pub world: World,
    schedule_fixed: Schedule,
}

impl SimWorld {
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(TimeDelta(0.0));
        world.insert_resource(SpatialHash::new(64.0));
        world.insert_resource(SpatialMetrics::default());
        world.insert_resource(PhysicsParams::default());
        world.insert_resource(EventBus::default());
        world.insert_resource(LifecycleQueue::default());

        let mut schedule_fixed = Schedule::default();
        schedule_fixed.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule_fixed
            .add_systems((sys_integrate_bodies, sys_build_spatial_hash, sys_collide_and_resolve).chain());

        Self { world, schedule_fixed }
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.world.resource_mut::<PhysicsParams>().gravity = gravity;
    }

    pub fn set_correction_factor(&mut self, factor: f32) {
        self.world.resource_mut::<PhysicsParams>().correction_factor = factor;
    }

    pub fn set_spatial_cell(&mut self, cell: f32) {
        // A non-positive cell would make insertion span unbounded ranges.
        self.world.resource_mut::<SpatialHash>().cell = cell.max(1.0e-3);
    }

    /// Run one logical step of the physics pipeline: integrate, rebuild
    /// the spatial index, collide and resolve. Collision events land on
    /// the event bus for the caller to dispatch.
    pub fn fixed_step(&mut self, dt: f32) {
        self.world.resource_mut::<TimeDelta>().0 = dt;
        self.schedule_fixed.run(&mut self.world);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.world.resource_mut::<EventBus>().drain()
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.world.resource_mut::<EventBus>().push(event);
    }

    pub fn spatial_metrics(&self) -> SpatialMetrics {
        *self.world.resource::<SpatialMetrics>()
    }

    pub fn take_lifecycle(&mut self) -> LifecycleQueue {
        std::mem::take(&mut *self.world.resource_mut::<LifecycleQueue>())
    }

    /// Allocate an empty entity id ahead of its deferred instantiation, so
    /// scripts get a stable handle for an object that only materializes
    /// when the queue drains.
    pub fn reserve_entity(&mut self) -> Entity {
        self.world.spawn_empty().id()
    }

    pub fn spawn_from_data(&mut self, data: &SceneEntity) -> Result<Entity> {
        let entity = self.world.spawn_empty().id();
        self.insert_components(entity, data)?;
        Ok(entity)
    }

    /// Populate a previously reserved (or freshly spawned) entity from
    /// scene data. Rejects non-finite transforms before anything can
    /// reach the spatial index.
    pub fn insert_components(&mut self, entity: Entity, data: &SceneEntity) -> Result<()> {
        data.validate()?;
        let mut entry = self.world.entity_mut(entity);
        entry.insert((
            Transform {
                translation: Vec2::new(data.transform.translation.x, data.transform.translation.y),
                rotation: data.transform.rotation,
                scale: Vec2::new(data.transform.scale.x, data.transform.scale.y),
            },
            Name(data.name.clone()),
            SceneEntityTag::new(data.id.clone()),
        ));
        if let Some(rb) = &data.rigid_body {
            entry.insert(RigidBody {
                mass: rb.mass,
                drag: rb.drag,
                use_gravity: rb.use_gravity,
                restitution: rb.restitution,
                friction: rb.friction,
                velocity: Vec2::new(rb.velocity.x, rb.velocity.y),
            });
        }
        if let Some(collider) = data.collider_component() {
            entry.insert(collider);
        }
        if let Some(script) = &data.script {
            entry.insert(ScriptRef {
                behaviour: script.behaviour.clone(),
                properties: script.properties.clone(),
            });
        }
        Ok(())
    }

    /// Spawn every active entity of a scene into an empty world. Inactive
    /// entities are skipped outright; duplicate stable ids are an error.
    pub fn load_scene(&mut self, scene: &Scene) -> Result<()> {
        self.clear_scene_entities();
        let mut seen: HashMap<SceneEntityId, Entity> = HashMap::with_capacity(scene.entities.len());
        for entity_data in &scene.entities {
            if !entity_data.active {
                continue;
            }
            let entity = self.spawn_from_data(entity_data)?;
            if seen.insert(entity_data.id.clone(), entity).is_some() {
                return Err(anyhow!(
                    "Scene contains duplicate entity id '{}'",
                    entity_data.id.as_str()
                ));
            }
        }
        Ok(())
    }

    /// Tear down all entities and per-step state. Resources (params, cell
    /// size) survive; queued lifecycle ops and events do not.
    pub fn clear_scene_entities(&mut self) {
        self.world.clear_entities();
        self.world.resource_mut::<SpatialHash>().clear();
        self.world.resource_mut::<EventBus>().drain();
        *self.world.resource_mut::<LifecycleQueue>() = LifecycleQueue::default();
    }

    /// The single removal path: despawning drops every component, and the
    /// next step's index rebuild forgets the entity without any side
    /// bookkeeping.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entity_exists(entity) {
            return false;
        }
        // Reserved-but-never-filled handles vanish silently; only entities
        // that actually existed announce their departure.
        let announced = self.world.get::<SceneEntityTag>(entity).is_some();
        let removed = self.world.despawn(entity);
        if removed && announced {
            self.push_event(GameEvent::EntityDespawned { entity });
        }
        removed
    }

    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }

    pub fn entity_count(&self) -> usize {
        self.world.entities().len() as usize
    }

    pub fn find_entity(&mut self, name: &str) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &Name)>();
        query.iter(&self.world).find_map(|(entity, n)| (n.0 == name).then_some(entity))
    }

    pub fn entity_name(&self, entity: Entity) -> Option<String> {
        self.world.get::<Name>(entity).map(|n| n.0.clone())
    }

    pub fn velocity(&self, entity: Entity) -> Option<Vec2> {
        self.world.get::<RigidBody>(entity).map(|rb| rb.velocity)
    }

    pub fn set_velocity(&mut self, entity: Entity, velocity: Vec2) -> bool {
        if let Some(mut body) = self.world.get_mut::<RigidBody>(entity) {
            body.velocity = velocity;
            true
        } else {
            false
        }
    }

    pub fn translation(&self, entity: Entity) -> Option<Vec2> {
        self.world.get::<Transform>(entity).map(|t| t.translation)
    }

    pub fn set_translation(&mut self, entity: Entity, translation: Vec2) -> bool {
        if let Some(mut transform) = self.world.get_mut::<Transform>(entity) {
            transform.translation = translation;
            true
        } else {
            false
        }
    }

    pub fn rotation(&self, entity: Entity) -> Option<f32> {
        self.world.get::<Transform>(entity).map(|t| t.rotation)
    }

    pub fn set_rotation(&mut self, entity: Entity, rotation: f32) -> bool {
        if let Some(mut transform) = self.world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
            true
        } else {
            false
        }
    }

    pub fn entity_info(&self, entity: Entity) -> Option<EntityInfo> {
        let transform = self.world.get::<Transform>(entity)?;
        let tag = self.world.get::<SceneEntityTag>(entity)?;
        let name = self.world.get::<Name>(entity).map(|n| n.0.clone()).unwrap_or_default();
        Some(EntityInfo {
            scene_id: tag.id.clone(),
            name,
            translation: transform.translation,
            rotation: transform.rotation,
            scale: transform.scale,
            velocity: self.world.get::<RigidBody>(entity).map(|rb| rb.velocity),
            collider: self.world.get::<Collider>(entity).map(|c| ColliderInfo {
                shape: c.shape,
                offset: c.offset,
                is_trigger: c.is_trigger,
            }),
            behaviour: self.world.get::<ScriptRef>(entity).map(|s| s.behaviour.clone()),
        })
    }

    /// Read-only iteration for presentation, refreshed once per logical
    /// step. Reserved-but-unfilled entities are invisible here.
    pub fn snapshot(&mut self) -> Vec<EntityInfo> {
        let mut query = self.world.query::<(Entity, &SceneEntityTag)>();
        let entities: Vec<Entity> = query.iter(&self.world).map(|(entity, _)| entity).collect();
        entities.into_iter().filter_map(|entity| self.entity_info(entity)).collect()
    }

    /// Entities carrying an unbound behaviour reference, in spawn order.
    pub fn scripted_entities(&mut self) -> Vec<(Entity, ScriptRef)> {
        let mut query = self.world.query::<(Entity, &ScriptRef)>();
        query.iter(&self.world).map(|(entity, script)| (entity, script.clone())).collect()
    }

    pub fn collider_shape(&self, entity: Entity) -> Option<ColliderShape> {
        self.world.get::<Collider>(entity).map(|c| c.shape)
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

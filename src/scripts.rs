use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bevy_ecs::prelude::Entity;
use glam::Vec2;
use rand::Rng;
use rhai::{Engine, EvalAltResult, Scope, AST, FLOAT, INT};

use crate::ecs::world::SimWorld;
use crate::events::GameEvent;
use crate::lifecycle::{InstantiateRequest, LifecycleQueue};
use crate::scene::PropertyValue;

/// Engine-side surface handed to every behaviour callback. Transform and
/// velocity access is direct (scripts read their own writes within a
/// step); structural mutations always go through the lifecycle queue.
#[derive(Clone, Copy)]
pub struct ScriptApi {
    world: *mut SimWorld,
}

unsafe impl Send for ScriptApi {}
unsafe impl Sync for ScriptApi {}

impl ScriptApi {
    pub fn new(world: &mut SimWorld) -> Self {
        Self { world }
    }

    fn world(&mut self) -> &mut SimWorld {
        unsafe { &mut *self.world }
    }

    fn instantiate(&mut self, template: &str, x: FLOAT, y: FLOAT, rotation: FLOAT) -> INT {
        let world = self.world();
        let target = world.reserve_entity();
        world.world.resource_mut::<LifecycleQueue>().queue_instantiate(InstantiateRequest {
            target,
            template: template.to_string(),
            position: Vec2::new(x as f32, y as f32),
            rotation: rotation as f32,
        });
        target.to_bits() as INT
    }

    fn destroy(&mut self, entity_bits: INT) -> bool {
        match entity_from_bits(entity_bits) {
            Some(entity) => {
                self.world().world.resource_mut::<LifecycleQueue>().queue_destroy(entity);
                true
            }
            None => false,
        }
    }

    fn load_scene(&mut self, path: &str) {
        self.world().world.resource_mut::<LifecycleQueue>().request_scene(path);
    }

    fn find_entity(&mut self, name: &str) -> INT {
        match self.world().find_entity(name) {
            Some(entity) => entity.to_bits() as INT,
            None => -1,
        }
    }

    fn position_x(&mut self, entity_bits: INT) -> FLOAT {
        self.translation(entity_bits).x as FLOAT
    }

    fn position_y(&mut self, entity_bits: INT) -> FLOAT {
        self.translation(entity_bits).y as FLOAT
    }

    fn translation(&mut self, entity_bits: INT) -> Vec2 {
        entity_from_bits(entity_bits)
            .and_then(|entity| self.world().translation(entity))
            .unwrap_or(Vec2::ZERO)
    }

    fn set_position(&mut self, entity_bits: INT, x: FLOAT, y: FLOAT) -> bool {
        match entity_from_bits(entity_bits) {
            Some(entity) => self.world().set_translation(entity, Vec2::new(x as f32, y as f32)),
            None => false,
        }
    }

    fn rotation(&mut self, entity_bits: INT) -> FLOAT {
        entity_from_bits(entity_bits)
            .and_then(|entity| self.world().rotation(entity))
            .unwrap_or(0.0) as FLOAT
    }

    fn set_rotation(&mut self, entity_bits: INT, degrees: FLOAT) -> bool {
        match entity_from_bits(entity_bits) {
            Some(entity) => self.world().set_rotation(entity, degrees as f32),
            None => false,
        }
    }

    fn velocity_x(&mut self, entity_bits: INT) -> FLOAT {
        self.velocity(entity_bits).x as FLOAT
    }

    fn velocity_y(&mut self, entity_bits: INT) -> FLOAT {
        self.velocity(entity_bits).y as FLOAT
    }

    fn velocity(&mut self, entity_bits: INT) -> Vec2 {
        entity_from_bits(entity_bits)
            .and_then(|entity| self.world().velocity(entity))
            .unwrap_or(Vec2::ZERO)
    }

    fn set_velocity(&mut self, entity_bits: INT, x: FLOAT, y: FLOAT) -> bool {
        match entity_from_bits(entity_bits) {
            Some(entity) => self.world().set_velocity(entity, Vec2::new(x as f32, y as f32)),
            None => false,
        }
    }

    fn name_of(&mut self, entity_bits: INT) -> String {
        entity_from_bits(entity_bits)
            .and_then(|entity| self.world().entity_name(entity))
            .unwrap_or_default()
    }

    fn random_range(&mut self, min: FLOAT, max: FLOAT) -> FLOAT {
        if max <= min {
            return min;
        }
        let mut rng = rand::thread_rng();
        rng.gen_range(min..max)
    }

    fn log(&mut self, message: &str) {
        println!("[script] {message}");
    }
}

// A handle from a script is untrusted input; a garbage integer must come
// back as "no entity", never unwind through the sandbox.
fn entity_from_bits(bits: INT) -> Option<Entity> {
    if bits < 0 {
        None
    } else {
        Entity::try_from_bits(bits as u64).ok()
    }
}

fn register_api(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptApi>("World");
    engine.register_fn("instantiate", ScriptApi::instantiate);
    engine.register_fn("destroy", ScriptApi::destroy);
    engine.register_fn("load_scene", ScriptApi::load_scene);
    engine.register_fn("find_entity", ScriptApi::find_entity);
    engine.register_fn("position_x", ScriptApi::position_x);
    engine.register_fn("position_y", ScriptApi::position_y);
    engine.register_fn("set_position", ScriptApi::set_position);
    engine.register_fn("rotation", ScriptApi::rotation);
    engine.register_fn("set_rotation", ScriptApi::set_rotation);
    engine.register_fn("velocity_x", ScriptApi::velocity_x);
    engine.register_fn("velocity_y", ScriptApi::velocity_y);
    engine.register_fn("set_velocity", ScriptApi::set_velocity);
    engine.register_fn("name_of", ScriptApi::name_of);
    engine.register_fn("rand", ScriptApi::random_range);
    engine.register_fn("log", ScriptApi::log);
}

/// One live behaviour bound 1:1 to an entity. The scope carries the
/// script's module-level `let`s as instance fields.
struct BehaviourInstance {
    entity: Entity,
    behaviour: String,
    scope: Scope<'static>,
    properties: HashMap<String, PropertyValue>,
    started: bool,
    alive: bool,
    has_start: bool,
    has_update: bool,
    has_on_collision: bool,
    has_on_destroy: bool,
}

fn has_function(ast: &AST, name: &str) -> bool {
    ast.iter_functions().any(|f| f.name == name)
}

fn apply_properties(scope: &mut Scope<'static>, properties: &HashMap<String, PropertyValue>) {
    for (name, value) in properties {
        match value {
            PropertyValue::Bool(v) => {
                scope.set_value(name.clone(), *v);
            }
            PropertyValue::Int(v) => {
                scope.set_value(name.clone(), *v);
            }
            PropertyValue::Float(v) => {
                scope.set_value(name.clone(), *v);
            }
            PropertyValue::Str(v) => {
                scope.set_value(name.clone(), v.clone());
            }
        }
    }
}

/// Resolves behaviours by registry name, owns every live instance, and
/// sandboxes all callbacks: a fault disables that one instance and the
/// rest of the simulation keeps running.
pub struct BehaviourHost {
    engine: Engine,
    behaviours: HashMap<String, AST>,
    instances: Vec<BehaviourInstance>,
}

impl BehaviourHost {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_fast_operators(true);
        register_api(&mut engine);
        Self { engine, behaviours: HashMap::new(), instances: Vec::new() }
    }

    /// Register a behaviour under an explicit name. Compile errors are
    /// surfaced to the caller; registration happens at startup where a
    /// bad unit should be loud.
    pub fn register_source(&mut self, name: impl Into<String>, source: &str) -> Result<()> {
        let name = name.into();
        let ast = self
            .engine
            .compile(source)
            .with_context(|| format!("Compiling behaviour '{name}'"))?;
        self.behaviours.insert(name, ast);
        Ok(())
    }

    /// Scan a directory for `*.rhai` units; file stem becomes the registry
    /// name. A unit that fails to compile is logged and skipped.
    pub fn load_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Reading behaviour directory {}", dir.display()))?;
        let mut loaded = 0usize;
        for entry in entries {
            let path = entry.context("Reading behaviour directory entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("rhai") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                continue;
            };
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Reading behaviour file {}", path.display()))?;
            match self.register_source(name, &source) {
                Ok(()) => loaded += 1,
                Err(err) => eprintln!("[script] {err:#}"),
            }
        }
        Ok(loaded)
    }

    pub fn has_behaviour(&self, name: &str) -> bool {
        self.behaviours.contains_key(name)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.iter().filter(|i| i.alive).count()
    }

    pub fn is_active(&self, entity: Entity) -> bool {
        self.instances.iter().any(|i| i.entity == entity && i.alive)
    }

    /// Bind a behaviour instance to an entity. Module-level statements run
    /// once to seed the scope; authored property overrides are applied on
    /// top so they win over code defaults. Returns false (and logs) when
    /// the behaviour is unknown or its module init faults.
    pub fn bind(
        &mut self,
        world: &mut SimWorld,
        entity: Entity,
        behaviour: &str,
        properties: &HashMap<String, PropertyValue>,
    ) -> bool {
        let Some(ast) = self.behaviours.get(behaviour) else {
            eprintln!(
                "[script] Unknown behaviour '{behaviour}' on entity '{}'; skipping",
                world.entity_name(entity).unwrap_or_default()
            );
            return false;
        };
        let mut scope = Scope::new();
        if let Err(err) = self.engine.run_ast_with_scope(&mut scope, ast) {
            eprintln!(
                "[script] Behaviour '{behaviour}' on entity '{}' faulted during init: {err}",
                world.entity_name(entity).unwrap_or_default()
            );
            return false;
        }
        apply_properties(&mut scope, properties);
        self.instances.push(BehaviourInstance {
            entity,
            behaviour: behaviour.to_string(),
            scope,
            properties: properties.clone(),
            started: false,
            alive: true,
            has_start: has_function(ast, "start"),
            has_update: has_function(ast, "update"),
            has_on_collision: has_function(ast, "on_collision_enter"),
            has_on_destroy: has_function(ast, "on_destroy"),
        });
        true
    }

    /// Run `start` on every instance that has not started yet, re-applying
    /// property overrides afterwards so authored values beat anything the
    /// script assigned inside `start`.
    pub fn start_pending(&mut self, world: &mut SimWorld) {
        for idx in 0..self.instances.len() {
            let inst = &mut self.instances[idx];
            if !inst.alive || inst.started {
                continue;
            }
            inst.started = true;
            if inst.has_start {
                let Some(ast) = self.behaviours.get(&inst.behaviour) else { continue };
                let api = ScriptApi::new(world);
                let args = (api, inst.entity.to_bits() as INT);
                if let Err(err) = self.engine.call_fn::<()>(&mut inst.scope, ast, "start", args) {
                    fault(world, inst, "start", &err);
                    continue;
                }
            }
            let inst = &mut self.instances[idx];
            let overrides = inst.properties.clone();
            apply_properties(&mut inst.scope, &overrides);
        }
        self.sweep();
    }

    /// Invoke `update(dt)` on every live instance, in bind order.
    pub fn update_all(&mut self, world: &mut SimWorld, dt: f32) {
        for inst in &mut self.instances {
            if !inst.alive || !inst.has_update {
                continue;
            }
            let Some(ast) = self.behaviours.get(&inst.behaviour) else { continue };
            let api = ScriptApi::new(world);
            let args = (api, inst.entity.to_bits() as INT, dt as FLOAT);
            if let Err(err) = self.engine.call_fn::<()>(&mut inst.scope, ast, "update", args) {
                fault(world, inst, "update", &err);
            }
        }
        self.sweep();
    }

    /// Deliver each contact to both sides, (A,B) then (B,A).
    pub fn dispatch_collisions(&mut self, world: &mut SimWorld, events: &[GameEvent]) {
        for event in events {
            if let GameEvent::CollisionStarted { a, b, .. } = event {
                self.deliver_collision(world, *a, *b);
                self.deliver_collision(world, *b, *a);
            }
        }
        self.sweep();
    }

    fn deliver_collision(&mut self, world: &mut SimWorld, target: Entity, other: Entity) {
        for inst in &mut self.instances {
            if inst.entity != target || !inst.alive || !inst.has_on_collision {
                continue;
            }
            let Some(ast) = self.behaviours.get(&inst.behaviour) else { continue };
            let api = ScriptApi::new(world);
            let args = (api, inst.entity.to_bits() as INT, other.to_bits() as INT);
            if let Err(err) =
                self.engine.call_fn::<()>(&mut inst.scope, ast, "on_collision_enter", args)
            {
                fault(world, inst, "on_collision_enter", &err);
            }
        }
    }

    /// The owning entity is going away: give the behaviour its last
    /// callback, then drop the instance. Faults here only get logged.
    pub fn notify_destroy(&mut self, world: &mut SimWorld, entity: Entity) {
        for inst in &mut self.instances {
            if inst.entity != entity {
                continue;
            }
            if inst.alive && inst.has_on_destroy {
                if let Some(ast) = self.behaviours.get(&inst.behaviour) {
                    let api = ScriptApi::new(world);
                    let args = (api, inst.entity.to_bits() as INT);
                    if let Err(err) =
                        self.engine.call_fn::<()>(&mut inst.scope, ast, "on_destroy", args)
                    {
                        fault(world, inst, "on_destroy", &err);
                    }
                }
            }
            inst.alive = false;
        }
        self.sweep();
    }

    /// Scene teardown: `on_destroy` for every live instance, then clear.
    pub fn teardown(&mut self, world: &mut SimWorld) {
        let entities: Vec<Entity> =
            self.instances.iter().filter(|i| i.alive).map(|i| i.entity).collect();
        for entity in entities {
            self.notify_destroy(world, entity);
        }
        self.instances.clear();
    }

    fn sweep(&mut self) {
        self.instances.retain(|inst| inst.alive);
    }
}

impl Default for BehaviourHost {
    fn default() -> Self {
        Self::new()
    }
}

/// The sandbox boundary: log the fault with the behaviour's identity and
/// owning entity, emit an event for observers, and permanently retire the
/// one offending instance.
fn fault(world: &mut SimWorld, inst: &mut BehaviourInstance, callback: &str, err: &EvalAltResult) {
    let entity_name = world.entity_name(inst.entity).unwrap_or_default();
    eprintln!(
        "[script] Behaviour '{}' on entity '{}' faulted in {callback}: {err}",
        inst.behaviour, entity_name
    );
    world.push_event(GameEvent::ScriptFault {
        behaviour: inst.behaviour.clone(),
        entity: inst.entity,
        message: err.to_string(),
    });
    inst.alive = false;
}

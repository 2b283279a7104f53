use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::Vec2;

use crate::config::RuntimeConfig;
use crate::ecs::types::EntityInfo;
use crate::ecs::world::SimWorld;
use crate::lifecycle::PrefabLibrary;
use crate::scene::{Scene, SceneEntityId};
use crate::scripts::BehaviourHost;
use crate::time::StepClock;

/// The orchestration loop. Owns the wall clock, the simulation world, the
/// behaviour host and the prefab library; everything downstream only ever
/// sees the fixed step. One logical step runs: integrate → rebuild index →
/// collide/resolve → dispatch collision callbacks → script update → drain
/// lifecycle queue.
pub struct Runtime {
    config: RuntimeConfig,
    clock: StepClock,
    world: SimWorld,
    host: BehaviourHost,
    prefabs: PrefabLibrary,
    scene_path: Option<PathBuf>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let mut host = BehaviourHost::new();
        if let Some(dir) = &config.scripts_dir {
            let count = host.load_directory(dir)?;
            println!("[runtime] Registered {count} behaviours from {dir}");
        }
        let mut prefabs = PrefabLibrary::new();
        if let Some(dir) = &config.prefabs_dir {
            let count = prefabs.load_directory(dir)?;
            println!("[runtime] Registered {count} prefabs from {dir}");
        }
        let mut world = SimWorld::new();
        world.set_gravity(Vec2::new(config.gravity[0], config.gravity[1]));
        world.set_spatial_cell(config.spatial_cell);
        world.set_correction_factor(config.correction_factor);
        let clock = StepClock::new(config.fixed_dt(), config.max_frame_time);
        Ok(Self { config, clock, world, host, prefabs, scene_path: None })
    }

    pub fn world(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    pub fn host(&self) -> &BehaviourHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut BehaviourHost {
        &mut self.host
    }

    pub fn prefabs_mut(&mut self) -> &mut PrefabLibrary {
        &mut self.prefabs
    }

    pub fn fixed_dt(&self) -> f32 {
        self.clock.fixed_dt()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn scene_path(&self) -> Option<&Path> {
        self.scene_path.as_deref()
    }

    /// Load and install the initial scene. Failure here is fatal: the
    /// runner refuses to start on a scene it cannot load.
    pub fn load_scene_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let scene = Scene::load_from_path(path)?;
        self.install_scene(&scene)
            .with_context(|| format!("Installing scene {}", path.display()))?;
        self.scene_path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn install_scene(&mut self, scene: &Scene) -> Result<()> {
        self.host.teardown(&mut self.world);
        self.world.load_scene(scene)?;
        self.bind_scene_scripts();
        self.host.start_pending(&mut self.world);
        Ok(())
    }

    fn bind_scene_scripts(&mut self) {
        for (entity, script) in self.world.scripted_entities() {
            self.host.bind(&mut self.world, entity, &script.behaviour, &script.properties);
        }
    }

    /// One real frame: sample the clock, then drain whole fixed steps.
    pub fn tick(&mut self) {
        let sample = self.clock.tick();
        if let Some(dropped) = sample.dropped_backlog {
            eprintln!("[runtime] Frame stall: dropped {dropped:.3}s of simulation backlog");
        }
        while let Some(dt) = self.clock.pop_fixed_step() {
            self.step_once(dt);
        }
    }

    /// Drive the core headlessly for a fixed number of logical steps.
    pub fn run_steps(&mut self, steps: usize) {
        let dt = self.clock.fixed_dt();
        for _ in 0..steps {
            self.step_once(dt);
        }
    }

    pub fn step_once(&mut self, dt: f32) {
        self.world.fixed_step(dt);
        let events = self.world.drain_events();
        self.host.dispatch_collisions(&mut self.world, &events);
        self.host.update_all(&mut self.world, dt);
        self.drain_lifecycle();
    }

    pub fn snapshot(&mut self) -> Vec<EntityInfo> {
        self.world.snapshot()
    }

    /// Apply the step's deferred mutations in fixed order: instantiate,
    /// destroy, scene swap.
    fn drain_lifecycle(&mut self) {
        let ops = self.world.take_lifecycle();

        for request in ops.instantiate {
            let Some(template) = self.prefabs.get(&request.template) else {
                eprintln!(
                    "[runtime] Unknown template '{}'; instantiate skipped",
                    request.template
                );
                self.world.despawn(request.target);
                continue;
            };
            let mut data = template.clone();
            data.id = SceneEntityId::new();
            data.transform.translation = request.position.into();
            data.transform.rotation = request.rotation;
            if let Err(err) = self.world.insert_components(request.target, &data) {
                eprintln!("[runtime] Instantiate of '{}' failed: {err:#}", request.template);
                self.world.despawn(request.target);
                continue;
            }
            if let Some(script) = &data.script {
                self.host.bind(&mut self.world, request.target, &script.behaviour, &script.properties);
            }
        }
        // New instances start inside the same drain, so a spawned script
        // can itself enqueue work for the next step.
        self.host.start_pending(&mut self.world);

        for entity in ops.destroy {
            if !self.world.entity_exists(entity) {
                continue;
            }
            self.host.notify_destroy(&mut self.world, entity);
            self.world.despawn(entity);
        }

        if let Some(path) = ops.scene_swap {
            self.swap_scene(&path);
        }
    }

    /// A swap parses the new scene before tearing anything down, so a bad
    /// reference leaves the running scene untouched.
    fn swap_scene(&mut self, path: &str) {
        let scene = match Scene::load_from_path(path) {
            Ok(scene) => scene,
            Err(err) => {
                eprintln!("[scene] Swap to '{path}' failed: {err:#}");
                return;
            }
        };
        if let Err(err) = self.install_scene(&scene) {
            eprintln!("[scene] Swap to '{path}' failed during install: {err:#}");
            return;
        }
        self.scene_path = Some(PathBuf::from(path));
    }
}

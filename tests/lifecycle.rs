use std::collections::HashMap;

use shrike_engine::config::RuntimeConfig;
use shrike_engine::runner::Runtime;
use shrike_engine::scene::{
    PropertyValue, Scene, SceneEntity, SceneEntityId, ScriptData, TransformData,
};
use tempfile::tempdir;

fn weightless_runtime() -> Runtime {
    let config = RuntimeConfig { gravity: [0.0, 0.0], ..Default::default() };
    Runtime::new(config).expect("runtime construction")
}

fn plain_entity(name: &str) -> SceneEntity {
    SceneEntity {
        id: SceneEntityId::new(),
        name: name.to_string(),
        active: true,
        transform: TransformData::default(),
        rigid_body: None,
        box_collider: None,
        circle_collider: None,
        script: None,
    }
}

fn scripted_entity(name: &str, behaviour: &str) -> SceneEntity {
    let mut entity = plain_entity(name);
    entity.script =
        Some(ScriptData { behaviour: behaviour.to_string(), properties: HashMap::new() });
    entity
}

fn scene_of(entities: Vec<SceneEntity>) -> Scene {
    Scene { entities, ..Default::default() }
}

/// A destroy enqueued during a script's update is invisible for the rest
/// of that step; the entity vanishes starting exactly the next step.
#[test]
fn destroy_is_deferred_to_the_step_boundary() {
    let mut runtime = weightless_runtime();
    runtime
        .host_mut()
        .register_source(
            "destroyer",
            r#"
                let fired = false;
                fn update(world, me, dt) {
                    if !fired {
                        fired = true;
                        let t = world.find_entity("target");
                        if t >= 0 { world.destroy(t); }
                    }
                }
            "#,
        )
        .expect("compile destroyer");
    runtime
        .host_mut()
        .register_source(
            "watcher",
            r#"
                fn update(world, me, dt) {
                    let t = world.find_entity("target");
                    if t >= 0 {
                        world.set_position(me, 1.0, 0.0);
                    } else {
                        world.set_position(me, 2.0, 0.0);
                    }
                }
            "#,
        )
        .expect("compile watcher");

    let scene = scene_of(vec![
        scripted_entity("grim", "destroyer"),
        scripted_entity("observer", "watcher"),
        plain_entity("target"),
    ]);
    runtime.install_scene(&scene).expect("install");

    let dt = runtime.fixed_dt();
    runtime.step_once(dt);
    let observer = runtime.world().find_entity("observer").expect("observer");
    assert_eq!(
        runtime.world().translation(observer).map(|p| p.x),
        Some(1.0),
        "the watcher, running after the destroy was enqueued, still saw the target"
    );
    assert!(runtime.world().find_entity("target").is_none(), "gone once the step completed");

    runtime.step_once(dt);
    assert_eq!(runtime.world().translation(observer).map(|p| p.x), Some(2.0));
}

#[test]
fn instantiate_resolves_template_and_starts_the_new_script() {
    let mut runtime = weightless_runtime();
    runtime
        .host_mut()
        .register_source(
            "spawner",
            r#"
                let done = false;
                fn update(world, me, dt) {
                    if !done {
                        done = true;
                        world.instantiate("crate_prefab", 12.0, 34.0, 45.0);
                    }
                }
            "#,
        )
        .expect("compile spawner");
    runtime
        .host_mut()
        .register_source("greeter", r#"fn start(world, me) { world.set_velocity(me, 7.0, 0.0); }"#)
        .expect("compile greeter");

    let mut template = scripted_entity("spawned", "greeter");
    template.rigid_body = Some(Default::default());
    runtime.prefabs_mut().register("crate_prefab", template);

    let scene = scene_of(vec![scripted_entity("source", "spawner")]);
    runtime.install_scene(&scene).expect("install");
    assert!(runtime.world().find_entity("spawned").is_none(), "nothing spawns synchronously");

    let dt = runtime.fixed_dt();
    runtime.step_once(dt);
    let spawned = runtime.world().find_entity("spawned").expect("deferred spawn landed");
    let position = runtime.world().translation(spawned).expect("transform");
    assert_eq!((position.x, position.y), (12.0, 34.0));
    assert_eq!(runtime.world().rotation(spawned), Some(45.0));
    assert_eq!(
        runtime.world().velocity(spawned).map(|v| v.x),
        Some(7.0),
        "start() ran on the new instance during the same drain"
    );
}

#[test]
fn unknown_template_is_logged_and_skipped() {
    let mut runtime = weightless_runtime();
    runtime
        .host_mut()
        .register_source(
            "optimist",
            r#"
                fn update(world, me, dt) {
                    world.instantiate("missing_prefab", 0.0, 0.0, 0.0);
                }
            "#,
        )
        .expect("compile optimist");
    let scene = scene_of(vec![scripted_entity("hopeful", "optimist")]);
    runtime.install_scene(&scene).expect("install");

    let dt = runtime.fixed_dt();
    runtime.step_once(dt);
    runtime.step_once(dt);
    assert_eq!(runtime.snapshot().len(), 1, "only the original entity remains");
    let hopeful = runtime.world().find_entity("hopeful").expect("entity");
    assert!(runtime.host().is_active(hopeful), "the failed instantiate is non-fatal");
}

#[test]
fn on_destroy_runs_before_the_entity_disappears() {
    let mut runtime = weightless_runtime();
    runtime
        .host_mut()
        .register_source(
            "suicidal",
            r#"
                fn update(world, me, dt) { world.destroy(me); }
                fn on_destroy(world, me) {
                    let w = world.find_entity("witness");
                    if w >= 0 { world.set_rotation(w, 42.0); }
                }
            "#,
        )
        .expect("compile");
    let scene = scene_of(vec![scripted_entity("doomed", "suicidal"), plain_entity("witness")]);
    runtime.install_scene(&scene).expect("install");

    runtime.step_once(runtime.fixed_dt());
    assert!(runtime.world().find_entity("doomed").is_none());
    let witness = runtime.world().find_entity("witness").expect("witness");
    assert_eq!(runtime.world().rotation(witness), Some(42.0));
    assert_eq!(runtime.host().instance_count(), 0);
}

#[test]
fn scene_swap_tears_down_and_reloads_wholesale() {
    let dir = tempdir().expect("tempdir");
    let next_scene_path = dir.path().join("next.json");
    scene_of(vec![plain_entity("after_swap")])
        .save_to_path(&next_scene_path)
        .expect("write next scene");

    let mut runtime = weightless_runtime();
    runtime
        .host_mut()
        .register_source(
            "switcher",
            r#"
                let target = "";
                fn update(world, me, dt) { world.load_scene(target); }
            "#,
        )
        .expect("compile switcher");

    let mut switcher = scripted_entity("portal", "switcher");
    switcher.script.as_mut().expect("script").properties.insert(
        "target".to_string(),
        PropertyValue::Str(next_scene_path.to_string_lossy().into_owned()),
    );
    let scene = scene_of(vec![switcher, plain_entity("relic")]);
    runtime.install_scene(&scene).expect("install");

    runtime.step_once(runtime.fixed_dt());
    assert!(runtime.world().find_entity("after_swap").is_some(), "new scene is live");
    assert!(runtime.world().find_entity("portal").is_none(), "old entities are gone");
    assert!(runtime.world().find_entity("relic").is_none());
    assert_eq!(runtime.host().instance_count(), 0, "old instances were torn down");
}

#[test]
fn swap_to_a_missing_scene_keeps_the_current_one() {
    let mut runtime = weightless_runtime();
    runtime
        .host_mut()
        .register_source(
            "broken_portal",
            r#"fn update(world, me, dt) { world.load_scene("/nowhere/nothing.json"); }"#,
        )
        .expect("compile");
    let scene = scene_of(vec![scripted_entity("portal", "broken_portal")]);
    runtime.install_scene(&scene).expect("install");

    runtime.step_once(runtime.fixed_dt());
    assert!(
        runtime.world().find_entity("portal").is_some(),
        "a bad swap reference leaves the running scene untouched"
    );
}

#[test]
fn initial_scene_load_failure_is_fatal() {
    let mut runtime = weightless_runtime();
    assert!(runtime.load_scene_file("/nowhere/at/all.json").is_err());
}

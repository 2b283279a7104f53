use bevy_ecs::prelude::Entity;
use glam::Vec2;
use shrike_engine::ecs::{Collider, ColliderShape, Layers, RigidBody, SimWorld, Transform};
use shrike_engine::events::GameEvent;

const TEST_DT: f32 = 1.0 / 60.0;

fn world_without_gravity() -> SimWorld {
    let mut world = SimWorld::new();
    world.set_gravity(Vec2::ZERO);
    world
}

fn collider(half: f32) -> Collider {
    Collider {
        shape: ColliderShape::Box { half: Vec2::splat(half) },
        offset: Vec2::ZERO,
        is_trigger: false,
        category: Layers::DEFAULT,
        mask: Layers::ALL,
    }
}

fn dynamic_body(mass: f32) -> RigidBody {
    RigidBody { mass, use_gravity: false, ..Default::default() }
}

fn spawn(world: &mut SimWorld, position: Vec2, shape: Collider, body: Option<RigidBody>) -> Entity {
    let transform = Transform { translation: position, rotation: 0.0, scale: Vec2::ONE };
    match body {
        Some(body) => world.world.spawn((transform, shape, body)).id(),
        None => world.world.spawn((transform, shape)).id(),
    }
}

fn translation(world: &SimWorld, entity: Entity) -> Vec2 {
    world.translation(entity).expect("entity has a transform")
}

fn collision_events(events: &[GameEvent]) -> Vec<(Entity, Entity, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            GameEvent::CollisionStarted { a, b, trigger } => Some((*a, *b, *trigger)),
            _ => None,
        })
        .collect()
}

#[test]
fn zero_overlap_emits_nothing_and_mutates_nothing() {
    let mut world = world_without_gravity();
    let a = spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), Some(dynamic_body(1.0)));
    let b = spawn(&mut world, Vec2::new(51.0, 0.0), collider(25.0), Some(dynamic_body(1.0)));
    world.fixed_step(TEST_DT);
    assert!(collision_events(&world.drain_events()).is_empty());
    assert_eq!(translation(&world, a), Vec2::new(0.0, 0.0));
    assert_eq!(translation(&world, b), Vec2::new(51.0, 0.0));
    assert_eq!(world.velocity(a), Some(Vec2::ZERO));
    assert_eq!(world.velocity(b), Some(Vec2::ZERO));
}

#[test]
fn touching_edges_do_not_collide() {
    let mut world = world_without_gravity();
    spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), Some(dynamic_body(1.0)));
    spawn(&mut world, Vec2::new(50.0, 0.0), collider(25.0), Some(dynamic_body(1.0)));
    world.fixed_step(TEST_DT);
    assert!(collision_events(&world.drain_events()).is_empty());
}

#[test]
fn single_dynamic_side_absorbs_full_correction() {
    let mut world = world_without_gravity();
    world.set_correction_factor(1.0);
    // 10 units of vertical overlap; horizontal overlap is larger, so the
    // MTV axis is vertical and the dynamic box pops straight up.
    let falling = spawn(&mut world, Vec2::new(0.0, -40.0), collider(25.0), Some(dynamic_body(5.0)));
    let floor = spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), None);
    world.fixed_step(TEST_DT);

    assert_eq!(translation(&world, floor), Vec2::new(0.0, 0.0), "obstacle never moves");
    let resolved = translation(&world, falling);
    assert!((resolved.y - -50.0).abs() < 1e-3, "expected full 10-unit pop, got y={}", resolved.y);
    assert_eq!(resolved.x, 0.0);

    let events = collision_events(&world.drain_events());
    assert_eq!(events.len(), 1);
    assert!(!events[0].2, "contact was resolved, not a trigger");
}

#[test]
fn mass_weighted_split_moves_lighter_body_more() {
    let mut world = world_without_gravity();
    world.set_correction_factor(1.0);
    let m1 = 1.0;
    let m2 = 3.0;
    // 10 units of horizontal overlap between centers 40 apart.
    let light = spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), Some(dynamic_body(m1)));
    let heavy = spawn(&mut world, Vec2::new(40.0, 0.0), collider(25.0), Some(dynamic_body(m2)));
    world.fixed_step(TEST_DT);

    let light_moved = (translation(&world, light).x - 0.0).abs();
    let heavy_moved = (translation(&world, heavy).x - 40.0).abs();
    let depth = 10.0;
    let expected_light = depth * m2 / (m1 + m2);
    let expected_heavy = depth * m1 / (m1 + m2);
    assert!((light_moved - expected_light).abs() < 1e-3, "light body moved {light_moved}");
    assert!((heavy_moved - expected_heavy).abs() < 1e-3, "heavy body moved {heavy_moved}");
}

#[test]
fn equal_masses_split_the_depth_evenly() {
    let mut world = world_without_gravity();
    world.set_correction_factor(1.0);
    let a = spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), Some(dynamic_body(2.0)));
    let b = spawn(&mut world, Vec2::new(44.0, 0.0), collider(25.0), Some(dynamic_body(2.0)));
    world.fixed_step(TEST_DT);
    assert!((translation(&world, a).x - -3.0).abs() < 1e-3);
    assert!((translation(&world, b).x - 47.0).abs() < 1e-3);
}

#[test]
fn resolution_zeroes_velocity_along_the_contact_normal() {
    let mut world = world_without_gravity();
    let falling = world
        .world
        .spawn((
            Transform { translation: Vec2::new(0.0, -45.0), rotation: 0.0, scale: Vec2::ONE },
            collider(25.0),
            RigidBody { mass: 1.0, use_gravity: false, velocity: Vec2::new(12.0, 80.0), ..Default::default() },
        ))
        .id();
    spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), None);
    world.fixed_step(TEST_DT);
    let velocity = world.velocity(falling).expect("body kept its rigid body");
    assert_eq!(velocity.y, 0.0, "normal component stops dead");
    assert_eq!(velocity.x, 12.0, "tangential component is untouched");
}

#[test]
fn trigger_overlap_reports_without_resolving() {
    let mut world = world_without_gravity();
    let mut sensor = collider(25.0);
    sensor.is_trigger = true;
    let roamer = spawn(&mut world, Vec2::new(10.0, 0.0), collider(25.0), Some(dynamic_body(1.0)));
    spawn(&mut world, Vec2::new(0.0, 0.0), sensor, None);
    world.fixed_step(TEST_DT);

    let events = collision_events(&world.drain_events());
    assert_eq!(events.len(), 1);
    assert!(events[0].2, "trigger contact is flagged as such");
    assert_eq!(translation(&world, roamer), Vec2::new(10.0, 0.0), "no positional correction");
}

#[test]
fn both_static_overlap_is_ignored() {
    let mut world = world_without_gravity();
    let a = spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), None);
    let b = spawn(&mut world, Vec2::new(10.0, 0.0), collider(25.0), None);
    world.fixed_step(TEST_DT);
    assert!(collision_events(&world.drain_events()).is_empty());
    assert_eq!(translation(&world, a), Vec2::new(0.0, 0.0));
    assert_eq!(translation(&world, b), Vec2::new(10.0, 0.0));
}

#[test]
fn category_mask_gate_filters_pairs() {
    let mut world = world_without_gravity();
    let mut ghost = collider(25.0);
    ghost.category = Layers::from_bits_retain(0b10);
    ghost.mask = Layers::from_bits_retain(0b10);
    spawn(&mut world, Vec2::new(0.0, 0.0), collider(25.0), Some(dynamic_body(1.0)));
    spawn(&mut world, Vec2::new(10.0, 0.0), ghost, Some(dynamic_body(1.0)));
    world.fixed_step(TEST_DT);
    assert!(
        collision_events(&world.drain_events()).is_empty(),
        "mismatched category/mask pair must never reach the narrowphase result"
    );
}

#[test]
fn circle_colliders_use_their_bounding_boxes() {
    let mut world = world_without_gravity();
    world.set_correction_factor(1.0);
    let circle = Collider {
        shape: ColliderShape::Circle { radius: 25.0 },
        offset: Vec2::ZERO,
        is_trigger: false,
        category: Layers::DEFAULT,
        mask: Layers::ALL,
    };
    // Corner-to-corner: true circles would miss, their AABBs overlap.
    let a = spawn(&mut world, Vec2::new(0.0, 0.0), circle, Some(dynamic_body(1.0)));
    spawn(&mut world, Vec2::new(48.0, 48.0), circle, None);
    world.fixed_step(TEST_DT);
    let events = collision_events(&world.drain_events());
    assert_eq!(events.len(), 1, "AABB approximation registers the corner contact");
    assert_ne!(translation(&world, a), Vec2::new(0.0, 0.0));
}

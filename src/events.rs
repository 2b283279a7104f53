use bevy_ecs::prelude::{Entity, Resource};
use std::fmt;

#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Contact between two colliders this step. Emitted once per pair with
    /// the lower entity index first; the script host dispatches both sides.
    CollisionStarted { a: Entity, b: Entity, trigger: bool },
    EntityDespawned { entity: Entity },
    ScriptFault { behaviour: String, entity: Entity, message: String },
}

impl GameEvent {
    fn ordered_pair(a: Entity, b: Entity) -> (Entity, Entity) {
        if a.index() <= b.index() {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn collision_started(a: Entity, b: Entity, trigger: bool) -> Self {
        let (a, b) = Self::ordered_pair(a, b);
        GameEvent::CollisionStarted { a, b, trigger }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::CollisionStarted { a, b, trigger } => {
                write!(f, "CollisionStarted a={} b={} trigger={}", a.index(), b.index(), trigger)
            }
            GameEvent::EntityDespawned { entity } => {
                write!(f, "EntityDespawned entity={}", entity.index())
            }
            GameEvent::ScriptFault { behaviour, entity, message } => {
                write!(f, "ScriptFault behaviour={} entity={} message={}", behaviour, entity.index(), message)
            }
        }
    }
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<GameEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

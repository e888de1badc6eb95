//! Point-in-time copy of the enemy side of the game.

use std::collections::HashMap;

use crate::engine::GameEngine;
use crate::entities::{Body, Entity, EntityId, Renderable};

/// Enemies and enemy projectiles, plus score and elapsed time, as they were
/// when the snapshot was taken. The entities are owned copies; nothing in
/// here aliases the live game.
#[derive(Clone, Debug, PartialEq)]
pub struct GameMemento {
    entities: Vec<(EntityId, Entity)>,
    score: u32,
    time_elapsed: f32,
}

impl GameMemento {
    pub fn capture<'a>(
        renderables: impl IntoIterator<Item = (EntityId, &'a Entity)>,
        score: u32,
        time_elapsed: f32,
    ) -> Self {
        let entities = renderables
            .into_iter()
            .filter(|(_, e)| e.kind().is_enemy_side())
            .map(|(id, e)| (id, e.clone()))
            .collect();
        Self {
            entities,
            score,
            time_elapsed,
        }
    }

    /// Put fresh copies of the captured entities back into `engine` and
    /// overwrite its score and time. Copies get new ids; projectile owners
    /// are remapped to the restored enemies. Returns the new ids.
    ///
    /// This is an additive merge, so the engine's own enemies and enemy
    /// projectiles must already be cleared.
    pub fn restore_into(&self, engine: &mut GameEngine) -> Vec<EntityId> {
        let mut remap = HashMap::with_capacity(self.entities.len());
        let mut copies: Vec<(EntityId, Entity)> = self
            .entities
            .iter()
            .map(|(old, entity)| {
                let id = engine.allocate_id();
                remap.insert(*old, id);
                (id, entity.clone())
            })
            .collect();

        for (_, entity) in &mut copies {
            if let Body::EnemyProjectile { owner, .. } = &mut entity.body {
                *owner = owner.and_then(|old| remap.get(&old).copied());
            }
        }

        let ids = engine.add_all_renderables_and_game_objects(copies);
        engine.set_score(self.score);
        engine.set_time_elapsed(self.time_elapsed);
        ids
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_elapsed(&self) -> f32 {
        self.time_elapsed
    }
}

//! Structural changes requested while the engine is iterating its entities.
//!
//! Entities never touch the engine's collections during a tick. Spawns and
//! despawns are recorded in a [`MutationLog`] and applied together by
//! `GameEngine::reconcile` once iteration is over.

use std::collections::HashMap;

use rand::RngCore;

use crate::entities::{Entity, EntityId};

#[derive(Debug, Default)]
pub struct MutationLog {
    spawns: Vec<Entity>,
    despawns: Vec<EntityId>,
}

impl MutationLog {
    pub fn spawn(&mut self, entity: Entity) {
        self.spawns.push(entity);
    }

    pub fn despawn(&mut self, id: EntityId) {
        if !self.despawns.contains(&id) {
            self.despawns.push(id);
        }
    }

    pub fn pending_spawns(&self) -> &[Entity] {
        &self.spawns
    }

    pub fn pending_despawns(&self) -> &[EntityId] {
        &self.despawns
    }

    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.despawns.is_empty()
    }

    /// Drop pending spawns matching `pred`.
    pub fn discard_spawns(&mut self, mut pred: impl FnMut(&Entity) -> bool) {
        self.spawns.retain(|e| !pred(e));
    }

    /// Hand over everything recorded so far, leaving the log empty.
    pub fn take(&mut self) -> (Vec<Entity>, Vec<EntityId>) {
        (
            std::mem::take(&mut self.spawns),
            std::mem::take(&mut self.despawns),
        )
    }
}

/// What an entity may see and do while it updates.
pub struct TickContext<'a> {
    pub game_width: f32,
    pub game_height: f32,
    pub rng: &'a mut dyn RngCore,
    /// Live (and already pending) projectiles per owning enemy.
    pub projectile_counts: &'a HashMap<EntityId, usize>,
    pub log: &'a mut MutationLog,
}

impl TickContext<'_> {
    pub fn spawn(&mut self, entity: Entity) {
        self.log.spawn(entity);
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.log.despawn(id);
    }

    pub fn live_projectiles_of(&self, owner: EntityId) -> usize {
        self.projectile_counts.get(&owner).copied().unwrap_or(0)
    }
}

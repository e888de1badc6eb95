//! The simulation core.
//!
//! [`GameEngine`] owns every entity in an id-keyed arena and keeps two
//! ordered views over it: the renderables (everything that is drawn and can
//! collide) and the game objects (everything that updates each tick). One
//! call to [`GameEngine::update`] advances the world by a tick; the caller
//! then runs [`GameEngine::reconcile`] to apply the spawns and despawns the
//! tick requested.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::RngCore;

use crate::config::DifficultyLevel;
use crate::entities::{Entity, EntityId, EntityKind, GameObject, Layer, Renderable};
use crate::events::{EventPublisher, ScoreEvent};
use crate::memento::GameMemento;
use crate::mutation::{MutationLog, TickContext};
use crate::observer::GameObserver;
use crate::vector::Vector2D;

/// Ticks that must pass between two player shots (a shot needs `timer > 45`).
pub const SHOT_COOLDOWN: u32 = 45;
/// Inset kept between foreground entities and the board edges.
pub const EDGE_MARGIN: f32 = 1.0;

// ── Score multipliers for the cheat keys ──────────────────────────────────────

pub const CHEAT_FAST_PROJECTILE_POINTS: u32 = 2;
pub const CHEAT_SLOW_PROJECTILE_POINTS: u32 = 1;
pub const CHEAT_FAST_ENEMY_POINTS: u32 = 4;
pub const CHEAT_SLOW_ENEMY_POINTS: u32 = 3;

/// Pairs that never collide: enemies and their projectiles pass through each
/// other.
pub fn collision_exempt(a: EntityKind, b: EntityKind) -> bool {
    use EntityKind::{Enemy, EnemyProjectile};
    matches!(
        (a, b),
        (Enemy, Enemy)
            | (EnemyProjectile, Enemy)
            | (Enemy, EnemyProjectile)
            | (EnemyProjectile, EnemyProjectile)
    )
}

/// Points for a colliding pair. Only a player shot meeting an enemy shot
/// scores; it is worth the enemy projectile's value.
fn interception_points(a: &Entity, b: &Entity) -> Option<u32> {
    let enemy_shot = match (a.kind(), b.kind()) {
        (EntityKind::PlayerProjectile, EntityKind::EnemyProjectile) => b,
        (EntityKind::EnemyProjectile, EntityKind::PlayerProjectile) => a,
        _ => return None,
    };
    enemy_shot.strategy().map(|s| s.points())
}

/// Structural changes applied by one [`GameEngine::reconcile`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
}

impl Reconciled {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct GameEngine {
    arena: HashMap<EntityId, Entity>,
    renderables: Vec<EntityId>,
    game_objects: Vec<EntityId>,
    pending: MutationLog,
    next_id: u64,
    player: EntityId,

    left: bool,
    right: bool,
    game_width: f32,
    game_height: f32,
    /// Ticks since the last player shot.
    timer: u32,
    time_elapsed: f32,
    score: u32,
    last_update: Instant,

    observers: Vec<Box<dyn GameObserver>>,
    score_events: EventPublisher<ScoreEvent>,
    memento: Option<GameMemento>,
}

impl GameEngine {
    /// Lay out a fresh game. `score_events` is the session's score channel;
    /// the engine is always its first consumer.
    pub fn new(level: &DifficultyLevel, score_events: EventPublisher<ScoreEvent>) -> Self {
        let size = level.game_info().size;
        let mut engine = Self {
            arena: HashMap::new(),
            renderables: Vec::new(),
            game_objects: Vec::new(),
            pending: MutationLog::default(),
            next_id: 0,
            player: EntityId(0),
            left: false,
            right: false,
            game_width: size.x,
            game_height: size.y,
            timer: SHOT_COOLDOWN,
            time_elapsed: 0.0,
            score: 0,
            last_update: Instant::now(),
            observers: Vec::new(),
            score_events,
            memento: None,
        };

        let p = level.player_info();
        engine.player = engine.spawn(Entity::player(p.position, p.speed, p.lives));

        for bunker in level.bunkers_info() {
            engine.spawn(Entity::bunker(bunker.position, bunker.size.x, bunker.size.y));
        }
        for enemy in level.enemies_info() {
            engine.spawn(Entity::enemy(enemy.position, enemy.projectile));
        }

        tracing::info!(
            width = engine.game_width,
            height = engine.game_height,
            bunkers = level.bunkers_info().len(),
            enemies = level.enemies_info().len(),
            "engine ready"
        );
        engine
    }

    // ── Tick ──────────────────────────────────────────────────────────────────

    /// Advance one tick using the wall-clock time since the previous tick.
    pub fn update(&mut self, rng: &mut impl RngCore) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        self.step(delta, rng);
    }

    /// Advance one tick by an explicit `delta` in seconds.
    pub fn step(&mut self, delta: f32, rng: &mut impl RngCore) {
        self.timer = self.timer.saturating_add(1);
        self.update_time(delta);
        self.move_player();
        self.update_game_objects(rng);
        self.resolve_collisions();
        self.clamp_to_bounds();
    }

    fn move_player(&mut self) {
        let Some(player) = self.arena.get_mut(&self.player) else {
            return;
        };
        if self.left {
            player.move_left();
        }
        if self.right {
            player.move_right();
        }
    }

    fn update_game_objects(&mut self, rng: &mut impl RngCore) {
        let mut projectile_counts: HashMap<EntityId, usize> = HashMap::new();
        let live_owners = self
            .arena
            .values()
            .filter(|e| e.is_alive())
            .filter_map(Entity::owner);
        let pending_owners = self.pending.pending_spawns().iter().filter_map(Entity::owner);
        for owner in live_owners.chain(pending_owners) {
            *projectile_counts.entry(owner).or_default() += 1;
        }

        let mut ctx = TickContext {
            game_width: self.game_width,
            game_height: self.game_height,
            rng,
            projectile_counts: &projectile_counts,
            log: &mut self.pending,
        };
        for id in &self.game_objects {
            if let Some(entity) = self.arena.get_mut(id) {
                entity.update(*id, &mut ctx);
            }
        }
    }

    fn resolve_collisions(&mut self) {
        let mut events = Vec::new();
        let ids = &self.renderables;

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a_id, b_id) = (ids[i], ids[j]);
                let (Some(a), Some(b)) = (self.arena.get(&a_id), self.arena.get(&b_id)) else {
                    continue;
                };
                if collision_exempt(a.kind(), b.kind()) {
                    continue;
                }
                if !(a.is_alive() && b.is_alive() && a.is_colliding(b)) {
                    continue;
                }

                let points = interception_points(a, b);
                for id in [a_id, b_id] {
                    if let Some(entity) = self.arena.get_mut(&id) {
                        entity.take_damage(1);
                    }
                }
                if let Some(points) = points {
                    events.push(ScoreEvent::new(points));
                }
            }
        }

        for event in events {
            self.publish_score(event);
        }
    }

    fn clamp_to_bounds(&mut self) {
        let (w, h) = (self.game_width, self.game_height);
        for id in &self.renderables {
            let Some(e) = self.arena.get_mut(id) else {
                continue;
            };
            if e.layer != Layer::Foreground {
                continue;
            }
            // Right/bottom first so an entity wider than the board ends up
            // pinned to the top-left margin.
            let max_x = w - EDGE_MARGIN - e.width;
            let max_y = h - EDGE_MARGIN - e.height;
            if e.position.x > max_x {
                e.position.x = max_x;
            }
            if e.position.x < EDGE_MARGIN {
                e.position.x = EDGE_MARGIN;
            }
            if e.position.y > max_y {
                e.position.y = max_y;
            }
            if e.position.y < EDGE_MARGIN {
                e.position.y = EDGE_MARGIN;
            }
        }
    }

    /// Apply the spawns and despawns recorded since the last call. Removals
    /// are applied before additions.
    pub fn reconcile(&mut self) -> Reconciled {
        if self.pending.is_empty() {
            return Reconciled::default();
        }
        let (spawns, despawns) = self.pending.take();

        let removed: Vec<EntityId> = despawns.into_iter().filter(|id| self.remove(*id)).collect();
        let added: Vec<EntityId> = spawns.into_iter().map(|e| self.spawn(e)).collect();

        tracing::debug!(added = added.len(), removed = removed.len(), "reconciled");
        Reconciled { added, removed }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    pub fn left_pressed(&mut self) {
        self.left = true;
    }

    pub fn left_released(&mut self) {
        self.left = false;
    }

    pub fn right_pressed(&mut self) {
        self.right = true;
    }

    pub fn right_released(&mut self) {
        self.right = false;
    }

    /// Fire a player shot if the cooldown has run out and the player is
    /// alive. Returns whether a shot was fired.
    pub fn shoot_pressed(&mut self) -> bool {
        if self.timer <= SHOT_COOLDOWN {
            return false;
        }
        let shot = match self.arena.get(&self.player) {
            Some(player) if player.is_alive() => player.shoot(),
            _ => return false,
        };
        let id = self.spawn(shot);
        self.timer = 0;
        tracing::debug!(%id, "player fired");
        true
    }

    // ── Score & time ──────────────────────────────────────────────────────────

    pub fn update_score(&mut self, delta: u32) {
        self.score = self.score.saturating_add(delta);
        self.notify_score_changed();
    }

    pub fn set_score(&mut self, score: u32) {
        self.score = score;
    }

    pub fn update_time(&mut self, delta: f32) {
        self.time_elapsed += delta.max(0.0);
        self.notify_time_changed();
    }

    pub fn set_time_elapsed(&mut self, seconds: f32) {
        self.time_elapsed = seconds;
    }

    fn publish_score(&mut self, event: ScoreEvent) {
        self.update_score(event.points);
        self.score_events.publish(&event);
    }

    // ── Observers ─────────────────────────────────────────────────────────────

    pub fn add_observer(&mut self, observer: impl GameObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn score_events_mut(&mut self) -> &mut EventPublisher<ScoreEvent> {
        &mut self.score_events
    }

    fn notify_score_changed(&mut self) {
        for observer in &mut self.observers {
            observer.score_changed(self.score);
        }
    }

    fn notify_time_changed(&mut self) {
        let elapsed = Duration::try_from_secs_f32(self.time_elapsed).unwrap_or_default();
        for observer in &mut self.observers {
            observer.time_changed(elapsed);
        }
    }

    // ── Snapshots ─────────────────────────────────────────────────────────────

    /// Capture enemies, enemy projectiles, score and time, replacing any
    /// earlier snapshot.
    pub fn save_state_to_memento(&mut self) {
        let memento = GameMemento::capture(self.renderables(), self.score, self.time_elapsed);
        tracing::info!(
            entities = memento.len(),
            score = memento.score(),
            "snapshot saved"
        );
        self.memento = Some(memento);
    }

    /// Roll enemies, enemy projectiles, score and time back to the last
    /// snapshot. Returns `false` (and changes nothing) without one.
    pub fn restore_state_from_memento(&mut self) -> bool {
        let Some(memento) = self.memento.take() else {
            tracing::debug!("restore requested without a snapshot");
            return false;
        };

        let removed: Vec<EntityId> = self
            .renderables()
            .filter(|(_, e)| e.kind().is_enemy_side())
            .map(|(id, _)| id)
            .collect();
        self.clear_enemies_and_projectiles();
        let restored = memento.restore_into(self);
        self.memento = Some(memento);

        for observer in &mut self.observers {
            observer.renderables_removed(&removed);
        }
        self.notify_score_changed();
        self.notify_time_changed();

        tracing::info!(
            removed = removed.len(),
            restored = restored.len(),
            score = self.score,
            "snapshot restored"
        );
        true
    }

    pub fn has_snapshot(&self) -> bool {
        self.memento.is_some()
    }

    pub fn memento(&self) -> Option<&GameMemento> {
        self.memento.as_ref()
    }

    /// Drop every enemy and enemy projectile, including ones still waiting
    /// to be spawned.
    pub fn clear_enemies_and_projectiles(&mut self) {
        self.arena.retain(|_, e| !e.kind().is_enemy_side());
        let arena = &self.arena;
        self.renderables.retain(|id| arena.contains_key(id));
        self.game_objects.retain(|id| arena.contains_key(id));
        self.pending.discard_spawns(|e| e.kind().is_enemy_side());
    }

    /// Insert already-identified entities into both live collections. No
    /// duplicate check: callers clear the matching entities first.
    pub(crate) fn add_all_renderables_and_game_objects(
        &mut self,
        entities: Vec<(EntityId, Entity)>,
    ) -> Vec<EntityId> {
        entities
            .into_iter()
            .map(|(id, entity)| {
                self.insert(id, entity);
                id
            })
            .collect()
    }

    pub(crate) fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    // ── Cheats ────────────────────────────────────────────────────────────────

    pub fn cheat_remove_fast_projectiles(&mut self) -> usize {
        self.cheat_remove("fast projectiles", CHEAT_FAST_PROJECTILE_POINTS, |e| {
            e.kind() == EntityKind::EnemyProjectile && e.strategy().is_some_and(|s| s.is_fast())
        })
    }

    pub fn cheat_remove_slow_projectiles(&mut self) -> usize {
        self.cheat_remove("slow projectiles", CHEAT_SLOW_PROJECTILE_POINTS, |e| {
            e.kind() == EntityKind::EnemyProjectile && e.strategy().is_some_and(|s| s.is_slow())
        })
    }

    pub fn cheat_remove_enemies_with_fast_projectiles(&mut self) -> usize {
        self.cheat_remove("fast enemies", CHEAT_FAST_ENEMY_POINTS, |e| {
            e.kind() == EntityKind::Enemy && e.strategy().is_some_and(|s| s.is_fast())
        })
    }

    pub fn cheat_remove_enemies_with_slow_projectiles(&mut self) -> usize {
        self.cheat_remove("slow enemies", CHEAT_SLOW_ENEMY_POINTS, |e| {
            e.kind() == EntityKind::Enemy && e.strategy().is_some_and(|s| s.is_slow())
        })
    }

    /// Kill every living renderable matching `pred` and award
    /// `multiplier` points per kill. Removal happens on the next reconcile.
    fn cheat_remove(&mut self, what: &str, multiplier: u32, pred: impl Fn(&Entity) -> bool) -> usize {
        let mut removed = 0usize;
        for id in &self.renderables {
            if let Some(e) = self.arena.get_mut(id) {
                if e.is_alive() && pred(e) {
                    let health = e.health;
                    e.take_damage(health);
                    removed += 1;
                }
            }
        }
        let points = u32::try_from(removed).unwrap_or(u32::MAX).saturating_mul(multiplier);
        tracing::info!(what, removed, points, "cheat used");
        self.update_score(points);
        removed
    }

    // ── Arena ─────────────────────────────────────────────────────────────────

    /// Insert straight into the live collections, outside of any tick.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.allocate_id();
        self.insert(id, entity);
        id
    }

    fn insert(&mut self, id: EntityId, entity: Entity) {
        self.renderables.push(id);
        if entity.kind().is_game_object() {
            self.game_objects.push(id);
        }
        self.arena.insert(id, entity);
    }

    fn remove(&mut self, id: EntityId) -> bool {
        if id == self.player || self.arena.remove(&id).is_none() {
            return false;
        }
        self.renderables.retain(|r| *r != id);
        self.game_objects.retain(|g| *g != id);
        true
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Live renderables in insertion order.
    pub fn renderables(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.renderables
            .iter()
            .filter_map(|id| self.arena.get(id).map(|e| (*id, e)))
    }

    /// Live game objects in insertion order.
    pub fn game_objects(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.game_objects
            .iter()
            .filter_map(|id| self.arena.get(id).map(|e| (*id, e)))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.arena.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.arena.get_mut(&id)
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.renderables().filter(|(_, e)| e.kind() == kind).count()
    }

    pub fn pending(&self) -> &MutationLog {
        &self.pending
    }

    pub fn player_id(&self) -> EntityId {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.arena.get(&self.player)
    }

    pub fn player_position(&self) -> Vector2D {
        self.player().map(|p| p.position).unwrap_or_default()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_elapsed(&self) -> f32 {
        self.time_elapsed
    }

    pub fn game_width(&self) -> f32 {
        self.game_width
    }

    pub fn game_height(&self) -> f32 {
        self.game_height
    }

    /// The player is dead or no living enemy is left.
    pub fn is_game_over(&self) -> bool {
        let player_dead = self.player().map_or(true, |p| !p.is_alive());
        let enemies_left = self
            .renderables()
            .any(|(_, e)| e.kind() == EntityKind::Enemy && e.is_alive());
        player_dead || !enemies_left
    }
}

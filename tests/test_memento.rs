use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use invaders::config::DifficultyLevel;
use invaders::engine::GameEngine;
use invaders::entities::*;
use invaders::events::EventPublisher;
use invaders::memento::GameMemento;
use invaders::observer::GameObserver;
use invaders::strategy::ProjectileStrategy;
use invaders::vector::Vector2D;

use pretty_assertions::assert_eq;
use rand::rngs::mock::StepRng;
use serde_json::json;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Two enemies (fast, slow), one bunker, player at (400, 500) on 800×600.
fn engine() -> GameEngine {
    let doc = json!({
        "Game": { "size": { "x": 800, "y": 600 } },
        "Player": { "speed": 2, "lives": 3, "position": { "x": 400, "y": 500 } },
        "Bunkers": [ { "position": { "x": 100, "y": 400 }, "size": { "x": 60, "y": 30 } } ],
        "Enemies": [
            { "position": { "x": 200, "y": 50 }, "projectile": "fast_straight" },
            { "position": { "x": 300, "y": 50 }, "projectile": "slow_straight" },
        ],
    });
    let level = DifficultyLevel::from_json(&doc.to_string()).unwrap();
    GameEngine::new(&level, EventPublisher::new())
}

fn quiet_rng() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

fn ids_of(engine: &GameEngine, kind: EntityKind) -> Vec<EntityId> {
    engine
        .renderables()
        .filter(|(_, e)| e.kind() == kind)
        .map(|(id, _)| id)
        .collect()
}

/// Positions of the enemy side, sorted so id changes don't matter.
fn enemy_side_positions(engine: &GameEngine) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = engine
        .renderables()
        .filter(|(_, e)| e.kind().is_enemy_side())
        .map(|(_, e)| (e.position.x, e.position.y))
        .collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap());
    out
}

fn fire_enemy_shot(engine: &mut GameEngine, owner: EntityId, at: Vector2D) -> EntityId {
    let strategy = engine.entity(owner).unwrap().strategy().unwrap();
    engine.spawn(Entity::enemy_projectile(at, strategy, Some(owner)))
}

#[derive(Default)]
struct Recorder {
    removed: Vec<Vec<EntityId>>,
    scores: Vec<u32>,
    times: Vec<Duration>,
}

impl GameObserver for Recorder {
    fn time_changed(&mut self, elapsed: Duration) {
        self.times.push(elapsed);
    }

    fn score_changed(&mut self, score: u32) {
        self.scores.push(score);
    }

    fn renderables_removed(&mut self, removed: &[EntityId]) {
        self.removed.push(removed.to_vec());
    }
}

// ── Capture ───────────────────────────────────────────────────────────────────

#[test]
fn capture_keeps_only_the_enemy_side() {
    let mut engine = engine();
    let enemy = ids_of(&engine, EntityKind::Enemy)[0];
    fire_enemy_shot(&mut engine, enemy, Vector2D::new(200.0, 100.0));
    engine.spawn(Entity::player_projectile(Vector2D::new(50.0, 300.0)));

    engine.save_state_to_memento();

    let memento = engine.memento().unwrap();
    assert_eq!(memento.len(), 3);
    assert!(memento.entities().all(|e| e.kind().is_enemy_side()));
}

#[test]
fn capture_is_a_copy() {
    let mut engine = engine();
    let enemy = ids_of(&engine, EntityKind::Enemy)[0];
    let memento = GameMemento::capture(engine.renderables(), 3, 1.5);

    engine.entity_mut(enemy).unwrap().position.x = 700.0;

    assert!(memento.entities().all(|e| e.position.x != 700.0));
    assert_eq!(memento.score(), 3);
    assert_eq!(memento.time_elapsed(), 1.5);
}

#[test]
fn saving_again_replaces_the_snapshot() {
    let mut engine = engine();
    engine.save_state_to_memento();
    engine.update_score(9);
    engine.save_state_to_memento();
    assert_eq!(engine.memento().map(GameMemento::score), Some(9));
}

// ── Restore ───────────────────────────────────────────────────────────────────

#[test]
fn restore_without_snapshot_changes_nothing() {
    let mut engine = engine();
    engine.update_score(4);
    let before = enemy_side_positions(&engine);

    assert!(!engine.restore_state_from_memento());

    assert_eq!(engine.score(), 4);
    assert_eq!(enemy_side_positions(&engine), before);
    assert!(!engine.has_snapshot());
}

#[test]
fn save_clear_restore_round_trip() {
    let mut engine = engine();
    let enemies = ids_of(&engine, EntityKind::Enemy);
    fire_enemy_shot(&mut engine, enemies[0], Vector2D::new(205.0, 80.0));
    fire_enemy_shot(&mut engine, enemies[1], Vector2D::new(305.0, 80.0));
    engine.update_score(7);
    engine.set_time_elapsed(12.5);
    let saved = enemy_side_positions(&engine);

    engine.save_state_to_memento();
    engine.clear_enemies_and_projectiles();
    assert_eq!(engine.count_of(EntityKind::Enemy), 0);
    assert_eq!(engine.count_of(EntityKind::EnemyProjectile), 0);
    engine.update_score(100);

    assert!(engine.restore_state_from_memento());

    assert_eq!(engine.count_of(EntityKind::Enemy), 2);
    assert_eq!(engine.count_of(EntityKind::EnemyProjectile), 2);
    assert_eq!(enemy_side_positions(&engine), saved);
    assert_eq!(engine.score(), 7);
    assert_eq!(engine.time_elapsed(), 12.5);
}

#[test]
fn restore_rolls_back_later_play() {
    let mut engine = engine();
    engine.save_state_to_memento();
    let saved = enemy_side_positions(&engine);

    for _ in 0..30 {
        engine.step(0.02, &mut quiet_rng());
        engine.reconcile();
    }
    engine.cheat_remove_enemies_with_fast_projectiles();
    assert_ne!(enemy_side_positions(&engine), saved);

    engine.restore_state_from_memento();

    assert_eq!(enemy_side_positions(&engine), saved);
    assert_eq!(engine.score(), 0);
    assert_eq!(engine.time_elapsed(), 0.0);
    assert!(ids_of(&engine, EntityKind::Enemy)
        .iter()
        .all(|id| engine.entity(*id).unwrap().is_alive()));
}

#[test]
fn restore_leaves_player_bunkers_and_player_shots_alone() {
    let mut engine = engine();
    engine.save_state_to_memento();

    let shot = engine.spawn(Entity::player_projectile(Vector2D::new(50.0, 300.0)));
    let bunker = ids_of(&engine, EntityKind::Bunker)[0];
    engine.entity_mut(bunker).unwrap().take_damage(2);
    let player = engine.player_id();
    engine.entity_mut(player).unwrap().position.x = 123.0;

    engine.restore_state_from_memento();

    assert_eq!(engine.count_of(EntityKind::PlayerProjectile), 1);
    assert!(engine.entity(shot).is_some());
    assert_eq!(engine.entity(bunker).unwrap().health, BUNKER_HEALTH - 2);
    assert_eq!(engine.player_position().x, 123.0);
    assert_eq!(engine.count_of(EntityKind::Player), 1);
}

#[test]
fn restored_entities_do_not_alias_the_snapshot() {
    let mut engine = engine();
    engine.save_state_to_memento();
    let saved = enemy_side_positions(&engine);

    engine.restore_state_from_memento();
    for id in ids_of(&engine, EntityKind::Enemy) {
        engine.entity_mut(id).unwrap().position.y = 500.0;
    }

    // The snapshot still holds the old positions, so a second rollback works.
    assert!(engine.has_snapshot());
    engine.restore_state_from_memento();
    assert_eq!(enemy_side_positions(&engine), saved);
}

#[test]
fn restored_projectiles_point_at_restored_enemies() {
    let mut engine = engine();
    let enemy = ids_of(&engine, EntityKind::Enemy)[1];
    fire_enemy_shot(&mut engine, enemy, Vector2D::new(305.0, 80.0));
    engine.save_state_to_memento();

    engine.restore_state_from_memento();

    assert!(engine.entity(enemy).is_none());
    let (_, shot) = engine
        .renderables()
        .find(|(_, e)| e.kind() == EntityKind::EnemyProjectile)
        .unwrap();
    let owner = shot.owner().unwrap();
    let restored = engine.entity(owner).unwrap();
    assert_eq!(restored.kind(), EntityKind::Enemy);
    assert_eq!(restored.strategy(), Some(ProjectileStrategy::SlowStraight));
    assert_eq!(restored.position, Vector2D::new(300.0, 50.0));
}

#[test]
fn restore_drops_enemy_shots_still_waiting_to_spawn() {
    let mut engine = engine();
    engine.save_state_to_memento();

    // Every enemy fires this tick; nothing is reconciled yet.
    engine.step(0.02, &mut StepRng::new(0, 0));
    assert_eq!(engine.pending().pending_spawns().len(), 2);

    engine.restore_state_from_memento();
    assert!(engine.pending().pending_spawns().is_empty());

    engine.reconcile();
    assert_eq!(engine.count_of(EntityKind::EnemyProjectile), 0);
    assert_eq!(engine.count_of(EntityKind::Enemy), 2);
}

#[test]
fn restore_notifies_observers() {
    let mut engine = engine();
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    engine.add_observer(Rc::clone(&recorder));

    engine.update_score(3);
    engine.save_state_to_memento();
    let before = ids_of(&engine, EntityKind::Enemy);
    engine.update_score(5);

    engine.restore_state_from_memento();

    let recorder = recorder.borrow();
    assert_eq!(recorder.removed, vec![before]);
    assert_eq!(recorder.scores.last(), Some(&3));
    assert_eq!(recorder.times.last(), Some(&Duration::ZERO));
}

//! Game entity types and the two capabilities every entity implements:
//! [`Renderable`] (display + collision) and [`GameObject`] (per-tick update).

use std::fmt;

use rand::Rng;

use crate::mutation::TickContext;
use crate::strategy::ProjectileStrategy;
use crate::vector::Vector2D;

// ── Dimensions & tuning ───────────────────────────────────────────────────────

pub const PLAYER_WIDTH: f32 = 25.0;
pub const PLAYER_HEIGHT: f32 = 30.0;
pub const ENEMY_WIDTH: f32 = 20.0;
pub const ENEMY_HEIGHT: f32 = 20.0;
pub const PROJECTILE_WIDTH: f32 = 10.0;
pub const PROJECTILE_HEIGHT: f32 = 10.0;

pub const ENEMY_HEALTH: i32 = 1;
pub const BUNKER_HEALTH: i32 = 3;
pub const PROJECTILE_HEALTH: i32 = 1;

/// Horizontal enemy speed in units per tick.
pub const ENEMY_SPEED: f32 = 0.8;
/// An enemy fires with probability `1 / ENEMY_SHOT_ODDS` per tick.
pub const ENEMY_SHOT_ODDS: u32 = 120;
/// Live projectiles a single enemy may own at once.
pub const MAX_ENEMY_PROJECTILES: usize = 3;

// ── Identity ──────────────────────────────────────────────────────────────────

/// Stable handle for an entity owned by the engine's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Enemy,
    Bunker,
    PlayerProjectile,
    EnemyProjectile,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Enemy => "Enemy",
            Self::Bunker => "Bunker",
            Self::PlayerProjectile => "PlayerProjectile",
            Self::EnemyProjectile => "EnemyProjectile",
        }
    }

    /// Enemies and their projectiles: the sub-state a snapshot captures.
    pub fn is_enemy_side(self) -> bool {
        matches!(self, Self::Enemy | Self::EnemyProjectile)
    }

    /// Whether entities of this kind take part in the per-tick update.
    /// The player is driven by input instead.
    pub fn is_game_object(self) -> bool {
        !matches!(self, Self::Player)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Background,
    Foreground,
}

/// Display state of a bunker, derived from its remaining health.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BunkerState {
    Green,
    Yellow,
    Red,
    Destroyed,
}

// ── Entity ────────────────────────────────────────────────────────────────────

/// Variant-specific data.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Player {
        speed: f32,
    },
    Enemy {
        /// Signed horizontal velocity; flips at each wall bounce.
        x_vel: f32,
        /// Strategy handed to every projectile this enemy fires.
        projectile_strategy: ProjectileStrategy,
    },
    Bunker,
    PlayerProjectile {
        strategy: ProjectileStrategy,
    },
    EnemyProjectile {
        strategy: ProjectileStrategy,
        owner: Option<EntityId>,
    },
}

/// A single entity. `Clone` yields a fully independent value, which is what
/// snapshots rely on.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub position: Vector2D,
    pub width: f32,
    pub height: f32,
    pub health: i32,
    pub layer: Layer,
    pub body: Body,
}

impl Entity {
    pub fn player(position: Vector2D, speed: f32, lives: i32) -> Self {
        Self {
            position,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            health: lives,
            layer: Layer::Foreground,
            body: Body::Player { speed },
        }
    }

    pub fn enemy(position: Vector2D, projectile_strategy: ProjectileStrategy) -> Self {
        Self {
            position,
            width: ENEMY_WIDTH,
            height: ENEMY_HEIGHT,
            health: ENEMY_HEALTH,
            layer: Layer::Foreground,
            body: Body::Enemy {
                x_vel: -ENEMY_SPEED,
                projectile_strategy,
            },
        }
    }

    pub fn bunker(position: Vector2D, width: f32, height: f32) -> Self {
        Self {
            position,
            width,
            height,
            health: BUNKER_HEALTH,
            layer: Layer::Foreground,
            body: Body::Bunker,
        }
    }

    pub fn player_projectile(position: Vector2D) -> Self {
        Self {
            position,
            width: PROJECTILE_WIDTH,
            height: PROJECTILE_HEIGHT,
            health: PROJECTILE_HEALTH,
            layer: Layer::Foreground,
            body: Body::PlayerProjectile {
                strategy: ProjectileStrategy::Normal,
            },
        }
    }

    pub fn enemy_projectile(
        position: Vector2D,
        strategy: ProjectileStrategy,
        owner: Option<EntityId>,
    ) -> Self {
        Self {
            position,
            width: PROJECTILE_WIDTH,
            height: PROJECTILE_HEIGHT,
            health: PROJECTILE_HEALTH,
            layer: Layer::Foreground,
            body: Body::EnemyProjectile { strategy, owner },
        }
    }

    pub fn with_layer(self, layer: Layer) -> Self {
        Self { layer, ..self }
    }

    pub fn with_health(self, health: i32) -> Self {
        Self { health, ..self }
    }

    /// Projectile strategy attached to this entity, if any. For enemies this
    /// is the strategy their shots use.
    pub fn strategy(&self) -> Option<ProjectileStrategy> {
        match &self.body {
            Body::Enemy {
                projectile_strategy,
                ..
            } => Some(*projectile_strategy),
            Body::PlayerProjectile { strategy } | Body::EnemyProjectile { strategy, .. } => {
                Some(*strategy)
            }
            Body::Player { .. } | Body::Bunker => None,
        }
    }

    /// Enemy that fired this projectile.
    pub fn owner(&self) -> Option<EntityId> {
        match &self.body {
            Body::EnemyProjectile { owner, .. } => *owner,
            _ => None,
        }
    }

    pub fn bunker_state(&self) -> Option<BunkerState> {
        if !matches!(self.body, Body::Bunker) {
            return None;
        }
        Some(match self.health {
            h if h >= 3 => BunkerState::Green,
            2 => BunkerState::Yellow,
            1 => BunkerState::Red,
            _ => BunkerState::Destroyed,
        })
    }

    // ── Player movement ───────────────────────────────────────────────────────

    pub fn move_left(&mut self) {
        if let Body::Player { speed } = self.body {
            self.position.x -= speed;
        }
    }

    pub fn move_right(&mut self) {
        if let Body::Player { speed } = self.body {
            self.position.x += speed;
        }
    }

    /// Projectile fired by the player from its current position.
    pub fn shoot(&self) -> Entity {
        Entity::player_projectile(Vector2D::new(
            self.position.x + 5.0,
            self.position.y - PROJECTILE_HEIGHT,
        ))
    }
}

// ── Capabilities ──────────────────────────────────────────────────────────────

/// Anything the view can draw and the engine can collide.
pub trait Renderable {
    fn position(&self) -> Vector2D;
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn health(&self) -> i32;
    fn layer(&self) -> Layer;
    fn kind(&self) -> EntityKind;
    fn take_damage(&mut self, amount: i32);

    fn is_alive(&self) -> bool {
        self.health() > 0
    }

    /// Axis-aligned bounding-box overlap. Touching edges do not collide.
    fn is_colliding(&self, other: &dyn Renderable) -> bool {
        let (a, b) = (self.position(), other.position());
        a.x < b.x + other.width()
            && a.x + self.width() > b.x
            && a.y < b.y + other.height()
            && a.y + self.height() > b.y
    }
}

/// Anything that advances once per tick.
pub trait GameObject {
    fn update(&mut self, id: EntityId, ctx: &mut TickContext<'_>);
}

impl Renderable for Entity {
    fn position(&self) -> Vector2D {
        self.position
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn health(&self) -> i32 {
        self.health
    }

    fn layer(&self) -> Layer {
        self.layer
    }

    fn kind(&self) -> EntityKind {
        match self.body {
            Body::Player { .. } => EntityKind::Player,
            Body::Enemy { .. } => EntityKind::Enemy,
            Body::Bunker => EntityKind::Bunker,
            Body::PlayerProjectile { .. } => EntityKind::PlayerProjectile,
            Body::EnemyProjectile { .. } => EntityKind::EnemyProjectile,
        }
    }

    fn take_damage(&mut self, amount: i32) {
        self.health = (self.health - amount).max(0);
    }
}

impl GameObject for Entity {
    fn update(&mut self, id: EntityId, ctx: &mut TickContext<'_>) {
        if !self.is_alive() {
            ctx.despawn(id);
            return;
        }

        let (width, height) = (self.width, self.height);
        match &mut self.body {
            Body::Player { .. } | Body::Bunker => {}

            Body::Enemy {
                x_vel,
                projectile_strategy,
            } => {
                if ctx.live_projectiles_of(id) < MAX_ENEMY_PROJECTILES
                    && ctx.rng.gen_ratio(1, ENEMY_SHOT_ODDS)
                {
                    let muzzle = Vector2D::new(
                        self.position.x + width / 2.0,
                        self.position.y + height + 2.0,
                    );
                    ctx.spawn(Entity::enemy_projectile(muzzle, *projectile_strategy, Some(id)));
                }

                // Bounce only when heading into a wall, then drop one row.
                let at_left = self.position.x <= width && *x_vel < 0.0;
                let at_right = self.position.x >= ctx.game_width - width - 1.0 && *x_vel > 0.0;
                if at_left || at_right {
                    self.position.y += height;
                    *x_vel = -*x_vel;
                }
                self.position.x += *x_vel;
            }

            Body::PlayerProjectile { strategy } => {
                strategy.advance(&mut self.position);
                if self.position.y <= height {
                    self.take_damage(1);
                }
            }

            Body::EnemyProjectile { strategy, .. } => {
                strategy.advance(&mut self.position);
                if self.position.y >= ctx.game_height - height {
                    self.take_damage(1);
                }
            }
        }

        if !self.is_alive() {
            ctx.despawn(id);
        }
    }
}

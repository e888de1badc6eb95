//! Per-instance projectile movement behaviour.

use serde::Deserialize;

use crate::vector::Vector2D;

/// How a projectile travels each tick.
///
/// Enemies carry one of the straight-down variants and hand a fresh copy to
/// every projectile they fire; the player always fires `Normal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum ProjectileStrategy {
    /// Straight up, one unit per tick (player shots).
    #[serde(skip)]
    Normal,
    /// Straight down, two units per tick.
    #[serde(rename = "fast_straight")]
    FastStraight,
    /// Straight down, one unit per tick.
    #[serde(rename = "slow_straight")]
    SlowStraight,
}

impl ProjectileStrategy {
    pub fn velocity(self) -> Vector2D {
        match self {
            Self::Normal => Vector2D::new(0.0, -1.0),
            Self::FastStraight => Vector2D::new(0.0, 2.0),
            Self::SlowStraight => Vector2D::new(0.0, 1.0),
        }
    }

    /// Move `position` one tick along this strategy.
    pub fn advance(self, position: &mut Vector2D) {
        *position += self.velocity();
    }

    /// Points awarded when a player shot destroys a projectile of this kind.
    pub fn points(self) -> u32 {
        match self {
            Self::FastStraight => 2,
            Self::SlowStraight => 1,
            Self::Normal => 0,
        }
    }

    pub fn is_fast(self) -> bool {
        self == Self::FastStraight
    }

    pub fn is_slow(self) -> bool {
        self == Self::SlowStraight
    }
}

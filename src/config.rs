//! Difficulty levels and the JSON documents that describe them.
//!
//! A level is read once when the engine is built; nothing in here is touched
//! during simulation.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::strategy::ProjectileStrategy;
use crate::vector::Vector2D;

// ── Difficulty names ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn name(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn file_name(self) -> String {
        format!("config_{}.json", self.name())
    }

    fn builtin_json(self) -> &'static str {
        match self {
            Self::Easy => include_str!("../config/config_easy.json"),
            Self::Medium => include_str!("../config/config_medium.json"),
            Self::Hard => include_str!("../config/config_hard.json"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" | "normal" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ConfigError::UnknownDifficulty(s.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { origin: String, source: serde_json::Error },
    Invalid(String),
    UnknownDifficulty(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Self::Parse { origin, source } => write!(f, "malformed level {origin}: {source}"),
            Self::Invalid(msg) => write!(f, "invalid level: {msg}"),
            Self::UnknownDifficulty(name) => {
                write!(f, "unknown difficulty '{name}' (expected easy, medium or hard)")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) | Self::UnknownDifficulty(_) => None,
        }
    }
}

// ── Document sections ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Size {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GameInfo {
    pub size: Size,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PlayerInfo {
    #[serde(default)]
    pub colour: Option<String>,
    pub speed: f32,
    pub lives: i32,
    pub position: Vector2D,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BunkerInfo {
    pub position: Vector2D,
    pub size: Size,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EnemyInfo {
    pub position: Vector2D,
    pub projectile: ProjectileStrategy,
}

/// Everything needed to lay out one game.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DifficultyLevel {
    #[serde(rename = "Game")]
    game: GameInfo,
    #[serde(rename = "Player")]
    player: PlayerInfo,
    #[serde(rename = "Bunkers", default)]
    bunkers: Vec<BunkerInfo>,
    #[serde(rename = "Enemies", default)]
    enemies: Vec<EnemyInfo>,
}

impl DifficultyLevel {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, "<inline>")
    }

    /// The level shipped inside the binary.
    pub fn builtin(difficulty: Difficulty) -> Result<Self, ConfigError> {
        Self::parse(
            difficulty.builtin_json(),
            &format!("<builtin {difficulty}>"),
        )
    }

    /// Read `<dir>/config_<difficulty>.json`.
    pub fn load(dir: &Path, difficulty: Difficulty) -> Result<Self, ConfigError> {
        let path = dir.join(difficulty.file_name());
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let level = Self::parse(&text, &path.display().to_string())?;
        tracing::info!(path = %path.display(), %difficulty, "loaded level");
        Ok(level)
    }

    /// [`load`](Self::load) when a directory is given and the file exists,
    /// otherwise the builtin level.
    pub fn load_or_builtin(dir: Option<&Path>, difficulty: Difficulty) -> Result<Self, ConfigError> {
        match dir {
            Some(dir) if dir.join(difficulty.file_name()).is_file() => Self::load(dir, difficulty),
            Some(dir) => {
                tracing::warn!(
                    dir = %dir.display(),
                    %difficulty,
                    "no level file found, using builtin level"
                );
                Self::builtin(difficulty)
            }
            None => Self::builtin(difficulty),
        }
    }

    fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let level: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        level.validate()?;
        Ok(level)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let Size { x: w, y: h } = self.game.size;
        if w <= 0.0 || h <= 0.0 {
            return Err(ConfigError::Invalid(format!("board size {w}x{h} must be positive")));
        }
        if self.player.speed <= 0.0 {
            return Err(ConfigError::Invalid("player speed must be positive".into()));
        }
        if self.player.lives <= 0 {
            return Err(ConfigError::Invalid("player lives must be positive".into()));
        }

        let inside = |p: Vector2D| p.x >= 0.0 && p.y >= 0.0 && p.x < w && p.y < h;
        if !inside(self.player.position) {
            return Err(ConfigError::Invalid("player spawns outside the board".into()));
        }
        for (i, bunker) in self.bunkers.iter().enumerate() {
            if bunker.size.x <= 0.0 || bunker.size.y <= 0.0 {
                return Err(ConfigError::Invalid(format!("bunker {i} has a non-positive size")));
            }
            if !inside(bunker.position) {
                return Err(ConfigError::Invalid(format!("bunker {i} spawns outside the board")));
            }
        }
        for (i, enemy) in self.enemies.iter().enumerate() {
            if !inside(enemy.position) {
                return Err(ConfigError::Invalid(format!("enemy {i} spawns outside the board")));
            }
        }
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn game_info(&self) -> &GameInfo {
        &self.game
    }

    pub fn player_info(&self) -> &PlayerInfo {
        &self.player
    }

    pub fn bunkers_info(&self) -> &[BunkerInfo] {
        &self.bunkers
    }

    pub fn enemies_info(&self) -> &[EnemyInfo] {
        &self.enemies
    }

    /// Difficulty name recorded in the document itself, if any.
    pub fn difficulty(&self) -> Option<&str> {
        self.game.difficulty.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_level_is_valid() {
        for difficulty in Difficulty::ALL {
            let level = DifficultyLevel::builtin(difficulty).expect("builtin level");
            assert_eq!(level.difficulty(), Some(difficulty.name()));
            assert!(!level.enemies_info().is_empty());
        }
    }

    #[test]
    fn normal_is_an_alias_for_medium() {
        assert_eq!("Normal".parse::<Difficulty>().unwrap(), Difficulty::Medium);
    }
}

//! Rendering layer. All terminal I/O lives here.
//!
//! Board coordinates are scaled onto the terminal grid every frame, so the
//! engine never knows how big the terminal is.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal, QueueableCommand,
};
use invaders::config::Difficulty;
use invaders::engine::GameEngine;
use invaders::entities::{BunkerState, Entity, EntityKind, Renderable};

use crate::Hud;

// ── Colour palette ────────────────────────────────────────────────────────────

const C_BORDER: Color = Color::DarkBlue;
const C_HUD_SCORE: Color = Color::Yellow;
const C_HUD_TIME: Color = Color::White;
const C_HUD_LIVES: Color = Color::Red;
const C_PLAYER: Color = Color::White;
const C_ENEMY_FAST: Color = Color::Red;
const C_ENEMY_SLOW: Color = Color::Green;
const C_SHOT_PLAYER: Color = Color::Cyan;
const C_SHOT_FAST: Color = Color::Magenta;
const C_SHOT_SLOW: Color = Color::Yellow;
const C_HINT: Color = Color::DarkGrey;
const C_MESSAGE: Color = Color::Cyan;

/// Maps board units onto terminal cells inside the border.
struct Viewport {
    scale_x: f32,
    scale_y: f32,
    width: u16,
    height: u16,
}

impl Viewport {
    fn new(engine: &GameEngine, width: u16, height: u16) -> Self {
        let cols = width.saturating_sub(2).max(1) as f32;
        let rows = height.saturating_sub(4).max(1) as f32;
        Self {
            scale_x: cols / engine.game_width(),
            scale_y: rows / engine.game_height(),
            width,
            height,
        }
    }

    /// Top-left cell and size in cells for an entity.
    fn cells(&self, e: &Entity) -> (u16, u16, u16, u16) {
        let col = 1 + (e.position.x * self.scale_x) as u16;
        let row = 2 + (e.position.y * self.scale_y) as u16;
        let w = ((e.width * self.scale_x).round() as u16).max(1);
        let h = ((e.height * self.scale_y).round() as u16).max(1);
        let max_col = self.width.saturating_sub(2);
        let max_row = self.height.saturating_sub(3);
        (col.min(max_col), row.min(max_row), w, h)
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Render one complete frame.
pub fn render<W: Write>(
    out: &mut W,
    engine: &GameEngine,
    hud: &Hud,
    difficulty: Difficulty,
) -> std::io::Result<()> {
    let (width, height) = terminal::size()?;
    let view = Viewport::new(engine, width, height);

    out.queue(terminal::Clear(terminal::ClearType::All))?;

    draw_border(out, width, height)?;
    draw_hud(out, engine, hud, difficulty, width)?;

    for (_, entity) in engine.renderables() {
        if entity.is_alive() {
            draw_entity(out, entity, &view)?;
        }
    }

    draw_controls_hint(out, height)?;

    if engine.is_game_over() {
        draw_game_over(out, engine, width, height)?;
    }

    // Park cursor in a harmless spot and flush
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, height.saturating_sub(1)))?;
    out.flush()?;
    Ok(())
}

// ── Border ────────────────────────────────────────────────────────────────────

fn draw_border<W: Write>(out: &mut W, width: u16, height: u16) -> std::io::Result<()> {
    let w = width as usize;

    out.queue(style::SetForegroundColor(C_BORDER))?;

    out.queue(cursor::MoveTo(0, 1))?;
    out.queue(Print(format!("┌{}┐", "─".repeat(w.saturating_sub(2)))))?;

    out.queue(cursor::MoveTo(0, height.saturating_sub(2)))?;
    out.queue(Print(format!("└{}┘", "─".repeat(w.saturating_sub(2)))))?;

    for row in 2..height.saturating_sub(2) {
        out.queue(cursor::MoveTo(0, row))?;
        out.queue(Print("│"))?;
        out.queue(cursor::MoveTo(width.saturating_sub(1), row))?;
        out.queue(Print("│"))?;
    }

    Ok(())
}

// ── HUD (row 0) ───────────────────────────────────────────────────────────────

fn draw_hud<W: Write>(
    out: &mut W,
    engine: &GameEngine,
    hud: &Hud,
    difficulty: Difficulty,
    width: u16,
) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, 0))?;
    out.queue(style::SetForegroundColor(C_HUD_SCORE))?;
    out.queue(Print(format!("Score:{:>6}", hud.score)))?;

    let secs = hud.elapsed.as_secs();
    out.queue(style::SetForegroundColor(C_HUD_TIME))?;
    out.queue(Print(format!("  Time: {}:{:02}", secs / 60, secs % 60)))?;

    let lives = engine.player().map_or(0, |p| p.health.max(0)) as usize;
    out.queue(style::SetForegroundColor(C_HUD_LIVES))?;
    out.queue(Print(format!("  {}", "♥".repeat(lives))))?;

    let level_str = format!("[ {} ]", difficulty.name().to_uppercase());
    out.queue(cursor::MoveTo(
        (width / 2).saturating_sub(level_str.len() as u16 / 2),
        0,
    ))?;
    out.queue(style::SetForegroundColor(Color::White))?;
    out.queue(Print(&level_str))?;

    if let Some(message) = hud.message() {
        let col = width.saturating_sub(message.chars().count() as u16 + 1);
        out.queue(cursor::MoveTo(col, 0))?;
        out.queue(style::SetForegroundColor(C_MESSAGE))?;
        out.queue(Print(message))?;
    } else if engine.has_snapshot() {
        out.queue(cursor::MoveTo(width.saturating_sub(7), 0))?;
        out.queue(style::SetForegroundColor(C_HINT))?;
        out.queue(Print("[SAVE]"))?;
    }

    Ok(())
}

// ── Entities ──────────────────────────────────────────────────────────────────

fn draw_entity<W: Write>(out: &mut W, entity: &Entity, view: &Viewport) -> std::io::Result<()> {
    let fast = entity.strategy().is_some_and(|s| s.is_fast());
    let (glyph, color) = match entity.kind() {
        EntityKind::Player => ("▲", C_PLAYER),
        EntityKind::Enemy => ("▼", if fast { C_ENEMY_FAST } else { C_ENEMY_SLOW }),
        EntityKind::Bunker => (
            "█",
            match entity.bunker_state() {
                Some(BunkerState::Green) => Color::Green,
                Some(BunkerState::Yellow) => Color::Yellow,
                _ => Color::Red,
            },
        ),
        EntityKind::PlayerProjectile => ("║", C_SHOT_PLAYER),
        EntityKind::EnemyProjectile => ("↓", if fast { C_SHOT_FAST } else { C_SHOT_SLOW }),
    };

    // Projectiles are a single cell whatever the scale.
    let (col, row, w, h) = view.cells(entity);
    let (w, h) = match entity.kind() {
        EntityKind::PlayerProjectile | EntityKind::EnemyProjectile => (1, 1),
        _ => (w, h),
    };
    let line = glyph.repeat(w as usize);

    out.queue(style::SetForegroundColor(color))?;
    for dy in 0..h {
        let y = row + dy;
        if y >= view.height.saturating_sub(2) {
            break;
        }
        out.queue(cursor::MoveTo(col, y))?;
        out.queue(Print(&line))?;
    }
    Ok(())
}

// ── Controls hint (last row) ──────────────────────────────────────────────────

fn draw_controls_hint<W: Write>(out: &mut W, height: u16) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, height.saturating_sub(1)))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(
        "← → / A D : Move  SPACE : Shoot  S : Save  L : Load  1-4 : Cheats  Q : Quit",
    ))?;
    Ok(())
}

// ── Game-over overlay ─────────────────────────────────────────────────────────

fn draw_game_over<W: Write>(
    out: &mut W,
    engine: &GameEngine,
    width: u16,
    height: u16,
) -> std::io::Result<()> {
    let won = engine.player().is_some_and(|p| p.is_alive());
    let (banner, color) = if won {
        ("║     YOU  WIN     ║", Color::Green)
    } else {
        ("║    GAME  OVER    ║", Color::Red)
    };
    let score_line = format!("Final Score: {}", engine.score());
    let lines: &[(&str, Color)] = &[
        ("╔══════════════════╗", color),
        (banner, color),
        ("╚══════════════════╝", color),
        (&score_line, Color::Yellow),
        ("R - Play Again  Q - Quit", Color::White),
    ];

    let cx = width / 2;
    let start_row = (height / 2).saturating_sub(lines.len() as u16 / 2);

    for (i, (msg, color)) in lines.iter().enumerate() {
        let row = start_row + i as u16;
        let col = cx.saturating_sub(msg.chars().count() as u16 / 2);
        out.queue(cursor::MoveTo(col, row))?;
        out.queue(style::SetForegroundColor(*color))?;
        out.queue(Print(*msg))?;
    }

    Ok(())
}

mod display;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    style::{self, Color, Print},
    terminal, ExecutableCommand, QueueableCommand,
};
use rand::thread_rng;
use tracing_subscriber::EnvFilter;

use invaders::config::{Difficulty, DifficultyLevel};
use invaders::engine::GameEngine;
use invaders::entities::EntityId;
use invaders::events::{EventPublisher, ScoreEvent};
use invaders::observer::GameObserver;

/// Tick period of the game loop (≈58 Hz).
const FRAME: Duration = Duration::from_millis(17);

/// A key is considered "held" if its last press/repeat event arrived within
/// this many frames. Covers terminals that don't emit key-release events:
/// the OS key-repeat rate is ≥ 15 Hz, so 8 frames (≈136 ms) is always
/// refreshed before expiry.
const HOLD_WINDOW: u64 = 8;

/// Frames a HUD message stays on screen.
const MESSAGE_FRAMES: u32 = 90;

#[derive(Debug, Parser)]
#[command(name = "invaders", about = "Terminal Space Invaders")]
struct Cli {
    /// Skip the menu and start at this difficulty (easy, medium, hard).
    #[arg(short, long)]
    difficulty: Option<Difficulty>,

    /// Directory holding config_<difficulty>.json files. Builtin levels are
    /// used for any file that is missing.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Where to write logs. Defaults to invaders.log in the temp directory.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run this many ticks without a terminal and print a summary.
    #[arg(long, value_name = "TICKS")]
    headless: Option<u64>,
}

// ── HUD state fed by the engine ───────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Hud {
    pub score: u32,
    pub elapsed: Duration,
    message: Option<(String, u32)>,
}

impl Hud {
    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(m, _)| m.as_str())
    }

    fn flash(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), MESSAGE_FRAMES));
    }

    fn tick(&mut self) {
        if let Some((_, frames)) = &mut self.message {
            *frames = frames.saturating_sub(1);
            if *frames == 0 {
                self.message = None;
            }
        }
    }
}

impl GameObserver for Hud {
    fn time_changed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    fn score_changed(&mut self, score: u32) {
        self.score = score;
    }

    fn renderables_removed(&mut self, removed: &[EntityId]) {
        self.flash(format!("Rolled back ({} dropped)", removed.len()));
    }
}

// ── Logging ───────────────────────────────────────────────────────────────────

/// Logs go to a file; stdout belongs to the game screen.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file: {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn new_engine(cli: &Cli, difficulty: Difficulty) -> Result<GameEngine> {
    let level = DifficultyLevel::load_or_builtin(cli.config_dir.as_deref(), difficulty)
        .with_context(|| format!("failed to load {difficulty} level"))?;
    Ok(GameEngine::new(&level, EventPublisher::<ScoreEvent>::new()))
}

// ── Headless run ──────────────────────────────────────────────────────────────

fn run_headless(cli: &Cli, ticks: u64) -> Result<()> {
    let difficulty = cli.difficulty.unwrap_or(Difficulty::Medium);
    let mut engine = new_engine(cli, difficulty)?;

    let intercepted = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&intercepted);
    engine
        .score_events_mut()
        .subscribe(move |_: &ScoreEvent| *counter.borrow_mut() += 1);

    let mut rng = thread_rng();
    let mut ran = 0;
    for _ in 0..ticks {
        engine.shoot_pressed();
        engine.step(FRAME.as_secs_f32(), &mut rng);
        engine.reconcile();
        ran += 1;
        if engine.is_game_over() {
            break;
        }
    }

    println!("Headless run ({difficulty}) finished after {ran} ticks.");
    println!("  Score:         {}", engine.score());
    println!("  Time:          {:.2}s", engine.time_elapsed());
    println!("  Interceptions: {}", intercepted.borrow());
    println!("  Entities:      {}", engine.renderables().count());
    println!("  Game over:     {}", engine.is_game_over());
    Ok(())
}

// ── Menu ──────────────────────────────────────────────────────────────────────

enum MenuResult {
    Start(Difficulty),
    Quit,
}

fn show_menu<W: Write>(out: &mut W, rx: &mpsc::Receiver<Event>) -> Result<MenuResult> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let (width, height) = terminal::size()?;
    let cx = width / 2;
    let cy = height / 2;

    let title = "★  SPACE  INVADERS  ★";
    out.queue(cursor::MoveTo(
        cx.saturating_sub(title.chars().count() as u16 / 2),
        cy.saturating_sub(6),
    ))?;
    out.queue(style::SetForegroundColor(Color::Cyan))?;
    out.queue(Print(title))?;

    out.queue(cursor::MoveTo(cx.saturating_sub(10), cy.saturating_sub(3)))?;
    out.queue(style::SetForegroundColor(Color::White))?;
    out.queue(Print("Select difficulty:"))?;

    let options: &[(&str, &str, Color, &str)] = &[
        ("1", "Easy  ", Color::Green, "Two rows, slow shots"),
        ("2", "Normal", Color::Yellow, "Mixed fast and slow shots"),
        ("3", "Hard  ", Color::Red, "Four rows, mostly fast shots"),
    ];

    for (i, (key, label, color, desc)) in options.iter().enumerate() {
        let row = cy.saturating_sub(1) + i as u16;
        out.queue(cursor::MoveTo(cx.saturating_sub(10), row))?;
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(format!("[{}] ", key)))?;
        out.queue(style::SetForegroundColor(*color))?;
        out.queue(Print(format!("{:<8}", label)))?;
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(format!(" — {}", desc)))?;
    }

    out.queue(cursor::MoveTo(cx.saturating_sub(10), cy + 4))?;
    out.queue(style::SetForegroundColor(Color::DarkGrey))?;
    out.queue(Print("Shooting an enemy shot: fast +2, slow +1"))?;

    out.queue(style::ResetColor)?;
    out.flush()?;

    // Block until the user makes a choice
    loop {
        let code = match rx.recv() {
            Ok(Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            })) => code,
            Ok(_) => continue,
            // Input thread is gone; nothing more can be selected.
            Err(_) => return Ok(MenuResult::Quit),
        };
        match code {
            KeyCode::Char('1') => return Ok(MenuResult::Start(Difficulty::Easy)),
            KeyCode::Char('2') => return Ok(MenuResult::Start(Difficulty::Medium)),
            KeyCode::Char('3') => return Ok(MenuResult::Start(Difficulty::Hard)),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                return Ok(MenuResult::Quit);
            }
            _ => {}
        }
    }
}

// ── Game loop ─────────────────────────────────────────────────────────────────

/// Returns true if `key` was seen within the last `HOLD_WINDOW` frames.
fn is_held(key_frame: &HashMap<KeyCode, u64>, key: &KeyCode, frame: u64) -> bool {
    key_frame
        .get(key)
        .map(|&last| frame.saturating_sub(last) <= HOLD_WINDOW)
        .unwrap_or(false)
}

/// Turns "is the key held this frame" into the engine's press/release edges.
#[derive(Default)]
struct Direction {
    left: bool,
    right: bool,
}

impl Direction {
    fn apply(&mut self, engine: &mut GameEngine, left: bool, right: bool) {
        if left != self.left {
            if left {
                engine.left_pressed();
            } else {
                engine.left_released();
            }
            self.left = left;
        }
        if right != self.right {
            if right {
                engine.right_pressed();
            } else {
                engine.right_released();
            }
            self.right = right;
        }
    }
}

/// Returns `true` → quit program, `false` → back to menu.
///
/// Held keys are tracked the same way on every terminal: `key_frame` records
/// the frame of the last press/repeat for each key, and a release event (on
/// terminals that send them) removes the key at once.
fn game_loop<W: Write>(
    out: &mut W,
    engine: &mut GameEngine,
    hud: &Rc<RefCell<Hud>>,
    difficulty: Difficulty,
    rx: &mpsc::Receiver<Event>,
) -> Result<bool> {
    let mut rng = thread_rng();

    let mut key_frame: HashMap<KeyCode, u64> = HashMap::new();
    let mut direction = Direction::default();
    let mut frame: u64 = 0;

    loop {
        let frame_start = Instant::now();
        frame += 1;

        while let Ok(ev) = rx.try_recv() {
            let Event::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) = ev
            else {
                continue;
            };
            match kind {
                KeyEventKind::Press => {
                    key_frame.insert(code.clone(), frame);
                    match code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                            return Ok(true);
                        }
                        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                            return Ok(true);
                        }
                        KeyCode::Char('r') | KeyCode::Char('R') if engine.is_game_over() => {
                            return Ok(false);
                        }
                        KeyCode::Char('s') | KeyCode::Char('S') => {
                            engine.save_state_to_memento();
                            hud.borrow_mut().flash("Saved");
                        }
                        KeyCode::Char('l') | KeyCode::Char('L') => {
                            if !engine.restore_state_from_memento() {
                                hud.borrow_mut().flash("Nothing saved");
                            }
                        }
                        KeyCode::Char('1') => {
                            engine.cheat_remove_fast_projectiles();
                        }
                        KeyCode::Char('2') => {
                            engine.cheat_remove_slow_projectiles();
                        }
                        KeyCode::Char('3') => {
                            engine.cheat_remove_enemies_with_fast_projectiles();
                        }
                        KeyCode::Char('4') => {
                            engine.cheat_remove_enemies_with_slow_projectiles();
                        }
                        _ => {}
                    }
                }
                KeyEventKind::Repeat => {
                    key_frame.insert(code.clone(), frame);
                }
                KeyEventKind::Release => {
                    key_frame.remove(&code);
                }
            }
        }

        if !engine.is_game_over() {
            let left = is_held(&key_frame, &KeyCode::Left, frame)
                || is_held(&key_frame, &KeyCode::Char('a'), frame)
                || is_held(&key_frame, &KeyCode::Char('A'), frame);
            let right = is_held(&key_frame, &KeyCode::Right, frame)
                || is_held(&key_frame, &KeyCode::Char('d'), frame)
                || is_held(&key_frame, &KeyCode::Char('D'), frame);
            direction.apply(engine, left, right);

            // The engine enforces the shot cooldown.
            if is_held(&key_frame, &KeyCode::Char(' '), frame) {
                engine.shoot_pressed();
            }

            engine.update(&mut rng);
            engine.reconcile();
        }

        hud.borrow_mut().tick();
        display::render(out, engine, &hud.borrow(), difficulty)?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("invaders.log"));
    init_logging(&log_path)?;

    if let Some(ticks) = cli.headless {
        return run_headless(&cli, ticks);
    }

    let mut out = BufWriter::new(stdout());

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;

    // Request key-release (and key-repeat) events from the terminal.
    // Kitty-protocol terminals support this; others fall back gracefully.
    let keyboard_enhanced = out
        .execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))
        .is_ok();

    // Dedicate a thread to blocking event reads so the game loop never
    // blocks on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break; // receiver dropped → program exiting
            }
        }
    });

    let result = run(&mut out, &cli, &rx);

    // Always restore the terminal
    if keyboard_enhanced {
        let _ = out.execute(PopKeyboardEnhancementFlags);
    }
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result
}

fn run<W: Write>(out: &mut W, cli: &Cli, rx: &mpsc::Receiver<Event>) -> Result<()> {
    let mut preset = cli.difficulty;

    loop {
        let difficulty = match preset.take() {
            Some(difficulty) => difficulty,
            None => match show_menu(out, rx)? {
                MenuResult::Quit => break,
                MenuResult::Start(difficulty) => difficulty,
            },
        };

        let mut engine = new_engine(cli, difficulty)?;
        let hud = Rc::new(RefCell::new(Hud::default()));
        engine.add_observer(Rc::clone(&hud));
        tracing::info!(%difficulty, "game started");

        let quit = game_loop(out, &mut engine, &hud, difficulty, rx)?;
        tracing::info!(score = engine.score(), "game ended");

        if quit {
            break;
        }
    }
    Ok(())
}

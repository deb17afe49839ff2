#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line driver for the Tilerunner simulation.
//!
//! Loads a TOML level, runs the fixed-step loop for a requested amount of
//! simulated time with optionally scripted player input, and presents frames
//! through an ASCII renderer.

use std::{fs, io::Write, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use tilerunner_core::{Behavior, Command, EntityKind, Event, GameResult, Vec2};
use tilerunner_rendering::{Presenter, Scene};
use tilerunner_system_ai::AiDispatcher;
use tilerunner_system_bootstrap::{Bootstrap, LevelSpec};
use tilerunner_system_fixed_step::{FixedStep, DEFAULT_STEP};
use tilerunner_world::{apply, query, World};

/// Horizontal direction held for the player during the run.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    /// Hold movement toward decreasing x.
    Left,
    /// Hold movement toward increasing x.
    Right,
}

impl Direction {
    const fn intent(self) -> Vec2 {
        match self {
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// Command-line arguments for the Tilerunner driver.
#[derive(Debug, Parser)]
#[command(name = "tilerunner", about = "Headless fixed-step platformer driver")]
struct Args {
    /// Path to the TOML level file.
    level: PathBuf,

    /// Amount of simulated time to run, in seconds.
    #[arg(long, default_value_t = 10.0)]
    seconds: f32,

    /// Wall-clock frame duration fed to the scheduler, in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Cap on sub-steps drained per frame; unset means full catch-up.
    #[arg(long)]
    max_steps_per_frame: Option<u32>,

    /// Hold a horizontal direction for the player for the whole run.
    #[arg(long, value_enum)]
    hold: Option<Direction>,

    /// Request a player jump every N sub-steps.
    #[arg(long)]
    jump_every: Option<u32>,

    /// Print an ASCII frame every N sub-steps; 0 prints only the last frame.
    #[arg(long, default_value_t = 0)]
    render_every: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let text = fs::read_to_string(&args.level)
        .with_context(|| format!("reading level file {}", args.level.display()))?;
    let level: LevelSpec = toml::from_str(&text)
        .with_context(|| format!("parsing level file {}", args.level.display()))?;
    if let Some(name) = level.name.as_deref() {
        info!("loaded level: {name}");
    }

    let mut world = World::new();
    let mut events = Vec::new();
    Bootstrap
        .run(&level, &mut world, &mut events)
        .context("bootstrapping level")?;
    if let Some(reason) = events.iter().find_map(|event| match event {
        Event::TileMapRejected { reason } => Some(*reason),
        _ => None,
    }) {
        bail!("tile map rejected: {reason:?}");
    }
    events.clear();

    run(&args, &mut world)
}

fn run(args: &Args, world: &mut World) -> Result<()> {
    if args.frame_ms == 0 {
        bail!("--frame-ms must be positive");
    }

    let mut scheduler = FixedStep::new(DEFAULT_STEP);
    if let Some(cap) = args.max_steps_per_frame {
        scheduler = scheduler.with_max_steps_per_frame(cap);
    }

    let frame = Duration::from_millis(args.frame_ms);
    let total_substeps = (args.seconds.max(0.0) / DEFAULT_STEP.as_secs_f32()).round() as u64;

    let mut dispatcher = AiDispatcher::new();
    let mut presenter = AsciiPresenter::stdout();
    let mut events = Vec::new();
    let mut executed = 0_u64;
    let mut ended = false;

    'frames: while executed < total_substeps && !ended {
        for _ in 0..scheduler.advance(frame) {
            plan_substep(world, &mut dispatcher, args, executed, &mut events);
            apply(
                world,
                Command::Step {
                    dt: scheduler.step(),
                },
                &mut events,
            );
            executed += 1;
            ended = drain_events(&mut events);

            if args.render_every > 0 && executed % u64::from(args.render_every) == 0 {
                present_frame(world, &mut presenter)?;
            }
            if ended || executed >= total_substeps {
                break 'frames;
            }
        }
    }

    present_frame(world, &mut presenter)?;

    let result = query::game_result(world);
    let simulated = DEFAULT_STEP.as_secs_f32() * executed as f32;
    info!("ran {executed} sub-steps ({simulated:.2}s simulated)");
    println!(
        "outcome: {}",
        match result {
            GameResult::InProgress => "in progress",
            GameResult::Won => "won",
            GameResult::Lost => "lost",
        }
    );
    Ok(())
}

/// Emits AI commands and the scripted player input for one sub-step.
fn plan_substep(
    world: &mut World,
    dispatcher: &mut AiDispatcher,
    args: &Args,
    executed: u64,
    events: &mut Vec<Event>,
) {
    let view = query::entity_view(world);
    let mut commands = Vec::new();
    dispatcher.plan(&view, query::tile_map_view(world), &mut commands);

    if let Some(player) = query::player_id(world) {
        if let Some(direction) = args.hold {
            commands.push(Command::SetMovementIntent {
                entity: player,
                intent: direction.intent(),
            });
        }
        if let Some(period) = args.jump_every.filter(|&period| period > 0) {
            if executed % u64::from(period) == 0 {
                commands.push(Command::RequestJump { entity: player });
            }
        }
    }

    for command in commands {
        apply(world, command, events);
    }
}

/// Logs and discards pending events. Returns `true` once the game has ended.
fn drain_events(events: &mut Vec<Event>) -> bool {
    let mut ended = false;
    for event in events.drain(..) {
        match event {
            Event::GameEnded { result } => {
                info!("game ended: {result:?}");
                ended = true;
            }
            Event::PlayerDefeated => info!("player defeated"),
            Event::EnemyDefeated { entity } => info!("enemy defeated: {}", entity.get()),
            Event::BulletFired { shooter, bullet } => {
                debug!("shooter {} fired bullet {}", shooter.get(), bullet.get());
            }
            Event::BulletSpent { bullet } => debug!("bullet {} spent", bullet.get()),
            Event::EntityJumped { entity } => debug!("entity {} jumped", entity.get()),
            Event::Stepped { .. }
            | Event::TileMapConfigured { .. }
            | Event::TileMapRejected { .. }
            | Event::EntitySpawned { .. } => {}
        }
    }
    ended
}

fn present_frame(world: &World, presenter: &mut AsciiPresenter<impl Write>) -> Result<()> {
    let scene = Scene::capture(
        query::tile_map_view(world),
        &query::entity_view(world),
        query::game_result(world),
    );
    presenter.present(&scene)
}

/// Presents scenes as a character grid, one cell per tile.
struct AsciiPresenter<W> {
    out: W,
}

impl AsciiPresenter<std::io::Stdout> {
    fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> Presenter for AsciiPresenter<W> {
    fn present(&mut self, scene: &Scene) -> Result<()> {
        let columns = scene.tile_layer.columns as usize;
        let rows = scene.tile_layer.rows as usize;
        let mut grid = vec![b'.'; columns * rows];

        for row in 0..scene.tile_layer.rows {
            for column in 0..scene.tile_layer.columns {
                if scene
                    .tile_layer
                    .code_at(column, row)
                    .is_some_and(|code| code.is_solid())
                {
                    grid[row as usize * columns + column as usize] = b'#';
                }
            }
        }

        for sprite in &scene.sprites {
            let tile = scene.tile_layer.tile_size;
            if tile <= 0.0 || sprite.position.x < 0.0 || sprite.position.y > 0.0 {
                continue;
            }
            let column = (sprite.position.x / tile).floor() as usize;
            let row = (-sprite.position.y / tile).floor() as usize;
            if column < columns && row < rows {
                grid[row * columns + column] = sprite_glyph(sprite.kind, sprite.behavior);
            }
        }

        for row in grid.chunks(columns.max(1)) {
            self.out.write_all(row)?;
            self.out.write_all(b"\n")?;
        }
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

const fn sprite_glyph(kind: EntityKind, behavior: Option<Behavior>) -> u8 {
    match (kind, behavior) {
        (EntityKind::Player, _) => b'P',
        (EntityKind::Platform, _) => b'=',
        (EntityKind::Enemy, Some(Behavior::Bullet { .. })) => b'*',
        (EntityKind::Enemy, Some(Behavior::Flyer { .. })) => b'f',
        (EntityKind::Enemy, Some(Behavior::Shooter { .. })) => b's',
        (EntityKind::Enemy, Some(Behavior::Guard)) => b'g',
        (EntityKind::Enemy, _) => b'w',
    }
}

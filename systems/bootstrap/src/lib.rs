#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Converts declarative level descriptions into world command batches.
//!
//! Adapters deserialize a [`LevelSpec`] from TOML and hand it to
//! [`Bootstrap`], which validates it up front and produces the commands that
//! configure the map, the playable region, and the entity roster. The world
//! still performs its own map validation on apply; the checks here exist to
//! fail fast with a descriptive error before any state is touched.

use serde::Deserialize;
use thiserror::Error;
use tilerunner_core::{Command, EnemyKind, Event, TileCode, Vec2};
use tilerunner_world::{apply, World};

/// Declarative level description deserialized from a level file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelSpec {
    /// Human-readable level name shown by adapters.
    #[serde(default)]
    pub name: Option<String>,
    /// Tile grid configuration.
    pub map: MapSpec,
    /// Player starting placement.
    pub player: PlayerSpec,
    /// Playable region; the world default applies when absent.
    #[serde(default)]
    pub region: Option<RegionSpec>,
    /// Static platforms beyond the tile grid.
    #[serde(default)]
    pub platforms: Vec<PlatformSpec>,
    /// Enemy roster.
    #[serde(default)]
    pub enemies: Vec<EnemySpec>,
}

/// Tile grid portion of a level description.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapSpec {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Side length of each square tile in world units.
    pub tile_size: f32,
    /// Row-major tile codes, `columns * rows` entries.
    pub tiles: Vec<u16>,
}

/// Player starting placement.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerSpec {
    /// World-space center of the player's bounding box.
    pub position: [f32; 2],
}

/// Axis-aligned rectangle the player must stay inside.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSpec {
    /// Lower-left corner.
    pub min: [f32; 2],
    /// Upper-right corner.
    pub max: [f32; 2],
}

/// Static platform placement.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformSpec {
    /// World-space center of the platform.
    pub position: [f32; 2],
    /// Half-width and half-height of the platform.
    pub half_extents: [f32; 2],
}

/// Enemy placement.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnemySpec {
    /// Archetype deciding tuning constants and behavior.
    pub kind: EnemyKind,
    /// World-space center of the enemy's bounding box.
    pub position: [f32; 2],
}

/// Reasons a level description is rejected before any command is produced.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    /// A level without enemies would be won on the first sub-step.
    #[error("level defines no enemies")]
    NoEnemies,
    /// The flat tile array does not match the declared dimensions.
    #[error("tile grid holds {actual} codes but {columns}x{rows} requires {expected}")]
    TileCountMismatch {
        /// Declared column count.
        columns: u32,
        /// Declared row count.
        rows: u32,
        /// Number of codes the dimensions call for.
        expected: u32,
        /// Number of codes actually provided.
        actual: u32,
    },
    /// The playable region corners are inverted.
    #[error("playable region min must not exceed max on either axis")]
    InvertedRegion,
}

/// Pure system that turns level descriptions into world setup commands.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Validates the level and produces the setup command batch.
    ///
    /// Command order is map, region, platforms, enemies, player, so entity
    /// identifiers are assigned deterministically from the file order.
    pub fn commands(&self, level: &LevelSpec) -> Result<Vec<Command>, LevelError> {
        validate(level)?;

        let mut commands = Vec::with_capacity(3 + level.platforms.len() + level.enemies.len());
        commands.push(Command::ConfigureTileMap {
            columns: level.map.columns,
            rows: level.map.rows,
            tile_size: level.map.tile_size,
            tiles: level.map.tiles.iter().copied().map(TileCode::new).collect(),
        });
        if let Some(region) = level.region {
            commands.push(Command::SetPlayableRegion {
                min: Vec2::from_array(region.min),
                max: Vec2::from_array(region.max),
            });
        }
        for platform in &level.platforms {
            commands.push(Command::SpawnPlatform {
                position: Vec2::from_array(platform.position),
                half_extents: Vec2::from_array(platform.half_extents),
            });
        }
        for enemy in &level.enemies {
            commands.push(Command::SpawnEnemy {
                kind: enemy.kind,
                position: Vec2::from_array(enemy.position),
            });
        }
        commands.push(Command::SpawnPlayer {
            position: Vec2::from_array(level.player.position),
        });

        Ok(commands)
    }

    /// Validates the level and applies its setup commands to the world.
    pub fn run(
        &self,
        level: &LevelSpec,
        world: &mut World,
        out_events: &mut Vec<Event>,
    ) -> Result<(), LevelError> {
        for command in self.commands(level)? {
            apply(world, command, out_events);
        }
        Ok(())
    }
}

fn validate(level: &LevelSpec) -> Result<(), LevelError> {
    if level.enemies.is_empty() {
        return Err(LevelError::NoEnemies);
    }

    let expected = level.map.columns.saturating_mul(level.map.rows);
    let actual = u32::try_from(level.map.tiles.len()).unwrap_or(u32::MAX);
    if expected != actual {
        return Err(LevelError::TileCountMismatch {
            columns: level.map.columns,
            rows: level.map.rows,
            expected,
            actual,
        });
    }

    if let Some(region) = level.region {
        if region.min[0] > region.max[0] || region.min[1] > region.max[1] {
            return Err(LevelError::InvertedRegion);
        }
    }

    Ok(())
}

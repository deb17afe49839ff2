#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tilerunner kernel.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what actually happened. Systems consume immutable snapshot
//! views and respond exclusively with new command batches.

use std::time::Duration;

pub use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Unique identifier assigned to an entity by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Broad classification that decides how an entity participates in play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Static solid obstacle; blocks movers but never moves itself.
    Platform,
    /// The distinguished player-controlled entity.
    Player,
    /// Hostile entity driven by the AI dispatcher. Bullets count as enemies.
    Enemy,
}

/// Spawnable enemy archetypes.
///
/// A shooter spawn also allocates its bullet; bullets are never spawned
/// directly, so they do not appear here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Patrols back and forth, reversing at walls and drop-offs.
    Walker,
    /// Holds position until the player comes within sight range.
    Guard,
    /// Orbits a stored anchor point, unaffected by gravity.
    Flyer,
    /// Stationary; periodically fires its owned bullet at the player.
    Shooter,
}

/// Behavioral state reported by enemy entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AiState {
    /// Not currently pursuing or patrolling.
    Idle,
    /// Patrolling or otherwise moving without a target.
    Walking,
    /// Actively pursuing or attacking the player.
    Attacking,
}

/// Horizontal orientation of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Oriented toward decreasing x.
    Left,
    /// Oriented toward increasing x.
    Right,
}

impl Facing {
    /// Returns the opposite orientation.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit sign of the orientation along the x axis.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Side of an axis-aligned bounding box involved in a contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Upward-facing side (positive y).
    Top,
    /// Downward-facing side (negative y).
    Bottom,
    /// Side facing decreasing x.
    Left,
    /// Side facing increasing x.
    Right,
}

impl Side {
    /// Returns the side seen by the other party of the same contact.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Per-side contact flags recorded by the collision resolver.
///
/// Flags reflect only the most recent sub-step; the resolver clears them
/// before every resolution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContactFlags {
    /// Contact on the entity's top side.
    pub top: bool,
    /// Contact on the entity's bottom side.
    pub bottom: bool,
    /// Contact on the entity's left side.
    pub left: bool,
    /// Contact on the entity's right side.
    pub right: bool,
}

impl ContactFlags {
    /// Clears all four flags.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Marks the provided side as touched.
    pub fn set(&mut self, side: Side) {
        match side {
            Side::Top => self.top = true,
            Side::Bottom => self.bottom = true,
            Side::Left => self.left = true,
            Side::Right => self.right = true,
        }
    }

    /// Reports whether any side is touched.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.top || self.bottom || self.left || self.right
    }
}

/// Single cell value within the tile map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCode(u16);

impl TileCode {
    /// The empty, non-solid tile.
    pub const EMPTY: Self = Self(0);

    /// Creates a tile code from its raw numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the raw numeric value of the code.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// Reports whether the code participates in collision blocking.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.0 != 0
    }
}

/// Reasons a tile map configuration may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapError {
    /// The grid has zero columns or zero rows.
    ZeroDimension,
    /// The flat tile array does not match `columns * rows`.
    DimensionMismatch {
        /// Number of codes the dimensions call for.
        expected: u32,
        /// Number of codes actually provided.
        actual: u32,
    },
    /// A tile code exceeds the supported palette.
    UnknownTileCode {
        /// The offending code value.
        code: u16,
        /// Row-major index at which it appeared.
        index: u32,
    },
    /// The tile side length is not a positive finite number.
    InvalidTileSize,
}

/// Overall outcome of a play session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameResult {
    /// The session is still being simulated.
    InProgress,
    /// Every enemy has been deactivated.
    Won,
    /// The player was deactivated or left the playable region.
    Lost,
}

/// Behavior variant attached to an AI-driven entity.
///
/// Cross-entity relationships are explicit: a shooter owns its bullet by
/// identifier and the bullet knows its owner, so no positional convention
/// ties the two together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Behavior {
    /// Patrols horizontally, reversing at walls and drop-offs.
    Walker,
    /// Idles until the player enters sight range, then pursues.
    Guard,
    /// Orbits a fixed anchor point.
    Flyer {
        /// World-space point the orbit is centered on.
        anchor: Vec2,
    },
    /// Stationary turret that fires its owned bullet.
    Shooter {
        /// The bullet entity this shooter activates when firing.
        bullet: EntityId,
    },
    /// Projectile in flight at constant velocity.
    Bullet {
        /// The shooter that owns this bullet.
        owner: EntityId,
    },
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the tile map with the provided grid.
    ConfigureTileMap {
        /// Number of tile columns.
        columns: u32,
        /// Number of tile rows.
        rows: u32,
        /// Side length of each square tile in world units.
        tile_size: f32,
        /// Row-major tile codes, `columns * rows` entries.
        tiles: Vec<TileCode>,
    },
    /// Defines the rectangle the player must stay within.
    SetPlayableRegion {
        /// Lower-left corner of the region.
        min: Vec2,
        /// Upper-right corner of the region.
        max: Vec2,
    },
    /// Creates (or replaces) the player entity at the given position.
    SpawnPlayer {
        /// World-space center of the player's bounding box.
        position: Vec2,
    },
    /// Creates a static solid platform entity.
    SpawnPlatform {
        /// World-space center of the platform.
        position: Vec2,
        /// Half-width and half-height of the platform's bounding box.
        half_extents: Vec2,
    },
    /// Creates an enemy of the given archetype.
    SpawnEnemy {
        /// Archetype deciding tuning constants and behavior.
        kind: EnemyKind,
        /// World-space center of the enemy's bounding box.
        position: Vec2,
    },
    /// Sets the movement intent consumed by the next sub-step.
    SetMovementIntent {
        /// Entity whose intent is updated.
        entity: EntityId,
        /// Direct control input, separate from gravity-driven velocity.
        intent: Vec2,
    },
    /// Updates the horizontal orientation of an entity.
    SetFacing {
        /// Entity whose facing is updated.
        entity: EntityId,
        /// New orientation.
        facing: Facing,
    },
    /// Updates the behavioral state of an AI-driven entity.
    SetAiState {
        /// Entity whose state is updated.
        entity: EntityId,
        /// New behavioral state.
        state: AiState,
    },
    /// Requests a jump; honored only while resting on the map or on a
    /// solid entity.
    RequestJump {
        /// Entity attempting to jump.
        entity: EntityId,
    },
    /// Requests that a shooter activate its owned bullet.
    Fire {
        /// The shooter entity firing.
        shooter: EntityId,
    },
    /// Executes exactly one fixed physics sub-step.
    Step {
        /// Fixed duration of the sub-step.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a tile map was installed.
    TileMapConfigured {
        /// Number of tile columns.
        columns: u32,
        /// Number of tile rows.
        rows: u32,
        /// Side length of each square tile in world units.
        tile_size: f32,
    },
    /// Reports that a tile map configuration was rejected.
    TileMapRejected {
        /// Specific reason the configuration failed.
        reason: MapError,
    },
    /// Confirms that an entity was created.
    EntitySpawned {
        /// Identifier assigned by the world.
        entity: EntityId,
        /// Broad classification of the new entity.
        kind: EntityKind,
    },
    /// Indicates that one fixed sub-step completed.
    Stepped {
        /// Duration of simulated time that elapsed.
        dt: Duration,
    },
    /// Confirms that a jump request was honored.
    EntityJumped {
        /// Entity that left the ground.
        entity: EntityId,
    },
    /// Confirms that a shooter activated its bullet.
    BulletFired {
        /// The shooter that fired.
        shooter: EntityId,
        /// The bullet that entered flight.
        bullet: EntityId,
    },
    /// Reports that an enemy was deactivated.
    EnemyDefeated {
        /// The enemy that was removed from play.
        entity: EntityId,
    },
    /// Reports that a bullet left flight without defeating the player.
    BulletSpent {
        /// The bullet that was deactivated.
        bullet: EntityId,
    },
    /// Reports that the player was deactivated.
    PlayerDefeated,
    /// Announces the final outcome of the session. Emitted exactly once.
    GameEnded {
        /// Whether the session was won or lost.
        result: GameResult,
    },
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Broad classification of the entity.
    pub kind: EntityKind,
    /// World-space center of the bounding box.
    pub position: Vec2,
    /// Gravity-driven velocity, exclusive of movement intent.
    pub velocity: Vec2,
    /// Half-width and half-height of the bounding box.
    pub half_extents: Vec2,
    /// Horizontal orientation.
    pub facing: Facing,
    /// Behavior variant for AI-driven entities.
    pub behavior: Option<Behavior>,
    /// Behavioral state for AI-driven entities.
    pub ai_state: AiState,
    /// Whether the entity still participates in play.
    pub active: bool,
    /// Contact flags against other entities from the latest sub-step.
    pub contacts: ContactFlags,
    /// Contact flags against the tile map from the latest sub-step.
    pub map_contacts: ContactFlags,
}

/// Read-only snapshot describing all entities within the world.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot for a specific entity.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&entity, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Returns the player snapshot, if a player exists.
    #[must_use]
    pub fn player(&self) -> Option<&EntitySnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.kind == EntityKind::Player)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}

/// Read-only view into the dense tile grid.
#[derive(Clone, Copy, Debug)]
pub struct TileMapView<'a> {
    codes: &'a [TileCode],
    columns: u32,
    rows: u32,
    tile_size: f32,
}

impl<'a> TileMapView<'a> {
    /// Captures a new view backed by the provided row-major code slice.
    #[must_use]
    pub const fn new(codes: &'a [TileCode], columns: u32, rows: u32, tile_size: f32) -> Self {
        Self {
            codes,
            columns,
            rows,
            tile_size,
        }
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Side length of a single square tile in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Returns the code stored at the given cell, if it is in bounds.
    #[must_use]
    pub fn code_at(&self, column: u32, row: u32) -> Option<TileCode> {
        self.index(column, row)
            .and_then(|index| self.codes.get(index).copied())
    }

    /// Reports whether the given cell blocks movement. Out-of-bounds cells
    /// are not solid.
    #[must_use]
    pub fn is_solid_cell(&self, column: u32, row: u32) -> bool {
        self.code_at(column, row)
            .map_or(false, |code| code.is_solid())
    }

    /// Reports whether the tile containing the given world point is solid.
    #[must_use]
    pub fn is_solid_at(&self, point: Vec2) -> bool {
        match self.cell_at(point) {
            Some((column, row)) => self.is_solid_cell(column, row),
            None => false,
        }
    }

    /// Maps a world point to the cell containing it, if any.
    ///
    /// The map's top edge sits at y = 0 and rows extend downward, so row `r`
    /// spans world y in `[-(r + 1) * tile_size, -r * tile_size]`.
    #[must_use]
    pub fn cell_at(&self, point: Vec2) -> Option<(u32, u32)> {
        if self.tile_size <= 0.0 || point.x < 0.0 || point.y > 0.0 {
            return None;
        }

        let column = (point.x / self.tile_size).floor();
        let row = (-point.y / self.tile_size).floor();
        if column < 0.0 || row < 0.0 {
            return None;
        }

        let column = column as u32;
        let row = row as u32;
        if column < self.columns && row < self.rows {
            Some((column, row))
        } else {
            None
        }
    }

    /// World-space center of the given cell.
    #[must_use]
    pub fn cell_center(&self, column: u32, row: u32) -> Vec2 {
        Vec2::new(
            (column as f32 + 0.5) * self.tile_size,
            -(row as f32 + 0.5) * self.tile_size,
        )
    }

    /// Returns an iterator over all codes in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = TileCode> + 'a {
        self.codes.iter().copied()
    }

    fn index(&self, column: u32, row: u32) -> Option<usize> {
        if column < self.columns && row < self.rows {
            let row = usize::try_from(row).ok()?;
            let column = usize::try_from(column).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ContactFlags, EntityId, EnemyKind, Facing, MapError, Side, TileCode, TileMapView, Vec2,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn entity_id_round_trips_through_bincode() {
        assert_round_trip(&EntityId::new(42));
    }

    #[test]
    fn enemy_kind_round_trips_through_bincode() {
        assert_round_trip(&EnemyKind::Shooter);
    }

    #[test]
    fn map_error_round_trips_through_bincode() {
        assert_round_trip(&MapError::UnknownTileCode { code: 99, index: 3 });
    }

    #[test]
    fn contact_flags_record_sides() {
        let mut flags = ContactFlags::default();
        assert!(!flags.any());

        flags.set(Side::Bottom);
        flags.set(Side::Left);
        assert!(flags.bottom);
        assert!(flags.left);
        assert!(!flags.top);
        assert!(flags.any());

        flags.clear();
        assert!(!flags.any());
    }

    #[test]
    fn facing_reverses_and_signs() {
        assert_eq!(Facing::Left.reversed(), Facing::Right);
        assert_eq!(Facing::Right.reversed(), Facing::Left);
        assert_eq!(Facing::Left.sign(), -1.0);
        assert_eq!(Facing::Right.sign(), 1.0);
    }

    #[test]
    fn tile_view_maps_world_points_to_cells() {
        let codes = [
            TileCode::EMPTY,
            TileCode::EMPTY,
            TileCode::new(1),
            TileCode::new(2),
        ];
        let view = TileMapView::new(&codes, 2, 2, 0.5);

        assert_eq!(view.cell_at(Vec2::new(0.25, -0.25)), Some((0, 0)));
        assert_eq!(view.cell_at(Vec2::new(0.75, -0.75)), Some((1, 1)));
        assert_eq!(view.cell_at(Vec2::new(-0.1, -0.25)), None);
        assert_eq!(view.cell_at(Vec2::new(0.25, 0.1)), None);
        assert_eq!(view.cell_at(Vec2::new(1.2, -0.25)), None);
    }

    #[test]
    fn tile_view_reports_solidity() {
        let codes = [
            TileCode::EMPTY,
            TileCode::EMPTY,
            TileCode::new(1),
            TileCode::new(2),
        ];
        let view = TileMapView::new(&codes, 2, 2, 0.5);

        assert!(!view.is_solid_cell(0, 0));
        assert!(view.is_solid_cell(0, 1));
        assert!(view.is_solid_cell(1, 1));
        assert!(!view.is_solid_cell(5, 5));
        assert!(view.is_solid_at(Vec2::new(0.25, -0.75)));
        assert!(!view.is_solid_at(Vec2::new(0.25, -0.25)));
    }

    #[test]
    fn cell_centers_sit_inside_their_cells() {
        let codes = [TileCode::EMPTY; 4];
        let view = TileMapView::new(&codes, 2, 2, 1.0);

        let center = view.cell_center(1, 0);
        assert_eq!(center, Vec2::new(1.5, -0.5));
        assert_eq!(view.cell_at(center), Some((1, 0)));
    }
}

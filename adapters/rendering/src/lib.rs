#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared presentation contracts for Tilerunner adapters.
//!
//! The simulation never draws anything itself. Adapters capture a [`Scene`]
//! from world snapshots each frame and hand it to a [`Presenter`], so the
//! same scene description can feed a windowed backend, a terminal dump, or a
//! test double.

use anyhow::Result as AnyResult;
use glam::Vec2;
use tilerunner_core::{
    Behavior, EntityId, EntityKind, EntityView, Facing, GameResult, TileCode, TileMapView,
};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }
}

/// Tile layer captured from the world's map view.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayerPresentation {
    /// Number of columns contained in the grid.
    pub columns: u32,
    /// Number of rows contained in the grid.
    pub rows: u32,
    /// Side length of a single tile expressed in world units.
    pub tile_size: f32,
    /// Row-major tile codes copied out of the map view.
    pub codes: Vec<TileCode>,
}

impl TileLayerPresentation {
    /// Captures the tile layer from a map view.
    #[must_use]
    pub fn capture(map: TileMapView<'_>) -> Self {
        let (columns, rows) = map.dimensions();
        Self {
            columns,
            rows,
            tile_size: map.tile_size(),
            codes: map.iter().collect(),
        }
    }

    /// Calculates the total width of the layer in world units.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.columns as f32 * self.tile_size
    }

    /// Calculates the total height of the layer in world units.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    /// Returns the code at the given cell, if it is in bounds.
    #[must_use]
    pub fn code_at(&self, column: u32, row: u32) -> Option<TileCode> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let index = row as usize * self.columns as usize + column as usize;
        self.codes.get(index).copied()
    }
}

/// Single drawable entity captured from the world's entity view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteInstance {
    /// Identifier allocated to the entity by the world.
    pub entity: EntityId,
    /// Broad classification used to pick a sprite.
    pub kind: EntityKind,
    /// World-space center of the bounding box.
    pub position: Vec2,
    /// Half-width and half-height of the bounding box.
    pub half_extents: Vec2,
    /// Horizontal orientation for sprite mirroring.
    pub facing: Facing,
    /// Behavior variant for picking archetype-specific sprites.
    pub behavior: Option<Behavior>,
    /// Fill color assigned from the default palette.
    pub color: Color,
}

/// Scene description combining the tile layer and the live entities.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Tile layer that composes the static play area.
    pub tile_layer: TileLayerPresentation,
    /// Active entities in deterministic id order.
    pub sprites: Vec<SpriteInstance>,
    /// Outcome of the session as of this frame.
    pub result: GameResult,
}

impl Scene {
    /// Captures a scene from world views. Inactive entities are omitted.
    #[must_use]
    pub fn capture(map: TileMapView<'_>, entities: &EntityView, result: GameResult) -> Self {
        let sprites = entities
            .iter()
            .filter(|snapshot| snapshot.active)
            .map(|snapshot| SpriteInstance {
                entity: snapshot.id,
                kind: snapshot.kind,
                position: snapshot.position,
                half_extents: snapshot.half_extents,
                facing: snapshot.facing,
                behavior: snapshot.behavior,
                color: palette_color(snapshot.kind, snapshot.behavior),
            })
            .collect();

        Self {
            tile_layer: TileLayerPresentation::capture(map),
            sprites,
            result,
        }
    }
}

/// Default fill color for an entity classification.
#[must_use]
pub fn palette_color(kind: EntityKind, behavior: Option<Behavior>) -> Color {
    match (kind, behavior) {
        (EntityKind::Player, _) => Color::from_rgb_u8(64, 160, 255),
        (EntityKind::Platform, _) => Color::from_rgb_u8(120, 120, 120),
        (EntityKind::Enemy, Some(Behavior::Bullet { .. })) => Color::from_rgb_u8(255, 220, 64),
        (EntityKind::Enemy, _) => Color::from_rgb_u8(220, 64, 64),
    }
}

/// Sink capable of presenting captured Tilerunner scenes.
pub trait Presenter {
    /// Presents one frame.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}

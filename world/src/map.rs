//! Immutable tile grid storage and world-space solidity queries.

use tilerunner_core::{MapError, TileCode, TileMapView, Vec2};

/// Largest tile code the palette supports. Codes above this are rejected at
/// load time rather than producing undefined solidity at runtime.
pub(crate) const MAX_TILE_CODE: u16 = 15;

/// Static grid of tile codes, built once at level load and read-only
/// thereafter.
#[derive(Clone, Debug)]
pub struct TileMap {
    columns: u32,
    rows: u32,
    tile_size: f32,
    codes: Vec<TileCode>,
}

impl TileMap {
    /// Validates and builds a tile map from a row-major code array.
    pub(crate) fn build(
        columns: u32,
        rows: u32,
        tile_size: f32,
        codes: Vec<TileCode>,
    ) -> Result<Self, MapError> {
        if columns == 0 || rows == 0 {
            return Err(MapError::ZeroDimension);
        }
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(MapError::InvalidTileSize);
        }

        let expected_u64 = u64::from(columns) * u64::from(rows);
        let actual = codes.len();
        if u64::try_from(actual) != Ok(expected_u64) {
            return Err(MapError::DimensionMismatch {
                expected: u32::try_from(expected_u64).unwrap_or(u32::MAX),
                actual: u32::try_from(actual).unwrap_or(u32::MAX),
            });
        }

        for (index, code) in codes.iter().enumerate() {
            if code.get() > MAX_TILE_CODE {
                return Err(MapError::UnknownTileCode {
                    code: code.get(),
                    index: u32::try_from(index).unwrap_or(u32::MAX),
                });
            }
        }

        Ok(Self {
            columns,
            rows,
            tile_size,
            codes,
        })
    }

    /// Builds an empty map used before any level is configured.
    pub(crate) fn empty(columns: u32, rows: u32, tile_size: f32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            tile_size,
            codes: vec![TileCode::EMPTY; capacity],
        }
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a single square tile in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Captures a read-only view over the grid.
    #[must_use]
    pub fn view(&self) -> TileMapView<'_> {
        TileMapView::new(&self.codes, self.columns, self.rows, self.tile_size)
    }

    /// Collects the world-space boxes of all solid cells whose bounds
    /// intersect the given bounding box. The scan is limited to the cells
    /// the box can overlap instead of the whole grid.
    pub(crate) fn solid_cells_overlapping(
        &self,
        center: Vec2,
        half_extents: Vec2,
        out: &mut Vec<Vec2>,
    ) {
        out.clear();
        if self.tile_size <= 0.0 {
            return;
        }

        let min_x = center.x - half_extents.x;
        let max_x = center.x + half_extents.x;
        let min_y = center.y - half_extents.y;
        let max_y = center.y + half_extents.y;

        let first_column = (min_x / self.tile_size).floor().max(0.0) as u32;
        let last_column = (max_x / self.tile_size).floor().max(0.0) as u32;
        let first_row = (-max_y / self.tile_size).floor().max(0.0) as u32;
        let last_row = (-min_y / self.tile_size).floor().max(0.0) as u32;

        let view = self.view();
        for row in first_row..=last_row.min(self.rows.saturating_sub(1)) {
            for column in first_column..=last_column.min(self.columns.saturating_sub(1)) {
                if view.is_solid_cell(column, row) {
                    out.push(view.cell_center(column, row));
                }
            }
        }
    }
}

//! Tile grids over a raster.

use super::{BBoxXYXY, Pixel};
use crate::error::RsLabelError;

/// Position of a tile inside its grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub row: u32,
    pub col: u32,
}

impl TileCoord {
    #[inline]
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// One tile's pixel-space rectangle within the source raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub coord: TileCoord,
    /// Left edge, in source raster pixels.
    pub x: u32,
    /// Top edge, in source raster pixels.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub fn bbox(&self) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xywh(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.width),
            f64::from(self.height),
        )
    }
}

/// The tiles covering a `width × height` raster with square tiles of
/// `tile_size` pixels.
///
/// The last row and column are truncated to the remaining pixels rather than
/// padded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub rows: u32,
    pub columns: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Result<Self, RsLabelError> {
        if tile_size == 0 {
            return Err(RsLabelError::InvalidConfig(
                "tile size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            tile_size,
            rows: height.div_ceil(tile_size),
            columns: width.div_ceil(tile_size),
        })
    }

    pub fn len(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tile at `(row, col)`; `None` outside the grid.
    pub fn tile(&self, row: u32, col: u32) -> Option<TileRect> {
        if row >= self.rows || col >= self.columns {
            return None;
        }
        let x = col * self.tile_size;
        let y = row * self.tile_size;
        Some(TileRect {
            coord: TileCoord::new(row, col),
            x,
            y,
            width: self.tile_size.min(self.width - x),
            height: self.tile_size.min(self.height - y),
        })
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileRect> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.columns).map(move |col| (row, col)))
            .filter_map(|(row, col)| self.tile(row, col))
    }
}

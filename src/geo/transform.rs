//! Affine geotransforms between raster pixel space and map space.
//!
//! Coefficients follow the GDAL layout
//! `[originX, pixelW, rotX, originY, rotY, pixelH]`. Only the axis-aligned
//! terms take part in the pixel/map conversions; the rotation terms are carried
//! through untouched.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Coord, Map, Pixel};
use crate::error::RsLabelError;

/// Origins closer to zero than this are treated as "no georeferencing".
const ORIGIN_EPSILON: f64 = 1e-9;

/// A six-coefficient affine geotransform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoTransform([f64; 6]);

impl GeoTransform {
    #[inline]
    pub const fn new(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    /// The substitute used for rasters without georeferencing: map `y` is
    /// the pixel row flipped around the raster height.
    pub fn identity_for_height(height: u32) -> Self {
        Self([0.0, 1.0, 0.0, f64::from(height), 0.0, -1.0])
    }

    #[inline]
    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }

    #[inline]
    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    #[inline]
    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    #[inline]
    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// True when the raster carries no real georeferencing (`originX ≈ 0`).
    #[inline]
    pub fn is_ungeoreferenced(&self) -> bool {
        self.origin_x().abs() < ORIGIN_EPSILON
    }

    /// True when pixel/map conversion would divide by zero or by a non-finite value.
    pub fn is_degenerate(&self) -> bool {
        let w = self.pixel_width();
        let h = self.pixel_height();
        w == 0.0 || h == 0.0 || !w.is_finite() || !h.is_finite()
    }

    /// Rejects degenerate transforms; `path` names the file the transform came from.
    pub fn ensure_valid(&self, path: &Path) -> Result<(), RsLabelError> {
        if self.is_degenerate() {
            return Err(RsLabelError::DegenerateGeoTransform {
                path: path.to_path_buf(),
                coefficients: self.0,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn map_to_pixel(&self, point: Coord<Map>) -> Coord<Pixel> {
        let (u, v) = map_to_pixel(self, point.x, point.y);
        Coord::new(u, v)
    }

    #[inline]
    pub fn pixel_to_map(&self, point: Coord<Pixel>) -> Coord<Map> {
        let (x, y) = pixel_to_map(self, point.x, point.y);
        Coord::new(x, y)
    }

    /// Transform of the tile at `(row, col)`, anchored at the tile's pixel origin.
    ///
    /// Ungeoreferenced rasters get a fresh identity substitute sized to the
    /// tile's real height instead.
    pub fn for_tile(&self, row: u32, col: u32, tile_size: u32, tile_height: u32) -> Self {
        if self.is_ungeoreferenced() {
            return Self::identity_for_height(tile_height);
        }
        let [ox, pw, rx, oy, ry, ph] = self.0;
        let col_px = f64::from(col) * f64::from(tile_size);
        let row_px = f64::from(row) * f64::from(tile_size);
        Self([ox + pw * col_px, pw, rx, oy + ph * row_px, ry, ph])
    }
}

/// Map coordinates to raster pixel coordinates.
///
/// `u = (x − gt[0]) / gt[1]`, `v = (gt[3] − y) / −gt[5]`.
#[inline]
pub fn map_to_pixel(gt: &GeoTransform, x: f64, y: f64) -> (f64, f64) {
    let c = &gt.0;
    ((x - c[0]) / c[1], (c[3] - y) / -c[5])
}

/// Raster pixel coordinates to map coordinates.
///
/// `x = gt[0] + gt[1]·u`, `y = gt[3] + gt[5]·v`.
#[inline]
pub fn pixel_to_map(gt: &GeoTransform, u: f64, v: f64) -> (f64, f64) {
    let c = &gt.0;
    (c[0] + c[1] * u, c[3] + c[5] * v)
}

/// Raster pixel coordinates to the local frame of tile `(row, col)` for
/// ungeoreferenced rasters.
///
/// The vertical axis is flipped so that the result reads like map
/// coordinates under an identity substitute of height `tile_size`.
#[inline]
pub fn tile_local_offset(tile_size: u32, row: u32, col: u32, u: f64, v: f64) -> (f64, f64) {
    let t = f64::from(tile_size);
    (u - f64::from(col) * t, (f64::from(row) + 1.0) * t - v)
}

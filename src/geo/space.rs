//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! between raster pixel coordinates and georeferenced map coordinates at
//! compile time.

use std::fmt;

/// Marker type for raster pixel coordinates.
///
/// `(0, 0)` is the top-left corner of the raster (or of a tile, for
/// tile-local coordinates); `y` grows downwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for map coordinates, the space label files store points in.
///
/// Map coordinates come out of a geotransform; `y` usually grows upwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Map {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

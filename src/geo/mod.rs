//! Geometry for georeferenced rasters.
//!
//! Label files store points in map space; tiling and dataset exports work in
//! raster pixel space. This module holds the typed coordinates, the affine
//! geotransform between the two spaces, tile grids, and shape clipping.
//!
//! # Example
//!
//! ```
//! use rslabel::geo::{Coord, GeoTransform, Map, TileGrid};
//!
//! let gt = GeoTransform::identity_for_height(1500);
//! let pixel = gt.map_to_pixel(Coord::<Map>::new(10.0, 1490.0));
//! assert_eq!((pixel.x, pixel.y), (10.0, 10.0));
//!
//! let grid = TileGrid::new(2000, 1500, 1000)?;
//! assert_eq!((grid.rows, grid.columns), (2, 2));
//! # Ok::<(), rslabel::RsLabelError>(())
//! ```

mod bbox;
pub mod clip;
mod coord;
mod grid;
mod space;
pub mod transform;

pub use bbox::BBoxXYXY;
pub use clip::{clip_shape, polygon_area, TileFrame};
pub use coord::Coord;
pub use grid::{TileCoord, TileGrid, TileRect};
pub use space::{Map, Pixel};
pub use transform::{map_to_pixel, pixel_to_map, tile_local_offset, GeoTransform};

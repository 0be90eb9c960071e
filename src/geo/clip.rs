//! Clipping annotation shapes against tiles.
//!
//! Shapes arrive in map space. They are moved into raster pixel space through
//! the source geotransform, intersected with the tile rectangle there, and the
//! surviving vertices are written back out in the tile's own frame.

use super::grid::TileRect;
use super::transform::tile_local_offset;
use super::{BBoxXYXY, Coord, GeoTransform, Map, Pixel};
use crate::label::{Shape, ShapeKind};

/// Clipped polygons with less area than this (in square pixels) are dropped.
const MIN_POLYGON_AREA: f64 = 1e-9;

/// The local coordinate frame of one tile.
#[derive(Clone, Copy, Debug)]
pub struct TileFrame {
    source: GeoTransform,
    tile: TileRect,
    tile_size: u32,
    local: GeoTransform,
}

impl TileFrame {
    pub fn new(source: GeoTransform, tile: TileRect, tile_size: u32) -> Self {
        let local = source.for_tile(tile.coord.row, tile.coord.col, tile_size, tile.height);
        Self {
            source,
            tile,
            tile_size,
            local,
        }
    }

    /// The geotransform a label file for this tile should carry.
    pub fn geo_transform(&self) -> GeoTransform {
        self.local
    }

    /// Converts a source raster pixel into the coordinates stored in this
    /// tile's label file.
    ///
    /// Without georeferencing the row is flipped around the full `tile_size`,
    /// also for a truncated last row.
    pub fn to_local(&self, point: Coord<Pixel>) -> Coord<Map> {
        if self.source.is_ungeoreferenced() {
            let (u, v) = tile_local_offset(
                self.tile_size,
                self.tile.coord.row,
                self.tile.coord.col,
                point.x,
                point.y,
            );
            Coord::new(u, v)
        } else {
            let local_px = Coord::<Pixel>::new(
                point.x - f64::from(self.tile.x),
                point.y - f64::from(self.tile.y),
            );
            self.local.pixel_to_map(local_px)
        }
    }

    /// Clips `shape` to this tile. `None` means the shape does not reach the tile.
    pub fn clip(&self, shape: &Shape) -> Option<Shape> {
        if shape.points.is_empty() {
            return None;
        }
        let pixels: Vec<Coord<Pixel>> = shape
            .points
            .iter()
            .map(|p| self.source.map_to_pixel(*p))
            .collect();
        let tile_box = self.tile.bbox();

        let clipped = match &shape.shape_type {
            ShapeKind::Rectangle => clip_rectangle(&pixels, &tile_box),
            ShapeKind::Polygon | ShapeKind::SlantRectangle => clip_polygon(&pixels, &tile_box),
            ShapeKind::Line
            | ShapeKind::Linestrip
            | ShapeKind::Circle
            | ShapeKind::Point
            | ShapeKind::Other(_) => pass_through(&pixels, &tile_box),
        }?;

        let points = clipped.into_iter().map(|p| self.to_local(p)).collect();
        Some(shape.with_points(points))
    }
}

/// Clips one shape against one tile; see [`TileFrame::clip`].
pub fn clip_shape(
    shape: &Shape,
    source: &GeoTransform,
    tile: &TileRect,
    tile_size: u32,
) -> Option<Shape> {
    TileFrame::new(*source, *tile, tile_size).clip(shape)
}

fn clip_rectangle(points: &[Coord<Pixel>], tile: &BBoxXYXY<Pixel>) -> Option<Vec<Coord<Pixel>>> {
    let rect = BBoxXYXY::from_points(points)?;
    let hit = rect.intersection(tile)?;
    Some(vec![hit.min, hit.max])
}

fn clip_polygon(points: &[Coord<Pixel>], tile: &BBoxXYXY<Pixel>) -> Option<Vec<Coord<Pixel>>> {
    let clipped = sutherland_hodgman(points, tile);
    (clipped.len() >= 3 && polygon_area(&clipped) > MIN_POLYGON_AREA).then_some(clipped)
}

/// Point-like and open shapes are not subdivided: they go to every tile that
/// holds at least one of their vertices.
fn pass_through(points: &[Coord<Pixel>], tile: &BBoxXYXY<Pixel>) -> Option<Vec<Coord<Pixel>>> {
    points
        .iter()
        .any(|p| tile.contains(p))
        .then(|| points.to_vec())
}

#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Top(f64),
    Bottom(f64),
}

impl Edge {
    fn inside(self, p: Coord<Pixel>) -> bool {
        match self {
            Edge::Left(x) => p.x >= x,
            Edge::Right(x) => p.x <= x,
            Edge::Top(y) => p.y >= y,
            Edge::Bottom(y) => p.y <= y,
        }
    }

    /// Where segment `a → b` crosses this edge. Callers only ask for segments
    /// with one end on each side.
    fn intersect(self, a: Coord<Pixel>, b: Coord<Pixel>) -> Coord<Pixel> {
        let t = match self {
            Edge::Left(x) | Edge::Right(x) => (x - a.x) / (b.x - a.x),
            Edge::Top(y) | Edge::Bottom(y) => (y - a.y) / (b.y - a.y),
        };
        if t >= 1.0 {
            return b;
        }
        if t <= 0.0 {
            return a;
        }
        match self {
            Edge::Left(x) | Edge::Right(x) => Coord::new(x, a.y + t * (b.y - a.y)),
            Edge::Top(y) | Edge::Bottom(y) => Coord::new(a.x + t * (b.x - a.x), y),
        }
    }
}

/// Sutherland–Hodgman clipping of a closed polygon against an axis-aligned box.
///
/// Vertex order is preserved; a polygon entirely inside the box comes back
/// unchanged.
pub fn sutherland_hodgman(points: &[Coord<Pixel>], rect: &BBoxXYXY<Pixel>) -> Vec<Coord<Pixel>> {
    let edges = [
        Edge::Left(rect.xmin()),
        Edge::Right(rect.xmax()),
        Edge::Top(rect.ymin()),
        Edge::Bottom(rect.ymax()),
    ];

    let mut output = points.to_vec();
    for edge in edges {
        let Some(&last) = output.last() else {
            break;
        };
        let input = std::mem::take(&mut output);
        let mut prev = last;
        for &cur in &input {
            match (edge.inside(prev), edge.inside(cur)) {
                (true, true) => output.push(cur),
                (false, true) => {
                    let entry = edge.intersect(prev, cur);
                    if entry != cur {
                        output.push(entry);
                    }
                    output.push(cur);
                }
                (true, false) => {
                    let exit = edge.intersect(prev, cur);
                    if exit != prev {
                        output.push(exit);
                    }
                }
                (false, false) => {}
            }
            prev = cur;
        }
    }
    output
}

/// Unsigned shoelace area of a closed polygon.
pub fn polygon_area<TSpace>(points: &[Coord<TSpace>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() / 2.0
}

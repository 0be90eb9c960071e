//! In-memory model of a LabelMe-style label file.
//!
//! Points are stored in map space exactly as they appear on disk; pixel
//! coordinates are derived on demand through the file's geotransform.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Value};

use crate::geo::{Coord, GeoTransform, Map};

/// An `[r, g, b, a]` color.
pub type Rgba = [u8; 4];

/// The geometry kind of a [`Shape`], stored as `shape_type` in JSON.
///
/// Kinds this crate does not know are kept verbatim in [`ShapeKind::Other`]
/// so they survive a load/save cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    #[default]
    Polygon,
    SlantRectangle,
    Line,
    Linestrip,
    Circle,
    Point,
    Other(String),
}

impl ShapeKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "rectangle" => Self::Rectangle,
            "polygon" => Self::Polygon,
            "slantRectangle" => Self::SlantRectangle,
            "line" => Self::Line,
            "linestrip" => Self::Linestrip,
            "circle" => Self::Circle,
            "point" => Self::Point,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::SlantRectangle => "slantRectangle",
            Self::Line => "line",
            Self::Linestrip => "linestrip",
            Self::Circle => "circle",
            Self::Point => "point",
            Self::Other(raw) => raw,
        }
    }

    /// Kinds that describe an area and therefore have a bounding box in
    /// dataset exports.
    pub fn is_region(&self) -> bool {
        matches!(self, Self::Rectangle | Self::Polygon | Self::SlantRectangle)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ShapeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShapeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // LabelMe writes `null` for shapes created before shape types existed.
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Self::parse(&s)).unwrap_or_default())
    }
}

/// One annotated region or line on a raster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub label: String,

    /// Vertices in map space. Rectangles hold two opposite corners.
    pub points: Vec<Coord<Map>>,

    #[serde(default)]
    pub shape_type: ShapeKind,

    #[serde(default)]
    pub line_color: Option<Rgba>,

    #[serde(default)]
    pub fill_color: Option<Rgba>,

    /// Annotator confidence on a 0–10 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,

    /// Per-shape keys this crate does not interpret (`group_id`, `flags`, ...).
    #[serde(flatten)]
    pub extra: JsonMap<String, Value>,
}

impl Shape {
    pub fn new(
        label: impl Into<String>,
        shape_type: ShapeKind,
        points: impl IntoIterator<Item = (f64, f64)>,
    ) -> Self {
        Self {
            label: label.into(),
            points: points.into_iter().map(Coord::from).collect(),
            shape_type,
            line_color: None,
            fill_color: None,
            probability: None,
            extra: JsonMap::new(),
        }
    }

    pub fn with_probability(mut self, probability: u8) -> Self {
        self.probability = Some(probability);
        self
    }

    /// A copy of this shape carrying `points` instead of its own.
    pub fn with_points(&self, points: Vec<Coord<Map>>) -> Self {
        Self {
            points,
            ..self.clone()
        }
    }
}

/// The annotation record for one raster.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelFile {
    /// Raster path relative to the label file's directory.
    pub image_path: String,

    /// Embedded base64 image, kept opaque.
    pub image_data: Option<String>,

    pub image_width: u32,
    pub image_height: u32,

    pub line_color: Option<Rgba>,
    pub fill_color: Option<Rgba>,

    pub flags: BTreeMap<String, bool>,

    pub shapes: Vec<Shape>,

    /// The `geoTrans` key, pulled out of the extension map.
    pub geo_transform: Option<GeoTransform>,

    /// Every other top-level key, in file order.
    pub other_data: JsonMap<String, Value>,
}

impl LabelFile {
    pub fn new(image_path: impl Into<String>, image_width: u32, image_height: u32) -> Self {
        Self {
            image_path: image_path.into(),
            image_data: None,
            image_width,
            image_height,
            line_color: None,
            fill_color: None,
            flags: BTreeMap::new(),
            shapes: Vec::new(),
            geo_transform: None,
            other_data: JsonMap::new(),
        }
    }

    pub fn with_geo_transform(mut self, geo_transform: GeoTransform) -> Self {
        self.geo_transform = Some(geo_transform);
        self
    }

    pub fn with_shapes(mut self, shapes: Vec<Shape>) -> Self {
        self.shapes = shapes;
        self
    }

    /// The stored geotransform, or the identity substitute for this image's height.
    pub fn geo_transform_or_identity(&self) -> GeoTransform {
        self.geo_transform
            .unwrap_or_else(|| GeoTransform::identity_for_height(self.image_height))
    }

    /// The file name part of `image_path` (after the last `/` or `\`).
    pub fn image_file_name(&self) -> &str {
        self.image_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.image_path)
    }
}

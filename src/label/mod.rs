//! Label files: one JSON annotation record per raster.
//!
//! # Example
//!
//! ```
//! use rslabel::label::{io_label_json, LabelFile, Shape, ShapeKind};
//!
//! let label = LabelFile::new("scene.tif", 200, 100).with_shapes(vec![Shape::new(
//!     "house",
//!     ShapeKind::Rectangle,
//!     [(10.0, 90.0), (40.0, 60.0)],
//! )]);
//!
//! let json = io_label_json::to_label_string(&label).unwrap();
//! let restored = io_label_json::from_label_str(&json).unwrap();
//! assert_eq!(restored, label);
//! ```

pub mod io_label_json;
mod model;

pub use model::{LabelFile, Rgba, Shape, ShapeKind};

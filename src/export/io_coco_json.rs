//! COCO JSON export.
//!
//! A [`CocoBuilder`] turns a sequence of label files into one COCO dataset.
//! Points are moved from map space to raster pixels through each image's
//! geotransform before boxes and segmentations are derived.
//!
//! Category names follow the `supercategory_name` convention: a label with
//! exactly one underscore is split into supercategory and name; any other
//! label is used whole with no supercategory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ids::{AnnotationId, CategoryId, ImageId};
use super::source_label_files;
use crate::config::ExportConfig;
use crate::error::RsLabelError;
use crate::geo::{polygon_area, BBoxXYXY, Coord, GeoTransform, Pixel};
use crate::label::io_label_json::{collect_label_files, read_source_label_file};
use crate::label::{LabelFile, ShapeKind};
use crate::raster::{find_raster, RasterBackend};
use crate::report::RunReport;
use crate::tiling::resolve_geo_transform;

/// Directory under the output directory that receives copied rasters.
pub const COCO_RASTER_DIR: &str = "Annotations";

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

#[derive(Debug, Serialize)]
struct CocoDataset<'a> {
    images: &'a [CocoImage],
    categories: &'a [CocoCategory],
    annotations: &'a [CocoAnnotation],
}

#[derive(Clone, Debug, Serialize)]
struct CocoImage {
    id: ImageId,
    width: u32,
    height: u32,
    file_name: String,
}

#[derive(Clone, Debug, Serialize)]
struct CocoCategory {
    id: CategoryId,
    name: String,
    supercategory: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
struct CocoAnnotation {
    id: AnnotationId,
    image_id: ImageId,
    category_id: CategoryId,
    /// One flat `[x0, y0, x1, y1, ...]` polygon in pixels.
    segmentation: Vec<Vec<f64>>,
    /// `[x, y, width, height]`, truncated to whole pixels.
    bbox: [i64; 4],
    area: f64,
    iscrowd: u8,
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates label files into one COCO dataset.
#[derive(Debug, Default)]
pub struct CocoBuilder {
    images: Vec<CocoImage>,
    categories: Vec<CocoCategory>,
    annotations: Vec<CocoAnnotation>,
}

impl CocoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one label file as the next image. `geo_transform` maps its
    /// points to pixels.
    pub fn add_label_file(&mut self, label: &LabelFile, geo_transform: &GeoTransform) -> ImageId {
        let image_id = ImageId::new(self.images.len() as u64 + 1);
        self.images.push(CocoImage {
            id: image_id,
            width: label.image_width,
            height: label.image_height,
            file_name: label.image_file_name().to_string(),
        });

        for shape in &label.shapes {
            let pixels: Vec<Coord<Pixel>> = shape
                .points
                .iter()
                .map(|p| geo_transform.map_to_pixel(*p))
                .collect();
            let Some(bbox) = BBoxXYXY::from_points(&pixels) else {
                log::warn!(
                    "shape '{}' in {} has no points, skipping",
                    shape.label,
                    label.image_path
                );
                continue;
            };

            let polygon = match shape.shape_type {
                ShapeKind::Rectangle => rectangle_corners(&bbox),
                _ => pixels,
            };
            let category_id = self.category_id(&shape.label);
            let id = AnnotationId::new(self.annotations.len() as u64 + 1);

            self.annotations.push(CocoAnnotation {
                id,
                image_id,
                category_id,
                segmentation: vec![polygon.iter().flat_map(|p| [p.x, p.y]).collect()],
                bbox: truncated_xywh(&bbox),
                area: polygon_area(&polygon),
                iscrowd: 0,
            });
        }

        image_id
    }

    /// The id of `label`'s category, registering it on first sight.
    pub fn category_id(&mut self, label: &str) -> CategoryId {
        let (name, supercategory) = split_category(label);
        if let Some(existing) = self.categories.iter().find(|c| c.name == name) {
            return existing.id;
        }
        let id = CategoryId::new(self.categories.len() as u64 + 1);
        self.categories.push(CocoCategory {
            id,
            name: name.to_string(),
            supercategory: supercategory.map(str::to_string),
        });
        id
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    /// Category names in id order.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.dataset())
    }

    pub fn write(&self, path: &Path) -> Result<(), RsLabelError> {
        let file = File::create(path).map_err(RsLabelError::Io)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.dataset()).map_err(|source| {
            RsLabelError::CocoJsonWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush().map_err(RsLabelError::Io)
    }

    fn dataset(&self) -> CocoDataset<'_> {
        CocoDataset {
            images: &self.images,
            categories: &self.categories,
            annotations: &self.annotations,
        }
    }
}

/// `(name, supercategory)` for a label.
pub fn split_category(label: &str) -> (&str, Option<&str>) {
    let mut parts = label.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(supercategory), Some(name), None) => (name, Some(supercategory)),
        _ => (label, None),
    }
}

fn rectangle_corners(bbox: &BBoxXYXY<Pixel>) -> Vec<Coord<Pixel>> {
    vec![
        Coord::new(bbox.xmin(), bbox.ymin()),
        Coord::new(bbox.xmax(), bbox.ymin()),
        Coord::new(bbox.xmax(), bbox.ymax()),
        Coord::new(bbox.xmin(), bbox.ymax()),
    ]
}

fn truncated_xywh(bbox: &BBoxXYXY<Pixel>) -> [i64; 4] {
    let (x, y, w, h) = bbox.to_xywh();
    [x as i64, y as i64, w as i64, h as i64]
}

// ============================================================================
// Directory export
// ============================================================================

/// One COCO file per label file under `source_dir`: `{out}/{base}.json`,
/// with each raster copied into `{out}/Annotations/`.
pub fn export_coco_untiled(
    source_dir: &Path,
    config: &ExportConfig,
    backend: &dyn RasterBackend,
    report: &mut RunReport,
) -> Result<(), RsLabelError> {
    let raster_dir = config.output_dir.join(COCO_RASTER_DIR);
    fs::create_dir_all(&raster_dir).map_err(RsLabelError::Io)?;

    for label_path in source_label_files(source_dir, config)? {
        let Some(label) = read_source_label_file(&label_path, report)? else {
            continue;
        };
        let mut builder = CocoBuilder::new();
        let raster = add_to_builder(&mut builder, &label_path, &label, config, backend, report)?;

        let out = config
            .output_dir
            .join(format!("{}.json", file_stem(&label_path)));
        log::info!("writing {}", out.display());
        builder.write(&out)?;

        if let Some(raster) = raster {
            copy_into(&raster, &raster_dir)?;
        }
    }
    Ok(())
}

/// One COCO file per tile group directory under `tiles_dir`:
/// `{out}/coco_{group}.json`, with tile rasters copied into
/// `{out}/Annotations/{group}/`.
pub fn export_coco_tiled(
    tiles_dir: &Path,
    config: &ExportConfig,
    backend: &dyn RasterBackend,
    report: &mut RunReport,
) -> Result<(), RsLabelError> {
    for group_dir in child_dirs(tiles_dir)? {
        let group = file_name(&group_dir);
        let raster_dir = config.output_dir.join(COCO_RASTER_DIR).join(&group);
        fs::create_dir_all(&raster_dir).map_err(RsLabelError::Io)?;

        let mut builder = CocoBuilder::new();
        for label_path in collect_label_files(&group_dir)? {
            let Some(label) = read_source_label_file(&label_path, report)? else {
                continue;
            };
            if let Some(raster) =
                add_to_builder(&mut builder, &label_path, &label, config, backend, report)?
            {
                copy_into(&raster, &raster_dir)?;
            }
        }

        let out = config.output_dir.join(format!("coco_{group}.json"));
        log::info!(
            "writing {} ({} images, {} annotations)",
            out.display(),
            builder.image_count(),
            builder.annotation_count()
        );
        builder.write(&out)?;
    }
    Ok(())
}

fn add_to_builder(
    builder: &mut CocoBuilder,
    label_path: &Path,
    label: &LabelFile,
    config: &ExportConfig,
    backend: &dyn RasterBackend,
    report: &mut RunReport,
) -> Result<Option<PathBuf>, RsLabelError> {
    let raster = find_raster(label_path, &config.raster_extensions);
    let geo_transform = match &raster {
        Some(raster) => resolve_geo_transform(label, raster, backend)?,
        None => label.geo_transform_or_identity(),
    };
    geo_transform.ensure_valid(label_path)?;

    let before = builder.annotation_count();
    builder.add_label_file(label, &geo_transform);

    report.counts.label_files += 1;
    report.counts.images += 1;
    report.counts.annotations += builder.annotation_count() - before;
    for shape in &label.shapes {
        report.note_label(&shape.label);
    }
    if raster.is_none() {
        log::warn!("no raster found for {}, not copied", label_path.display());
    }
    Ok(raster)
}

fn copy_into(file: &Path, dir: &Path) -> Result<(), RsLabelError> {
    let Some(name) = file.file_name() else {
        return Ok(());
    };
    fs::copy(file, dir.join(name)).map_err(RsLabelError::Io)?;
    Ok(())
}

/// Immediate subdirectories of `dir`, sorted.
fn child_dirs(dir: &Path) -> Result<Vec<PathBuf>, RsLabelError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(RsLabelError::Io)? {
        let path = entry.map_err(RsLabelError::Io)?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

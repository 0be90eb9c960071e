//! Pascal VOC export.
//!
//! Layout written under the output directory:
//!
//! ```text
//! class_names.txt
//! JPEGImages/{imagePath}
//! Annotations/{base}.xml
//! AnnotationsVisualization/{base}.tif    (tiled runs)
//! AnnotationsVisualization/readme.txt    (untiled runs)
//! ```
//!
//! Class ids come from `labels.txt`, whose first two lines are always
//! `__ignore__` (id -1) and `_background_` (id 0).

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use super::source_label_files;
use crate::config::ExportConfig;
use crate::error::RsLabelError;
use crate::geo::{BBoxXYXY, GeoTransform, Map, Pixel};
use crate::label::io_label_json::read_source_label_file;
use crate::label::{LabelFile, Rgba, Shape, ShapeKind};
use crate::raster::{find_raster, RasterBackend};
use crate::report::{RunIssue, RunIssueCode, RunReport};

pub const IGNORE_CLASS: &str = "__ignore__";
pub const BACKGROUND_CLASS: &str = "_background_";

pub const JPEG_IMAGES_DIR: &str = "JPEGImages";
pub const ANNOTATIONS_DIR: &str = "Annotations";
pub const VISUALIZATION_DIR: &str = "AnnotationsVisualization";

const CLASS_NAMES_FILE: &str = "class_names.txt";
const VISUALIZATION_README: &str =
    "Instance visualization is only rendered for tiled exports.\n";

// ============================================================================
// Class list
// ============================================================================

/// Class names from `_background_` on; a name's index is its class id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassList {
    names: Vec<String>,
}

impl ClassList {
    /// Parses `labels.txt` content. Blank lines are ignored.
    pub fn parse(text: &str, path: &Path) -> Result<Self, RsLabelError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

        let invalid = |message: String| RsLabelError::ClassListInvalid {
            path: path.to_path_buf(),
            message,
        };
        match lines.next() {
            Some(IGNORE_CLASS) => {}
            other => {
                return Err(invalid(format!(
                    "first class must be '{IGNORE_CLASS}', found {other:?}"
                )))
            }
        }
        match lines.next() {
            Some(BACKGROUND_CLASS) => {}
            other => {
                return Err(invalid(format!(
                    "second class must be '{BACKGROUND_CLASS}', found {other:?}"
                )))
            }
        }

        let mut names = vec![BACKGROUND_CLASS.to_string()];
        names.extend(lines.map(str::to_string));
        Ok(Self { names })
    }

    pub fn read(path: &Path) -> Result<Self, RsLabelError> {
        let text = fs::read_to_string(path).map_err(RsLabelError::Io)?;
        Self::parse(&text, path)
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `class_names.txt` content: names joined by newlines.
    pub fn to_class_names(&self) -> String {
        self.names.join("\n")
    }
}

/// Writes a `labels.txt`: the two reserved classes, then `labels`.
pub fn write_labels_txt(path: &Path, labels: &[String]) -> Result<(), RsLabelError> {
    let mut text = format!("{IGNORE_CLASS}\n{BACKGROUND_CLASS}\n");
    for label in labels {
        text.push_str(label);
        text.push('\n');
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(RsLabelError::Io)?;
    }
    fs::write(path, text).map_err(RsLabelError::Io)
}

/// Color of class `id` in the PASCAL VOC label colormap.
pub fn label_color(id: usize) -> Rgba {
    let (mut r, mut g, mut b) = (0u8, 0u8, 0u8);
    let mut bits = id;
    for shift in (0..8).rev() {
        r |= ((bits & 1) as u8) << shift;
        g |= (((bits >> 1) & 1) as u8) << shift;
        b |= (((bits >> 2) & 1) as u8) << shift;
        bits >>= 3;
    }
    [r, g, b, 255]
}

// ============================================================================
// Annotation XML
// ============================================================================

/// One `<object>` entry.
#[derive(Clone, Debug, PartialEq)]
pub struct VocObject {
    pub name: String,
    pub class_id: usize,
    pub probability: u8,
    pub bbox: BBoxXYXY<Pixel>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VocImage {
    pub filename: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Pixel bounding box of a region shape: the rectangle's corners or the
/// polygon's extent, moved to pixels and ordered so min < max.
pub fn voc_bbox(shape: &Shape, geo_transform: &GeoTransform) -> Option<BBoxXYXY<Pixel>> {
    let (a, b) = match shape.shape_type {
        ShapeKind::Rectangle => match shape.points.as_slice() {
            [a, b, ..] => (*a, *b),
            _ => return None,
        },
        ShapeKind::Polygon | ShapeKind::SlantRectangle => {
            let extent = BBoxXYXY::<Map>::from_points(&shape.points)?;
            (extent.min, extent.max)
        }
        ShapeKind::Line
        | ShapeKind::Linestrip
        | ShapeKind::Circle
        | ShapeKind::Point
        | ShapeKind::Other(_) => return None,
    };
    Some(BBoxXYXY::new(geo_transform.map_to_pixel(a), geo_transform.map_to_pixel(b)).normalized())
}

pub fn voc_xml_string(image: &VocImage, objects: &[VocObject]) -> Result<String, fmt::Error> {
    let mut xml = String::new();
    writeln!(xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>")?;
    writeln!(xml, "<annotation>")?;
    writeln!(xml, "  <folder>{JPEG_IMAGES_DIR}</folder>")?;
    writeln!(xml, "  <filename>{}</filename>", xml_escape(&image.filename))?;
    writeln!(xml, "  <path>{}</path>", xml_escape(&image.path))?;
    writeln!(xml, "  <source>")?;
    writeln!(xml, "    <database>Unknown</database>")?;
    writeln!(xml, "  </source>")?;
    writeln!(xml, "  <size>")?;
    writeln!(xml, "    <width>{}</width>", image.width)?;
    writeln!(xml, "    <height>{}</height>", image.height)?;
    writeln!(xml, "    <depth>{}</depth>", image.depth)?;
    writeln!(xml, "  </size>")?;
    writeln!(xml, "  <segmented>0</segmented>")?;

    for object in objects {
        writeln!(xml, "  <object>")?;
        writeln!(xml, "    <name>{}</name>", xml_escape(&object.name))?;
        writeln!(xml, "    <pose>Unspecified</pose>")?;
        writeln!(xml, "    <truncated>0</truncated>")?;
        writeln!(xml, "    <difficult>0</difficult>")?;
        writeln!(xml, "    <probability>{}</probability>", object.probability)?;
        writeln!(xml, "    <bndbox>")?;
        writeln!(xml, "      <xmin>{}</xmin>", object.bbox.xmin() as i64)?;
        writeln!(xml, "      <ymin>{}</ymin>", object.bbox.ymin() as i64)?;
        writeln!(xml, "      <xmax>{}</xmax>", object.bbox.xmax() as i64)?;
        writeln!(xml, "      <ymax>{}</ymax>", object.bbox.ymax() as i64)?;
        writeln!(xml, "    </bndbox>")?;
        writeln!(xml, "  </object>")?;
    }

    writeln!(xml, "</annotation>")?;
    Ok(xml)
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ============================================================================
// Directory export
// ============================================================================

/// Exports every label file under `source_dir` into a VOC tree in
/// `config.output_dir`.
///
/// A label file whose shapes use a class missing from `labels.txt` gets no
/// XML (its raster has already been copied); the run goes on with the next
/// file.
pub fn export_voc(
    source_dir: &Path,
    config: &ExportConfig,
    tiled: bool,
    backend: &dyn RasterBackend,
    report: &mut RunReport,
) -> Result<(), RsLabelError> {
    let out = &config.output_dir;
    let classes = ClassList::read(&config.class_list_path())?;
    log::info!("VOC classes: {:?}", classes.names());

    for dir in [JPEG_IMAGES_DIR, ANNOTATIONS_DIR, VISUALIZATION_DIR] {
        fs::create_dir_all(out.join(dir)).map_err(RsLabelError::Io)?;
    }
    fs::write(out.join(CLASS_NAMES_FILE), classes.to_class_names()).map_err(RsLabelError::Io)?;
    if !tiled {
        fs::write(out.join(VISUALIZATION_DIR).join("readme.txt"), VISUALIZATION_README)
            .map_err(RsLabelError::Io)?;
    }

    for label_path in source_label_files(source_dir, config)? {
        export_voc_label_file(&label_path, &classes, config, tiled, backend, report)?;
    }
    Ok(())
}

fn export_voc_label_file(
    label_path: &Path,
    classes: &ClassList,
    config: &ExportConfig,
    tiled: bool,
    backend: &dyn RasterBackend,
    report: &mut RunReport,
) -> Result<(), RsLabelError> {
    let out = &config.output_dir;
    let Some(label) = read_source_label_file(label_path, report)? else {
        return Ok(());
    };
    report.counts.label_files += 1;

    let Some(raster) = locate_raster(label_path, &label, config) else {
        log::warn!("no raster found for {}, skipping", label_path.display());
        report.counts.skipped_label_files += 1;
        report.add(RunIssue::warning(
            RunIssueCode::MissingRaster,
            format!("no raster found for {}", label_path.display()),
        ));
        return Ok(());
    };

    let base = label_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out_image = out.join(JPEG_IMAGES_DIR).join(&label.image_path);
    if let Some(parent) = out_image.parent() {
        fs::create_dir_all(parent).map_err(RsLabelError::Io)?;
    }
    log::debug!("copying {} to {}", raster.display(), out_image.display());
    fs::copy(&raster, &out_image).map_err(RsLabelError::Io)?;

    let info = backend.open_raster(&raster)?;
    let geo_transform = label
        .geo_transform
        .or(info.geo_transform)
        .unwrap_or_else(|| GeoTransform::identity_for_height(label.image_height));
    geo_transform.ensure_valid(label_path)?;

    let mut objects = Vec::new();
    for shape in &label.shapes {
        if !shape.shape_type.is_region() {
            log::debug!(
                "skipping shape '{}' of kind {} in {}",
                shape.label,
                shape.shape_type,
                label_path.display()
            );
            report.add(RunIssue::info(
                RunIssueCode::UnsupportedShapeKind,
                format!(
                    "{} shape '{}' in {} is not written to VOC",
                    shape.shape_type,
                    shape.label,
                    label_path.display()
                ),
            ));
            continue;
        }
        report.note_label(&shape.label);

        let Some(class_id) = classes.id_of(&shape.label) else {
            let err = RsLabelError::UnknownClass {
                path: label_path.to_path_buf(),
                label: shape.label.clone(),
            };
            log::warn!("{err}; no annotation written for this raster");
            report.counts.skipped_label_files += 1;
            report.add(RunIssue::warning(RunIssueCode::UnknownClass, err.to_string()));
            return Ok(());
        };
        let Some(bbox) = voc_bbox(shape, &geo_transform) else {
            log::debug!(
                "skipping {} shape '{}' in {}: no bounding box",
                shape.shape_type,
                shape.label,
                label_path.display()
            );
            report.add(RunIssue::info(
                RunIssueCode::UnsupportedShapeKind,
                format!(
                    "{} shape '{}' in {} has too few points for a VOC box",
                    shape.shape_type,
                    shape.label,
                    label_path.display()
                ),
            ));
            continue;
        };
        objects.push(VocObject {
            name: shape.label.clone(),
            class_id,
            probability: shape.probability.unwrap_or(0),
            bbox,
        });
    }

    if tiled && !objects.is_empty() {
        let boxes: Vec<_> = objects.iter().map(|o| o.bbox).collect();
        let colors: Vec<_> = objects.iter().map(|o| label_color(o.class_id)).collect();
        let captions: Vec<_> = objects
            .iter()
            .map(|o| classes.names()[o.class_id].clone())
            .collect();
        let overlay = out.join(VISUALIZATION_DIR).join(format!("{base}.tif"));
        backend.render_instances(&raster, &overlay, &boxes, &colors, &captions)?;
    }

    let image = VocImage {
        filename: label.image_path.clone(),
        path: out_image.to_string_lossy().into_owned(),
        width: info.width,
        height: info.height,
        depth: info.bands.unwrap_or(1),
    };
    let xml_path = out.join(ANNOTATIONS_DIR).join(format!("{base}.xml"));
    let xml = voc_xml_string(&image, &objects).map_err(|e| RsLabelError::VocWrite {
        path: xml_path.clone(),
        message: e.to_string(),
    })?;
    fs::write(&xml_path, xml).map_err(RsLabelError::Io)?;

    report.counts.images += 1;
    report.counts.annotations += objects.len();
    Ok(())
}

/// `imagePath` resolved against the label file's directory, else the
/// sibling raster with a configured extension.
fn locate_raster(label_path: &Path, label: &LabelFile, config: &ExportConfig) -> Option<PathBuf> {
    let dir = label_path.parent().unwrap_or_else(|| Path::new(""));
    let named = dir.join(&label.image_path);
    if named.is_file() {
        return Some(named);
    }
    find_raster(label_path, &config.raster_extensions)
}

//! LabelMe JSON reader and writer.
//!
//! The schema is the LabelMe one with a few additions used for rasters:
//! `geoTrans` (the raster's geotransform) travels as an extra top-level key
//! and shapes may carry a `probability`. Every key this crate does not
//! interpret is kept, in order, so a load/save cycle is lossless.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use walkdir::WalkDir;

use super::model::{LabelFile, Rgba, Shape};
use crate::error::RsLabelError;
use crate::geo::GeoTransform;
use crate::report::RunReport;

/// The extension-map key holding the geotransform.
pub const GEO_TRANSFORM_KEY: &str = "geoTrans";

const LABEL_EXTENSION: &str = "json";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelFileSchema {
    image_path: String,

    #[serde(default)]
    image_data: Option<String>,

    image_width: u32,

    image_height: u32,

    #[serde(default)]
    line_color: Option<Rgba>,

    #[serde(default)]
    fill_color: Option<Rgba>,

    #[serde(default)]
    flags: Option<BTreeMap<String, bool>>,

    shapes: Vec<Shape>,

    #[serde(flatten)]
    other_data: JsonMap<String, Value>,
}

/// Reads a label file.
///
/// # Errors
/// `LabelFileParse` if the file is not JSON or lacks `shapes`, `imagePath`,
/// `imageHeight` or `imageWidth`; `LabelFileInvalid` if `geoTrans` is not a
/// list of six numbers.
pub fn read_label_file(path: &Path) -> Result<LabelFile, RsLabelError> {
    let file = File::open(path).map_err(RsLabelError::Io)?;
    let reader = BufReader::new(file);

    let schema: LabelFileSchema =
        serde_json::from_reader(reader).map_err(|source| RsLabelError::LabelFileParse {
            path: path.to_path_buf(),
            source,
        })?;

    schema_to_label(schema, path)
}

/// Reads a source label file for a run.
///
/// A file that is not valid label JSON is recorded in `report` and comes
/// back as `Ok(None)`; I/O errors still fail.
pub fn read_source_label_file(
    path: &Path,
    report: &mut RunReport,
) -> Result<Option<LabelFile>, RsLabelError> {
    match read_label_file(path) {
        Ok(label) => Ok(Some(label)),
        Err(err) if err.is_invalid_label_file() => {
            report.skip_invalid_label_file(&err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Writes a label file, creating parent directories as needed.
///
/// The JSON is written to a temporary sibling first and renamed into place,
/// so readers never observe a half-written file.
pub fn write_label_file(path: &Path, label: &LabelFile) -> Result<(), RsLabelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(RsLabelError::Io)?;
    }

    let tmp_path = temp_sibling(path);
    let result = write_then_rename(&tmp_path, path, label);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_then_rename(tmp_path: &Path, path: &Path, label: &LabelFile) -> Result<(), RsLabelError> {
    let file = File::create(tmp_path).map_err(RsLabelError::Io)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &label_to_schema(label)).map_err(|source| {
        RsLabelError::LabelFileWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(RsLabelError::Io)?;
    drop(writer);

    fs::rename(tmp_path, path).map_err(RsLabelError::Io)
}

/// Reads a label file from a JSON string.
///
/// Useful for testing without file I/O.
pub fn from_label_str(json: &str) -> Result<LabelFile, RsLabelError> {
    let memory = Path::new("<memory>");
    let schema: LabelFileSchema =
        serde_json::from_str(json).map_err(|source| RsLabelError::LabelFileParse {
            path: memory.to_path_buf(),
            source,
        })?;
    schema_to_label(schema, memory)
}

/// Reads a label file from raw bytes.
pub fn from_label_slice(bytes: &[u8]) -> Result<LabelFile, RsLabelError> {
    let memory = Path::new("<memory>");
    let schema: LabelFileSchema =
        serde_json::from_slice(bytes).map_err(|source| RsLabelError::LabelFileParse {
            path: memory.to_path_buf(),
            source,
        })?;
    schema_to_label(schema, memory)
}

/// Writes a label file to a pretty-printed JSON string.
pub fn to_label_string(label: &LabelFile) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&label_to_schema(label))
}

/// All `*.json` files below `dir`, recursively, in sorted path order.
pub fn collect_label_files(dir: &Path) -> Result<Vec<PathBuf>, RsLabelError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| {
            RsLabelError::Io(std::io::Error::other(format!(
                "failed while traversing {}: {source}",
                dir.display()
            )))
        })?;
        if entry.file_type().is_file() && has_label_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn schema_to_label(schema: LabelFileSchema, path: &Path) -> Result<LabelFile, RsLabelError> {
    let mut other_data = schema.other_data;
    let geo_transform = match other_data.shift_remove(GEO_TRANSFORM_KEY) {
        None | Some(Value::Null) => None,
        Some(raw) => Some(serde_json::from_value::<GeoTransform>(raw).map_err(|source| {
            RsLabelError::LabelFileInvalid {
                path: path.to_path_buf(),
                message: format!("'{GEO_TRANSFORM_KEY}' must be a list of 6 numbers: {source}"),
            }
        })?),
    };

    Ok(LabelFile {
        image_path: schema.image_path,
        image_data: schema.image_data,
        image_width: schema.image_width,
        image_height: schema.image_height,
        line_color: schema.line_color,
        fill_color: schema.fill_color,
        flags: schema.flags.unwrap_or_default(),
        shapes: schema.shapes,
        geo_transform,
        other_data,
    })
}

fn label_to_schema(label: &LabelFile) -> LabelFileSchema {
    let mut other_data = label.other_data.clone();
    if let Some(gt) = label.geo_transform {
        other_data.insert(
            GEO_TRANSFORM_KEY.to_string(),
            Value::from(gt.coefficients().to_vec()),
        );
    }

    LabelFileSchema {
        image_path: label.image_path.clone(),
        image_data: label.image_data.clone(),
        image_width: label.image_width,
        image_height: label.image_height,
        line_color: label.line_color,
        fill_color: label.fill_color,
        flags: Some(label.flags.clone()),
        shapes: label.shapes.clone(),
        other_data,
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn has_label_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(LABEL_EXTENSION))
        .unwrap_or(false)
}

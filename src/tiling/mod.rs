//! Splitting annotated rasters into tiles.
//!
//! For every label file with a raster next to it, the raster's tile grid is
//! walked row by row. Each shape is clipped to each tile; tiles that end up
//! with at least one shape get their own label file, and only those tiles
//! are cut out of the raster.
//!
//! Output layout, for a label file `scene.json` next to `scene.tif`:
//!
//! ```text
//! {output_dir}/tiles/scene/scene_0_0.json
//! {output_dir}/tiles/scene/scene_0_0.tif
//! {output_dir}/tiles/scene/scene_0_1.json
//! ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::RsLabelError;
use crate::geo::{GeoTransform, TileCoord, TileFrame, TileGrid, TileRect};
use crate::label::io_label_json::{collect_label_files, read_source_label_file, write_label_file};
use crate::label::{LabelFile, Shape};
use crate::raster::{find_raster, RasterBackend};
use crate::report::{RunIssue, RunIssueCode, RunReport};

/// Directory under the output directory that receives tile groups.
pub const TILES_DIR_NAME: &str = "tiles";

/// What was written for one source label file.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitOutcome {
    pub label_path: PathBuf,
    pub raster_path: PathBuf,
    /// The tile group directory.
    pub out_dir: PathBuf,
    /// Tiles that received shapes, in row-major order.
    pub tiles: Vec<TileCoord>,
}

/// Splits every label file under `config.input_dir` into
/// `config.output_dir/tiles`.
///
/// Label files without a raster, and `.json` files that are not label files,
/// are skipped and reported. An I/O or write failure, or a degenerate
/// geotransform, stops the run.
///
/// The tiles directory is always created, even when no tile gets a shape.
pub fn split_dataset(
    config: &ExportConfig,
    backend: &dyn RasterBackend,
) -> Result<RunReport, RsLabelError> {
    config.validate()?;
    let tiles_dir = config.tiles_dir();
    let mut report = RunReport::new("split");

    let label_files = collect_label_files(&config.input_dir)?;
    fs::create_dir_all(&tiles_dir).map_err(RsLabelError::Io)?;
    log::info!(
        "splitting {} label files from {} into {}x{} tiles",
        label_files.len(),
        config.input_dir.display(),
        config.tile_size,
        config.tile_size
    );

    for label_path in label_files {
        // Output of an earlier run inside the input tree is not a source.
        if label_path.starts_with(&tiles_dir) {
            continue;
        }
        if let Some(outcome) = split_label_file(&label_path, config, backend, &mut report)? {
            log::debug!(
                "{} + {}: {} tiles in {}",
                outcome.label_path.display(),
                outcome.raster_path.display(),
                outcome.tiles.len(),
                outcome.out_dir.display()
            );
        }
    }

    log::info!(
        "split finished: {} tiles written, {} empty tiles skipped",
        report.counts.tiles_written,
        report.counts.tiles_skipped
    );
    Ok(report)
}

/// Splits one label file. `Ok(None)` means it was skipped (no raster, or
/// not a label file).
pub fn split_label_file(
    label_path: &Path,
    config: &ExportConfig,
    backend: &dyn RasterBackend,
    report: &mut RunReport,
) -> Result<Option<SplitOutcome>, RsLabelError> {
    let Some(raster_path) = find_raster(label_path, &config.raster_extensions) else {
        log::warn!("no raster found for {}, skipping", label_path.display());
        report.counts.skipped_label_files += 1;
        report.add(RunIssue::warning(
            RunIssueCode::MissingRaster,
            format!("no raster found for {}", label_path.display()),
        ));
        return Ok(None);
    };

    let Some(label) = read_source_label_file(label_path, report)? else {
        return Ok(None);
    };
    report.counts.label_files += 1;
    for shape in &label.shapes {
        report.note_label(&shape.label);
    }

    let geo_transform = resolve_geo_transform(&label, &raster_path, backend)?;
    geo_transform.ensure_valid(label_path)?;

    let base = file_stem(label_path)?;
    let raster_ext = raster_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let out_dir = config.tiles_dir().join(&base);

    log::info!(
        "splitting {} ({}x{}, {} shapes)",
        label_path.display(),
        label.image_width,
        label.image_height,
        label.shapes.len()
    );

    let grid = TileGrid::new(label.image_width, label.image_height, config.tile_size)?;
    let mut kept = Vec::new();

    for tile in grid.tiles() {
        let frame = TileFrame::new(geo_transform, tile, config.tile_size);
        let shapes: Vec<Shape> = label.shapes.iter().filter_map(|s| frame.clip(s)).collect();

        if shapes.is_empty() {
            log::debug!("tile {}_{} is empty", tile.coord.row, tile.coord.col);
            report.counts.tiles_skipped += 1;
            continue;
        }

        let name = format!("{base}_{}_{}", tile.coord.row, tile.coord.col);
        let tile_label = tile_label_file(
            &label,
            &tile,
            frame.geo_transform(),
            format!("{name}{raster_ext}"),
            shapes,
        );
        let tile_path = out_dir.join(format!("{name}.json"));
        log::debug!(
            "writing {} with {} shapes",
            tile_path.display(),
            tile_label.shapes.len()
        );
        write_label_file(&tile_path, &tile_label)?;

        report.counts.tiles_written += 1;
        kept.push(tile.coord);
    }

    backend.extract_tiles(&raster_path, config.tile_size, &out_dir, &kept)?;

    Ok(Some(SplitOutcome {
        label_path: label_path.to_path_buf(),
        raster_path,
        out_dir,
        tiles: kept,
    }))
}

/// The label's own `geoTrans`, else the raster's, else the identity
/// substitute for the label's height.
pub fn resolve_geo_transform(
    label: &LabelFile,
    raster_path: &Path,
    backend: &dyn RasterBackend,
) -> Result<GeoTransform, RsLabelError> {
    if let Some(gt) = label.geo_transform {
        return Ok(gt);
    }
    let info = backend.open_raster(raster_path)?;
    Ok(info
        .geo_transform
        .unwrap_or_else(|| GeoTransform::identity_for_height(label.image_height)))
}

fn tile_label_file(
    source: &LabelFile,
    tile: &TileRect,
    geo_transform: GeoTransform,
    image_path: String,
    shapes: Vec<Shape>,
) -> LabelFile {
    LabelFile {
        image_path,
        image_data: None,
        image_width: tile.width,
        image_height: tile.height,
        line_color: source.line_color,
        fill_color: source.fill_color,
        flags: source.flags.clone(),
        shapes,
        geo_transform: Some(geo_transform),
        other_data: source.other_data.clone(),
    }
}

fn file_stem(path: &Path) -> Result<String, RsLabelError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| RsLabelError::LabelFileInvalid {
            path: path.to_path_buf(),
            message: "label file name is not valid UTF-8".to_string(),
        })
}

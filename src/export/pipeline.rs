use std::fs;
use std::path::Path;

use super::io_coco_json::{export_coco_tiled, export_coco_untiled, COCO_RASTER_DIR};
use super::io_voc_xml::{export_voc, write_labels_txt, ANNOTATIONS_DIR, JPEG_IMAGES_DIR, VISUALIZATION_DIR};
use super::source_label_files;
use crate::config::{ExportConfig, ExportFormat};
use crate::error::RsLabelError;
use crate::label::io_label_json::read_label_file;
use crate::raster::RasterBackend;
use crate::report::RunReport;
use crate::tiling::split_dataset;

/// Exports `config.input_dir` as a COCO or VOC dataset into
/// `config.output_dir`.
///
/// Steps: prepare the output directory, split into tiles when `tiled` is
/// set, regenerate `labels.txt` from the labels seen, then run the format
/// exporter over the tiles (or the input directory).
pub fn run_export(
    config: &ExportConfig,
    backend: &dyn RasterBackend,
) -> Result<RunReport, RsLabelError> {
    config.validate()?;
    let mut report = RunReport::new(config.format.as_str());

    prepare_output_dir(config)?;
    let layout: &[&str] = match config.format {
        ExportFormat::Voc => &[JPEG_IMAGES_DIR, ANNOTATIONS_DIR, VISUALIZATION_DIR],
        ExportFormat::Coco => &[COCO_RASTER_DIR],
    };
    for dir in layout {
        fs::create_dir_all(config.output_dir.join(dir)).map_err(RsLabelError::Io)?;
    }

    let (source_dir, labels) = if config.tiled {
        let split = split_dataset(config, backend)?;
        let labels = split.labels.clone();
        report.absorb(split);
        (config.tiles_dir(), labels)
    } else {
        (config.input_dir.clone(), collect_labels(&config.input_dir, config)?)
    };

    let class_list = config.class_list_path();
    log::info!("writing {} ({} labels)", class_list.display(), labels.len());
    write_labels_txt(&class_list, &labels)?;

    log::info!(
        "exporting {} as {}",
        source_dir.display(),
        config.format.as_str()
    );
    match (config.format, config.tiled) {
        (ExportFormat::Coco, true) => export_coco_tiled(&source_dir, config, backend, &mut report)?,
        (ExportFormat::Coco, false) => {
            export_coco_untiled(&source_dir, config, backend, &mut report)?
        }
        (ExportFormat::Voc, tiled) => export_voc(&source_dir, config, tiled, backend, &mut report)?,
    }

    Ok(report)
}

/// Creates `config.output_dir`, clearing it first when it is not empty and
/// `overwrite` is set.
pub fn prepare_output_dir(config: &ExportConfig) -> Result<(), RsLabelError> {
    let out = &config.output_dir;
    if !out.exists() {
        return fs::create_dir_all(out).map_err(RsLabelError::Io);
    }

    let is_empty = fs::read_dir(out)
        .map_err(RsLabelError::Io)?
        .next()
        .is_none();
    if is_empty {
        return Ok(());
    }
    if !config.overwrite {
        return Err(RsLabelError::OutputNotEmpty { path: out.clone() });
    }
    if contains(out, &config.input_dir)? {
        return Err(RsLabelError::InvalidConfig(format!(
            "refusing to clear {}: it contains the input directory",
            out.display()
        )));
    }

    log::info!("clearing {}", out.display());
    fs::remove_dir_all(out).map_err(RsLabelError::Io)?;
    fs::create_dir_all(out).map_err(RsLabelError::Io)
}

/// Every shape label under `source_dir`, in first-seen order.
///
/// Files that are not label JSON are passed over; the exporter reports them.
pub fn collect_labels(source_dir: &Path, config: &ExportConfig) -> Result<Vec<String>, RsLabelError> {
    let mut labels: Vec<String> = Vec::new();
    for path in source_label_files(source_dir, config)? {
        let label = match read_label_file(&path) {
            Ok(label) => label,
            Err(err) if err.is_invalid_label_file() => {
                log::warn!("{err}; no labels taken from it");
                continue;
            }
            Err(err) => return Err(err),
        };
        for shape in label.shapes {
            if !labels.contains(&shape.label) {
                labels.push(shape.label);
            }
        }
    }
    Ok(labels)
}

fn contains(dir: &Path, path: &Path) -> Result<bool, RsLabelError> {
    let dir = dir.canonicalize().map_err(RsLabelError::Io)?;
    Ok(path
        .canonicalize()
        .map(|path| path.starts_with(&dir))
        .unwrap_or(false))
}

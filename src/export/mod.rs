//! Dataset exports: COCO JSON and Pascal VOC.
//!
//! [`run_export`] is the end-to-end action; the format modules can also be
//! driven directly.

mod ids;
pub mod io_coco_json;
pub mod io_voc_xml;
mod pipeline;

use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::RsLabelError;
use crate::label::io_label_json::collect_label_files;

pub use ids::{AnnotationId, CategoryId, ImageId};
pub use io_coco_json::CocoBuilder;
pub use io_voc_xml::{write_labels_txt, ClassList};
pub use pipeline::{collect_labels, prepare_output_dir, run_export};

/// Label files under `source_dir`, leaving out anything inside the output
/// directory unless the source itself lives there (tiled runs).
pub(crate) fn source_label_files(
    source_dir: &Path,
    config: &ExportConfig,
) -> Result<Vec<PathBuf>, RsLabelError> {
    let files = collect_label_files(source_dir)?;
    let out = &config.output_dir;
    if out.as_os_str().is_empty() || source_dir.starts_with(out) {
        return Ok(files);
    }
    Ok(files
        .into_iter()
        .filter(|path| !path.starts_with(out))
        .collect())
}

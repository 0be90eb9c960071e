//! Export configuration.
//!
//! Every run takes an explicit [`ExportConfig`]; nothing is read from global
//! state. A config can be built in code, loaded from YAML, or assembled by
//! the CLI from flags on top of a YAML file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RsLabelError;

pub const DEFAULT_TILE_SIZE: u32 = 1000;

/// Raster extensions tried, in order, when looking for a label file's raster.
pub const DEFAULT_RASTER_EXTENSIONS: [&str; 8] = [
    ".tif", ".env", ".pix", ".img", ".tiff", ".ecw", ".tga", ".jpg",
];

/// Name of the class list written next to an export.
pub const CLASS_LIST_FILE_NAME: &str = "labels.txt";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Coco,
    Voc,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coco => "coco",
            Self::Voc => "voc",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Directory searched recursively for label files.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    /// Split rasters into tiles before exporting.
    pub tiled: bool,
    pub tile_size: u32,
    /// Clear a non-empty output directory instead of failing.
    pub overwrite: bool,
    /// Where `labels.txt` lives; `<output_dir>/labels.txt` when unset.
    pub class_list: Option<PathBuf>,
    pub raster_extensions: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            format: ExportFormat::default(),
            tiled: false,
            tile_size: DEFAULT_TILE_SIZE,
            overwrite: false,
            class_list: None,
            raster_extensions: DEFAULT_RASTER_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ExportConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Loads a config from a YAML file. Missing keys take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, RsLabelError> {
        let file = File::open(path).map_err(RsLabelError::Io)?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| {
            RsLabelError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RsLabelError> {
        serde_yaml::from_str(yaml).map_err(|source| RsLabelError::ConfigParse {
            path: PathBuf::from("<memory>"),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), RsLabelError> {
        if self.tile_size == 0 {
            return Err(RsLabelError::InvalidConfig(
                "tile_size must be greater than zero".to_string(),
            ));
        }
        if self.raster_extensions.is_empty() {
            return Err(RsLabelError::InvalidConfig(
                "raster_extensions must list at least one extension".to_string(),
            ));
        }
        if let Some(bad) = self
            .raster_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(RsLabelError::InvalidConfig(format!(
                "raster extension '{bad}' must look like '.tif'"
            )));
        }
        if self.input_dir.as_os_str().is_empty() {
            return Err(RsLabelError::InvalidConfig(
                "input_dir is required".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(RsLabelError::InvalidConfig(
                "output_dir is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn class_list_path(&self) -> PathBuf {
        self.class_list
            .clone()
            .unwrap_or_else(|| self.output_dir.join(CLASS_LIST_FILE_NAME))
    }

    /// Where the splitter writes when tiling is on.
    pub fn tiles_dir(&self) -> PathBuf {
        self.output_dir.join(crate::tiling::TILES_DIR_NAME)
    }
}

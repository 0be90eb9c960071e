use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rslabel operations.
#[derive(Debug, Error)]
pub enum RsLabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse label file {path}: {source}")]
    LabelFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid label file {path}: {message}")]
    LabelFileInvalid { path: PathBuf, message: String },

    #[error("Failed to write label file {path}: {source}")]
    LabelFileWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write VOC annotation {path}: {message}")]
    VocWrite { path: PathBuf, message: String },

    #[error("Label '{label}' in {path} is not listed in the class list")]
    UnknownClass { path: PathBuf, label: String },

    #[error("Invalid class list {path}: {message}")]
    ClassListInvalid { path: PathBuf, message: String },

    #[error("Degenerate geotransform {coefficients:?} in {path}: pixel width and height must be non-zero")]
    DegenerateGeoTransform {
        path: PathBuf,
        coefficients: [f64; 6],
    },

    #[error("Raster error for {path}: {message}")]
    Raster { path: PathBuf, message: String },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Output directory {path} is not empty (use --overwrite to replace its contents)")]
    OutputNotEmpty { path: PathBuf },
}

impl RsLabelError {
    /// True for a label file that exists but is not valid label JSON.
    ///
    /// Runs skip such files and carry on; every other error stops the run.
    pub fn is_invalid_label_file(&self) -> bool {
        matches!(
            self,
            RsLabelError::LabelFileParse { .. } | RsLabelError::LabelFileInvalid { .. }
        )
    }
}

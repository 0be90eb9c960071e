#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rslabel::geo::{BBoxXYXY, Pixel, TileCoord};
use rslabel::label::io_label_json::write_label_file;
use rslabel::label::{LabelFile, Rgba};
use rslabel::raster::{RasterBackend, RasterInfo};
use rslabel::RsLabelError;

/// A backend that never touches pixel data: `open_raster` answers with fixed
/// values and the other calls are recorded.
pub struct RecordingBackend {
    pub info: RasterInfo,
    pub extracted: RefCell<Vec<Extraction>>,
    pub rendered: RefCell<Vec<Rendering>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub raster: PathBuf,
    pub tile_size: u32,
    pub out_dir: PathBuf,
    pub tiles: Vec<TileCoord>,
}

#[derive(Clone, Debug)]
pub struct Rendering {
    pub raster: PathBuf,
    pub out: PathBuf,
    pub boxes: Vec<BBoxXYXY<Pixel>>,
    pub colors: Vec<Rgba>,
    pub captions: Vec<String>,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32, bands: u32) -> Self {
        Self {
            info: RasterInfo {
                width,
                height,
                bands: Some(bands),
                geo_transform: None,
            },
            extracted: RefCell::new(Vec::new()),
            rendered: RefCell::new(Vec::new()),
        }
    }
}

impl RasterBackend for RecordingBackend {
    fn open_raster(&self, _path: &Path) -> Result<RasterInfo, RsLabelError> {
        Ok(self.info)
    }

    fn extract_tiles(
        &self,
        raster: &Path,
        tile_size: u32,
        out_dir: &Path,
        tiles: &[TileCoord],
    ) -> Result<(), RsLabelError> {
        self.extracted.borrow_mut().push(Extraction {
            raster: raster.to_path_buf(),
            tile_size,
            out_dir: out_dir.to_path_buf(),
            tiles: tiles.to_vec(),
        });
        Ok(())
    }

    fn render_instances(
        &self,
        raster: &Path,
        out: &Path,
        boxes: &[BBoxXYXY<Pixel>],
        colors: &[Rgba],
        captions: &[String],
    ) -> Result<(), RsLabelError> {
        self.rendered.borrow_mut().push(Rendering {
            raster: raster.to_path_buf(),
            out: out.to_path_buf(),
            boxes: boxes.to_vec(),
            colors: colors.to_vec(),
            captions: captions.to_vec(),
        });
        Ok(())
    }
}

/// Writes `label` to `dir/{stem}.json` next to an empty `dir/{stem}.tif`.
///
/// The raster is only a placeholder; use [`write_tif`] when pixels matter.
pub fn write_pair(dir: &Path, stem: &str, label: &LabelFile) -> PathBuf {
    fs::create_dir_all(dir).expect("create dir");
    fs::write(dir.join(format!("{stem}.tif")), b"").expect("write placeholder raster");
    let path = dir.join(format!("{stem}.json"));
    write_label_file(&path, label).expect("write label file");
    path
}

/// Writes a real RGB TIFF with a gradient so tiles differ.
pub fn write_tif(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).expect("write tif");
}

/// Relative paths of every file under `dir`, sorted.
pub fn tree(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .expect("entry under dir")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

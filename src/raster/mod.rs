//! Raster access: dimensions, georeferencing, tile extraction and overlays.
//!
//! The splitter and the exporters only talk to [`RasterBackend`], so a GDAL
//! binding or a test double can stand in for [`ImageRasterBackend`].

mod world_file;

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageDecoder, Rgba as RgbaPixel, RgbaImage};

use crate::error::RsLabelError;
use crate::geo::{BBoxXYXY, GeoTransform, Pixel, TileCoord, TileGrid};
use crate::label::Rgba;

pub use world_file::{parse_world_file, read_world_file, world_file_candidates};

/// What a backend knows about one raster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    /// Band (channel) count, when the backend can tell.
    pub bands: Option<u32>,
    pub geo_transform: Option<GeoTransform>,
}

pub trait RasterBackend {
    fn open_raster(&self, path: &Path) -> Result<RasterInfo, RsLabelError>;

    /// Writes `{stem}_{row}_{col}.{ext}` into `out_dir` for each of `tiles`.
    fn extract_tiles(
        &self,
        raster: &Path,
        tile_size: u32,
        out_dir: &Path,
        tiles: &[TileCoord],
    ) -> Result<(), RsLabelError>;

    /// Draws one box per instance over `raster` and saves the result to `out`.
    ///
    /// `boxes`, `colors` and `captions` are parallel slices.
    fn render_instances(
        &self,
        raster: &Path,
        out: &Path,
        boxes: &[BBoxXYXY<Pixel>],
        colors: &[Rgba],
        captions: &[String],
    ) -> Result<(), RsLabelError>;
}

/// The raster next to `label_path`: the label path with its last extension
/// replaced by the first of `extensions` that exists.
pub fn find_raster(label_path: &Path, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| label_path.with_extension(ext.trim_start_matches('.')))
        .find(|candidate| candidate.is_file())
}

/// A backend built on the `image` crate, georeferenced through world files.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageRasterBackend;

impl ImageRasterBackend {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, path: &Path) -> Result<DynamicImage, RsLabelError> {
        image::open(path).map_err(|e| raster_error(path, e))
    }

    fn band_count(&self, path: &Path) -> Option<u32> {
        let reader = image::ImageReader::open(path)
            .ok()?
            .with_guessed_format()
            .ok()?;
        let decoder = reader.into_decoder().ok()?;
        Some(u32::from(decoder.color_type().channel_count()))
    }
}

impl RasterBackend for ImageRasterBackend {
    fn open_raster(&self, path: &Path) -> Result<RasterInfo, RsLabelError> {
        let size = imagesize::size(path).map_err(|e| raster_error(path, e))?;
        let width = u32::try_from(size.width).map_err(|_| RsLabelError::Raster {
            path: path.to_path_buf(),
            message: format!("width {} does not fit in u32", size.width),
        })?;
        let height = u32::try_from(size.height).map_err(|_| RsLabelError::Raster {
            path: path.to_path_buf(),
            message: format!("height {} does not fit in u32", size.height),
        })?;

        let geo_transform = world_file_candidates(path)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .map(|world| read_world_file(&world))
            .transpose()?;

        Ok(RasterInfo {
            width,
            height,
            bands: self.band_count(path),
            geo_transform,
        })
    }

    fn extract_tiles(
        &self,
        raster: &Path,
        tile_size: u32,
        out_dir: &Path,
        tiles: &[TileCoord],
    ) -> Result<(), RsLabelError> {
        if tiles.is_empty() {
            return Ok(());
        }
        let image = self.load(raster)?;
        let grid = TileGrid::new(image.width(), image.height(), tile_size)?;
        let (stem, ext) = stem_and_extension(raster)?;
        fs::create_dir_all(out_dir).map_err(RsLabelError::Io)?;

        for coord in tiles {
            let rect = grid
                .tile(coord.row, coord.col)
                .ok_or_else(|| RsLabelError::Raster {
                    path: raster.to_path_buf(),
                    message: format!(
                        "tile ({}, {}) is outside the {}x{} grid",
                        coord.row, coord.col, grid.rows, grid.columns
                    ),
                })?;
            let out = out_dir.join(format!("{stem}_{}_{}.{ext}", coord.row, coord.col));
            log::debug!("cutting tile {} ({}x{})", out.display(), rect.width, rect.height);
            image
                .crop_imm(rect.x, rect.y, rect.width, rect.height)
                .save(&out)
                .map_err(|e| raster_error(&out, e))?;
        }
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
        let mut canvas = self.load(raster)?.to_rgba8();

        for (i, bbox) in boxes.iter().enumerate() {
            let color = colors.get(i).copied().unwrap_or([255, 0, 0, 255]);
            draw_outline(&mut canvas, bbox, RgbaPixel(color));
            if let Some(caption) = captions.get(i) {
                log::debug!("instance {i} '{caption}' at {bbox:?}");
            }
        }

        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(RsLabelError::Io)?;
        }
        canvas.save(out).map_err(|e| raster_error(out, e))
    }
}

fn draw_outline(canvas: &mut RgbaImage, bbox: &BBoxXYXY<Pixel>, color: RgbaPixel<u8>) {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let bbox = bbox.normalized();
    let clamp = |v: f64, max: u32| v.max(0.0).min(f64::from(max - 1)) as u32;
    let (x0, x1) = (clamp(bbox.xmin(), w), clamp(bbox.xmax(), w));
    let (y0, y1) = (clamp(bbox.ymin(), h), clamp(bbox.ymax(), h));

    for x in x0..=x1 {
        canvas.put_pixel(x, y0, color);
        canvas.put_pixel(x, y1, color);
    }
    for y in y0..=y1 {
        canvas.put_pixel(x0, y, color);
        canvas.put_pixel(x1, y, color);
    }
}

fn stem_and_extension(path: &Path) -> Result<(String, String), RsLabelError> {
    let stem = path.file_stem().and_then(|s| s.to_str());
    let ext = path.extension().and_then(|s| s.to_str());
    match (stem, ext) {
        (Some(stem), Some(ext)) => Ok((stem.to_string(), ext.to_string())),
        _ => Err(RsLabelError::Raster {
            path: path.to_path_buf(),
            message: "raster path needs a UTF-8 file stem and extension".to_string(),
        }),
    }
}

fn raster_error(path: &Path, err: impl std::fmt::Display) -> RsLabelError {
    RsLabelError::Raster {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            RgbaPixel([(x % 256) as u8, (y % 256) as u8, 0, 255])
        });
        img.save(path).expect("write png");
    }

    #[test]
    fn find_raster_tries_extensions_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let label = temp.path().join("scene.json");
        fs::write(temp.path().join("scene.jpg"), b"").unwrap();
        fs::write(temp.path().join("scene.tiff"), b"").unwrap();

        let exts: Vec<String> = [".tif", ".tiff", ".jpg"].iter().map(|s| s.to_string()).collect();
        assert_eq!(find_raster(&label, &exts), Some(temp.path().join("scene.tiff")));
        assert_eq!(find_raster(&label, &exts[..1]), None);
    }

    #[test]
    fn open_raster_reads_size_bands_and_world_file() {
        let temp = tempfile::tempdir().unwrap();
        let raster = temp.path().join("scene.png");
        write_png(&raster, 30, 20);
        fs::write(
            temp.path().join("scene.pgw"),
            "2.0\n0.0\n0.0\n-2.0\n101.0\n199.0\n",
        )
        .unwrap();

        let info = ImageRasterBackend::new().open_raster(&raster).unwrap();
        assert_eq!((info.width, info.height), (30, 20));
        assert_eq!(info.bands, Some(4));
        assert_eq!(
            info.geo_transform.map(|g| g.coefficients()),
            Some([100.0, 2.0, 0.0, 200.0, 0.0, -2.0])
        );
    }

    #[test]
    fn extract_tiles_writes_only_requested_tiles_with_real_sizes() {
        let temp = tempfile::tempdir().unwrap();
        let raster = temp.path().join("scene.png");
        write_png(&raster, 25, 15);
        let out = temp.path().join("tiles");

        ImageRasterBackend::new()
            .extract_tiles(&raster, 10, &out, &[TileCoord::new(0, 0), TileCoord::new(1, 2)])
            .unwrap();

        assert!(out.join("scene_0_0.png").is_file());
        assert!(!out.join("scene_0_1.png").exists());
        let last = imagesize::size(out.join("scene_1_2.png")).unwrap();
        assert_eq!((last.width, last.height), (5, 5));
    }

    #[test]
    fn extract_tiles_rejects_coords_outside_grid() {
        let temp = tempfile::tempdir().unwrap();
        let raster = temp.path().join("scene.png");
        write_png(&raster, 10, 10);

        let err = ImageRasterBackend::new()
            .extract_tiles(&raster, 10, temp.path(), &[TileCoord::new(1, 0)])
            .unwrap_err();
        assert!(matches!(err, RsLabelError::Raster { .. }));
    }

    #[test]
    fn render_instances_draws_box_outlines() {
        let temp = tempfile::tempdir().unwrap();
        let raster = temp.path().join("scene.png");
        RgbaImage::from_pixel(20, 20, RgbaPixel([0, 0, 0, 255]))
            .save(&raster)
            .unwrap();
        let out = temp.path().join("vis/scene.png");

        ImageRasterBackend::new()
            .render_instances(
                &raster,
                &out,
                &[BBoxXYXY::from_xyxy(2.0, 3.0, 8.0, 9.0)],
                &[[128, 0, 0, 255]],
                &["house".to_string()],
            )
            .unwrap();

        let drawn = image::open(&out).unwrap().to_rgba8();
        assert_eq!(drawn.get_pixel(2, 3).0, [128, 0, 0, 255]);
        assert_eq!(drawn.get_pixel(8, 9).0, [128, 0, 0, 255]);
        assert_eq!(drawn.get_pixel(5, 6).0, [0, 0, 0, 255]);
    }
}

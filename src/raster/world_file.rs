//! ESRI world files.
//!
//! Six lines: A (pixel width), D (row rotation), B (column rotation),
//! E (pixel height), C and F (map position of the *center* of the top-left
//! pixel). GDAL geotransforms anchor at the pixel corner instead.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RsLabelError;
use crate::geo::GeoTransform;

/// Sidecar names checked for `raster`, in order: `.tfw`-style (first and
/// last letter of the extension plus `w`), `.tifw`-style, then `.wld`.
pub fn world_file_candidates(raster: &Path) -> Vec<PathBuf> {
    let Some(ext) = raster.extension().and_then(|e| e.to_str()) else {
        return vec![raster.with_extension("wld")];
    };
    let mut candidates = Vec::with_capacity(3);
    let mut chars = ext.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        candidates.push(raster.with_extension(format!("{first}{last}w")));
    }
    candidates.push(raster.with_extension(format!("{ext}w")));
    candidates.push(raster.with_extension("wld"));
    candidates
}

pub fn read_world_file(path: &Path) -> Result<GeoTransform, RsLabelError> {
    let text = fs::read_to_string(path).map_err(RsLabelError::Io)?;
    parse_world_file(&text).map_err(|message| RsLabelError::Raster {
        path: path.to_path_buf(),
        message,
    })
}

pub fn parse_world_file(text: &str) -> Result<GeoTransform, String> {
    let values = text
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| format!("'{token}' is not a number"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let &[a, d, b, e, c, f] = values.as_slice() else {
        return Err(format!("expected 6 values, found {}", values.len()));
    };

    Ok(GeoTransform::new([
        c - a / 2.0 - b / 2.0,
        a,
        b,
        f - d / 2.0 - e / 2.0,
        d,
        e,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_origin_moves_to_corner() {
        let gt = parse_world_file("0.5\n0\n0\n-0.5\n500000.25\n4199999.75\n").unwrap();
        assert_eq!(gt.coefficients(), [500000.0, 0.5, 0.0, 4200000.0, 0.0, -0.5]);
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        assert!(parse_world_file("1\n0\n0\n-1\n").is_err());
        assert!(parse_world_file("1\n0\n0\n-1\nx\n0\n").is_err());
    }

    #[test]
    fn candidates_follow_extension_conventions() {
        let names: Vec<_> = world_file_candidates(Path::new("a/scene.tif"))
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["scene.tfw", "scene.tifw", "scene.wld"]);
    }
}

use std::path::{Path, PathBuf};

use glob::glob;
use image::{ImageReader, RgbImage};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Result, TrackerError};

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn load_rgb_image(path: &Path) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .map_err(|e| TrackerError::ImageLoad {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .decode()
        .map_err(|source| TrackerError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(img.to_rgb8())
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg", ".jpeg"] {
            if p.as_os_str().to_string_lossy().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

/// Lists the `.png` / `.jpg` files directly inside `folder`, sorted by name.
pub fn sorted_image_paths(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(TrackerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", folder.display()),
        )));
    }
    let pattern = format!("{}/*", folder.display());
    let img_paths = glob(&pattern).map_err(|e| {
        TrackerError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    })?;
    let mut sorted_path: Vec<PathBuf> = img_paths.into_iter().filter_map(img_filter).collect();
    sorted_path.sort();
    Ok(sorted_path)
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to read image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("feature extraction failed: {0}")]
    FeatureExtraction(String),

    #[error("model estimation failed: {0}")]
    Estimation(String),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("template bank has no templates")]
    EmptyTemplateBank,

    #[error("speech backend unavailable: {0}")]
    Speech(String),

    #[error("camera: {0}")]
    Camera(String),

    #[cfg(feature = "camera")]
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

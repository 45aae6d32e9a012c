pub mod app;
#[cfg(feature = "camera")]
pub mod camera;
pub mod config;
pub mod consistent;
pub mod disambiguation;
pub mod error;
pub mod features;
pub mod geometry;
pub mod homography;
pub mod io;
pub mod matcher;
pub mod render;
pub mod source;
pub mod speech;
pub mod template;
pub mod types;
pub mod visualization;

pub use error::{Result, TrackerError};

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use log::{trace, warn};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::geometry::{rect_to_rect, transform_point, transform_rect};
use crate::io::{load_rgb_image, sorted_image_paths};
use crate::types::{Quad, Rect};

pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum RenderMode {
    /// outline of the template bounds
    #[default]
    Outline,
    /// still picture projected into the template bounds
    Picture,
    /// looping frame sequence projected into the template bounds
    Video,
}

/// Draws an overlay for an accepted template.
///
/// `ensure_loaded` runs before every `render`; a resource is loaded at most
/// once and a failed load is not retried.
pub trait RenderStrategy: Send {
    fn ensure_loaded(&mut self) -> bool;
    fn render(&mut self, canvas: &mut RgbImage, bounds_to_frame: &na::Matrix3<f64>, bounds: &Rect);
}

/// One time initialised resource.
#[derive(Debug)]
enum Lazy<T> {
    Unloaded,
    Loaded(T),
    Unavailable,
}

impl<T> Lazy<T> {
    fn get_or_load(&mut self, what: &str, load: impl FnOnce() -> crate::error::Result<T>) -> Option<&mut T> {
        if let Lazy::Unloaded = self {
            *self = match load() {
                Ok(v) => Lazy::Loaded(v),
                Err(e) => {
                    warn!("can't load {} to render: {}", what, e);
                    Lazy::Unavailable
                }
            };
        }
        match self {
            Lazy::Loaded(v) => Some(v),
            _ => None,
        }
    }

    fn is_loaded(&self) -> bool {
        matches!(self, Lazy::Loaded(_))
    }
}

pub fn draw_quad_mut(canvas: &mut RgbImage, quad: &Quad, thickness: u32, color: Rgb<u8>) {
    let half = (thickness / 2) as i32;
    for i in 0..4 {
        let p0 = quad.vertices[i];
        let p1 = quad.vertices[(i + 1) % 4];
        for dx in -half..=half {
            for dy in -half..=half {
                draw_line_segment_mut(
                    canvas,
                    (p0.x + dx as f32, p0.y + dy as f32),
                    (p1.x + dx as f32, p1.y + dy as f32),
                    color,
                );
            }
        }
    }
}

/// Nearest neighbour projection of `src` into `canvas` through `src_to_canvas`.
pub fn project_into(canvas: &mut RgbImage, src: &RgbImage, src_to_canvas: &na::Matrix3<f64>) {
    let Some(canvas_to_src) = src_to_canvas.try_inverse() else {
        warn!("projection matrix is singular");
        return;
    };
    let Some(quad) = transform_rect(&Rect::from_size(src.width(), src.height()), src_to_canvas) else {
        return;
    };
    let Some((x0, y0, x1, y1)) = quad.pixel_bounds(canvas.width(), canvas.height()) else {
        return;
    };
    let (w, h) = (src.width() as f32, src.height() as f32);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let Some(p) = transform_point(&canvas_to_src, glam::Vec2::new(x as f32, y as f32)) else {
                continue;
            };
            if p.x >= 0.0 && p.y >= 0.0 && p.x < w && p.y < h {
                canvas.put_pixel(x, y, *src.get_pixel(p.x as u32, p.y as u32));
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlineRenderer {
    pub thickness: u32,
    pub color: Rgb<u8>,
}

impl Default for OutlineRenderer {
    fn default() -> Self {
        Self {
            thickness: 3,
            color: BLUE,
        }
    }
}

impl RenderStrategy for OutlineRenderer {
    fn ensure_loaded(&mut self) -> bool {
        true
    }

    fn render(&mut self, canvas: &mut RgbImage, bounds_to_frame: &na::Matrix3<f64>, bounds: &Rect) {
        if let Some(quad) = transform_rect(bounds, bounds_to_frame) {
            draw_quad_mut(canvas, &quad, self.thickness, self.color);
        }
    }
}

#[derive(Debug)]
pub struct PictureRenderer {
    path: PathBuf,
    picture: Lazy<RgbImage>,
}

impl PictureRenderer {
    pub fn new(path: &Path) -> PictureRenderer {
        PictureRenderer {
            path: path.to_path_buf(),
            picture: Lazy::Unloaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.picture.is_loaded()
    }
}

impl RenderStrategy for PictureRenderer {
    fn ensure_loaded(&mut self) -> bool {
        let path = self.path.clone();
        self.picture
            .get_or_load("picture", || load_rgb_image(&path))
            .is_some()
    }

    fn render(&mut self, canvas: &mut RgbImage, bounds_to_frame: &na::Matrix3<f64>, bounds: &Rect) {
        let Lazy::Loaded(picture) = &self.picture else {
            return;
        };
        let render_to_bounds =
            rect_to_rect(&Rect::from_size(picture.width(), picture.height()), bounds);
        project_into(canvas, picture, &(bounds_to_frame * render_to_bounds));
    }
}

/// Plays a folder of frames in a loop, advancing one frame per render.
#[derive(Debug)]
pub struct VideoRenderer {
    folder: PathBuf,
    frames: Lazy<Vec<PathBuf>>,
    cursor: usize,
}

impl VideoRenderer {
    pub fn new(folder: &Path) -> VideoRenderer {
        VideoRenderer {
            folder: folder.to_path_buf(),
            frames: Lazy::Unloaded,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_loaded(&self) -> bool {
        self.frames.is_loaded()
    }
}

impl RenderStrategy for VideoRenderer {
    fn ensure_loaded(&mut self) -> bool {
        let folder = self.folder.clone();
        self.frames
            .get_or_load("video", || {
                let paths = sorted_image_paths(&folder)?;
                if paths.is_empty() {
                    return Err(crate::error::TrackerError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("no frames in {}", folder.display()),
                    )));
                }
                Ok(paths)
            })
            .is_some()
    }

    fn render(&mut self, canvas: &mut RgbImage, bounds_to_frame: &na::Matrix3<f64>, bounds: &Rect) {
        let Lazy::Loaded(frames) = &self.frames else {
            return;
        };
        let path = &frames[self.cursor % frames.len()];
        self.cursor = (self.cursor + 1) % frames.len();
        trace!("video overlay frame {}", path.display());
        match load_rgb_image(path) {
            Ok(frame) => {
                let render_to_bounds =
                    rect_to_rect(&Rect::from_size(frame.width(), frame.height()), bounds);
                project_into(canvas, &frame, &(bounds_to_frame * render_to_bounds));
            }
            Err(e) => warn!("skipping video frame: {}", e),
        }
    }
}

pub fn create_renderer(
    mode: RenderMode,
    overlay_image: &Path,
    overlay_video: &Path,
) -> Box<dyn RenderStrategy> {
    match mode {
        RenderMode::Outline => Box::new(OutlineRenderer::default()),
        RenderMode::Picture => Box::new(PictureRenderer::new(overlay_image)),
        RenderMode::Video => Box::new(VideoRenderer::new(overlay_video)),
    }
}

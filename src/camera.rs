//! Live capture and native preview windows through OpenCV.
//!
//! Only built with the `camera` feature. Frames are converted to `RgbImage`
//! at the capture size so the rest of the tracker never sees a `Mat`.

use image::RgbImage;
use log::{info, warn};
use opencv::{
    core::{self, Mat, Scalar, Size},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

use crate::app::{KeyEvent, StepOutput};
use crate::error::{Result, TrackerError};
use crate::source::FrameSource;

pub const VIDEO_WINDOW: &str = "video";
pub const MATCHES_WINDOW: &str = "matches";

/// Frames from a camera device, converted to RGB and resized to the capture size.
pub struct CameraSource {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl CameraSource {
    pub fn open(index: i32, width: u32, height: u32) -> Result<CameraSource> {
        info!("opening camera {}", index);
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(TrackerError::Camera(format!("can't open camera {}", index)));
        }
        capture.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64)?;
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;
        Ok(CameraSource {
            capture,
            width,
            height,
        })
    }

    fn grab(&mut self) -> Result<Option<RgbImage>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        let mut rgb = Mat::default();
        imgproc::cvt_color_def(&frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;
        let mut resized = Mat::default();
        imgproc::resize(
            &rgb,
            &mut resized,
            Size::new(self.width as i32, self.height as i32),
            0.0,
            0.0,
            imgproc::INTER_AREA,
        )?;
        mat_to_rgb(&resized).map(Some)
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        match self.grab() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("camera read failed: {}", e);
                None
            }
        }
    }
}

/// Copies an 8 bit, 3 channel RGB `Mat` into an `RgbImage`.
pub fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    if mat.typ() != core::CV_8UC3 {
        return Err(TrackerError::Camera(format!(
            "expected an 8 bit 3 channel frame, got type {}",
            mat.typ()
        )));
    }
    let owned = if mat.is_continuous() {
        None
    } else {
        Some(mat.try_clone()?)
    };
    let mat = owned.as_ref().unwrap_or(mat);
    RgbImage::from_raw(mat.cols() as u32, mat.rows() as u32, mat.data_bytes()?.to_vec())
        .ok_or_else(|| TrackerError::Camera("frame buffer size mismatch".to_string()))
}

/// BGR `Mat` ready for `highgui::imshow`.
pub fn rgb_to_bgr_mat(img: &RgbImage) -> Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        img.height() as i32,
        img.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(img.as_raw());
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

/// The video and matches windows. Key presses are read from whichever has focus.
pub struct NativeWindows;

impl NativeWindows {
    pub fn open() -> Result<NativeWindows> {
        highgui::named_window(VIDEO_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        highgui::named_window(MATCHES_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        Ok(NativeWindows)
    }

    pub fn show(&self, output: &StepOutput) -> Result<()> {
        highgui::imshow(VIDEO_WINDOW, &rgb_to_bgr_mat(&output.display)?)?;
        if let Some(view) = &output.matches_view {
            highgui::imshow(MATCHES_WINDOW, &rgb_to_bgr_mat(view)?)?;
        }
        Ok(())
    }

    /// Pumps the window events and returns the key pressed since the last call.
    pub fn poll_key(&self) -> Result<Option<KeyEvent>> {
        Ok(KeyEvent::from_key_code(highgui::poll_key()?))
    }
}

impl Drop for NativeWindows {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            warn!("failed to close windows: {}", e);
        }
    }
}

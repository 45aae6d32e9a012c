use std::path::{Path, PathBuf};

use image::RgbImage;
use image::imageops::{FilterType, resize};
use log::{debug, warn};

use crate::error::Result;
use crate::io::{load_rgb_image, sorted_image_paths};

/// Supplies frames to the tracker.
pub trait FrameSource: Send {
    /// `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<RgbImage>;
}

/// Frames read from a folder of images in file name order, resized to the
/// capture size.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    width: u32,
    height: u32,
    looping: bool,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open(folder: &Path, width: u32, height: u32, looping: bool) -> Result<ImageSequenceSource> {
        let paths = sorted_image_paths(folder)?;
        debug!("{} frames in {}", paths.len(), folder.display());
        Ok(ImageSequenceSource {
            paths,
            width,
            height,
            looping,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        // unreadable frames are dropped, at most one pass over the folder
        for _ in 0..self.paths.len() {
            if self.next >= self.paths.len() {
                if !self.looping {
                    return None;
                }
                self.next = 0;
            }
            let path = &self.paths[self.next];
            self.next += 1;
            match load_rgb_image(path) {
                Ok(img) if img.dimensions() == (self.width, self.height) => return Some(img),
                Ok(img) => return Some(resize(&img, self.width, self.height, FilterType::Triangle)),
                Err(e) => warn!("dropping frame: {}", e),
            }
        }
        None
    }
}

/// In memory frames, mostly for tests and benchmarks.
#[derive(Debug, Default)]
pub struct VecSource {
    frames: std::collections::VecDeque<RgbImage>,
}

impl VecSource {
    pub fn new(frames: Vec<RgbImage>) -> VecSource {
        VecSource {
            frames: frames.into(),
        }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        self.frames.pop_front()
    }
}

/// Delivered by [`Player::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerFrame {
    /// a new frame to process
    Live(RgbImage),
    /// the cached frame while paused
    Paused(RgbImage),
    /// source exhausted
    End,
}

/// Pausable wrapper around a frame source. While paused no frames are pulled
/// and the last live frame is delivered again. Nothing has been shown before
/// the first frame, so that one is always delivered live.
pub struct Player {
    source: Box<dyn FrameSource>,
    paused: bool,
    current: Option<RgbImage>,
}

impl Player {
    pub fn new(source: Box<dyn FrameSource>) -> Player {
        Player {
            source,
            paused: false,
            current: None,
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        debug!("paused: {}", self.paused);
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn poll(&mut self) -> PlayerFrame {
        if self.paused {
            if let Some(f) = &self.current {
                return PlayerFrame::Paused(f.clone());
            }
        }
        match self.source.next_frame() {
            Some(frame) => {
                self.current = Some(frame.clone());
                PlayerFrame::Live(frame)
            }
            None => PlayerFrame::End,
        }
    }
}

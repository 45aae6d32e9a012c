use glam::Vec2;
use image::{GrayImage, Luma};
use imageproc::binary_descriptors::brief::{TestPair, brief};
use imageproc::corners::{Corner, corners_fast9};
use imageproc::point::Point;
use log::trace;

use crate::config::FeatureConfig;
use crate::error::{Result, TrackerError};
use crate::types::{DescriptorSet, Keypoint};

/// Side of the blank image used to draw the shared BRIEF test pairs.
const TEST_PAIR_CANVAS: u32 = 64;

/// Produces keypoints with descriptors from a grayscale image.
pub trait FeatureEngine: Send + Sync {
    fn find_features(&self, gray: &GrayImage) -> Result<DescriptorSet>;
}

/// FAST-9 corners described with BRIEF.
///
/// The BRIEF test pairs are drawn once when the engine is built, so every
/// image it describes lives in the same descriptor space.
pub struct FastBriefEngine {
    config: FeatureConfig,
    test_pairs: Vec<TestPair>,
}

impl FastBriefEngine {
    pub fn new(config: &FeatureConfig) -> Result<FastBriefEngine> {
        let canvas = GrayImage::from_pixel(TEST_PAIR_CANVAS, TEST_PAIR_CANVAS, Luma([0]));
        let center = Point::new(TEST_PAIR_CANVAS / 2, TEST_PAIR_CANVAS / 2);
        let (_, test_pairs) = brief(&canvas, &[center], config.descriptor_bits, None)
            .map_err(TrackerError::FeatureExtraction)?;
        Ok(FastBriefEngine {
            config: config.clone(),
            test_pairs,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    fn select_corners(&self, gray: &GrayImage) -> Vec<Corner> {
        let (w, h) = gray.dimensions();
        let margin = self.config.edge_margin;
        let mut corners: Vec<Corner> = corners_fast9(gray, self.config.fast_threshold)
            .into_iter()
            .filter(|c| c.x >= margin && c.y >= margin && c.x + margin < w && c.y + margin < h)
            .collect();
        corners.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.y.cmp(&b.y))
                .then(a.x.cmp(&b.x))
        });
        corners.truncate(self.config.max_keypoints);
        corners
    }
}

impl FeatureEngine for FastBriefEngine {
    fn find_features(&self, gray: &GrayImage) -> Result<DescriptorSet> {
        let corners = self.select_corners(gray);
        if corners.is_empty() {
            return Ok(DescriptorSet::default());
        }
        let points: Vec<Point<u32>> = corners.iter().map(|c| Point::new(c.x, c.y)).collect();
        let (descriptors, _) = brief(
            gray,
            &points,
            self.config.descriptor_bits,
            Some(&self.test_pairs),
        )
        .map_err(TrackerError::FeatureExtraction)?;
        let keypoints: Vec<Keypoint> = corners
            .iter()
            .zip(descriptors)
            .map(|(c, d)| Keypoint::new(Vec2::new(c.x as f32, c.y as f32), c.score, d.bits))
            .collect();
        trace!("found {} keypoints", keypoints.len());
        Ok(DescriptorSet::new(keypoints))
    }
}

use glam::Vec2;

/// A detected interest point with its binary descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoint {
    pub p2d: Vec2,
    pub score: f32,
    pub descriptor: Vec<u128>,
}

impl Keypoint {
    pub fn new(p2d: Vec2, score: f32, descriptor: Vec<u128>) -> Keypoint {
        Keypoint {
            p2d,
            score,
            descriptor,
        }
    }

    pub fn hamming_distance(&self, other: &Keypoint) -> u32 {
        self.descriptor
            .iter()
            .zip(&other.descriptor)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// Ordered keypoints extracted from one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    pub keypoints: Vec<Keypoint>,
}

impl DescriptorSet {
    pub fn new(keypoints: Vec<Keypoint>) -> DescriptorSet {
        DescriptorSet { keypoints }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.keypoints.iter().map(|k| k.p2d).collect()
    }
}

/// Indices of a query keypoint and the model keypoint it was matched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPair {
    pub query: usize,
    pub model: usize,
}

/// Axis aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: u32, height: u32) -> Rect {
        Rect::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Corners in clockwise order (image coordinates, y down) starting top left.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.x + self.width, self.y),
            Vec2::new(self.x + self.width, self.y + self.height),
            Vec2::new(self.x, self.y + self.height),
        ]
    }
}

/// Four vertices, typically a projected `Rect`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub vertices: [Vec2; 4],
}

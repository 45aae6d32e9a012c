#![allow(dead_code)]

use image::{GenericImage, Rgb, RgbImage};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use video_sift::template::Template;

pub const TEMPLATE_SIZE: u32 = 128;
pub const BLOCK: u32 = 12;
pub const LABELS: [&str; 6] = ["100", "200", "500", "1000", "2000", "5000"];

/// Random gray blocks, distinct per seed.
pub fn block_texture(seed: u64, size: u32, block: u32) -> RgbImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let blocks = size.div_ceil(block);
    let values: Vec<u8> = (0..blocks * blocks).map(|_| rng.random_range(0..=255u8)).collect();
    RgbImage::from_fn(size, size, |x, y| {
        let v = values[((y / block) * blocks + x / block) as usize];
        Rgb([v, v, v])
    })
}

/// Per pixel gray noise.
pub fn noise_image(seed: u64, width: u32, height: u32) -> RgbImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    RgbImage::from_fn(width, height, |_, _| {
        let v = rng.random_range(0..=255u8);
        Rgb([v, v, v])
    })
}

pub fn flat_image(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

pub fn synthetic_templates() -> Vec<Template> {
    LABELS
        .iter()
        .enumerate()
        .map(|(i, l)| Template::new(l, block_texture(1000 + i as u64, TEMPLATE_SIZE, BLOCK)))
        .collect()
}

/// 224x224 flat frame with `img` pasted at (`x`, `y`).
pub fn frame_with(img: &RgbImage, x: u32, y: u32) -> RgbImage {
    let mut frame = flat_image(224, 224, 128);
    frame.copy_from(img, x, y).unwrap();
    frame
}

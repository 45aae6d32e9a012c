mod common;

use common::flat_image;
use image::Rgb;
use nalgebra as na;
use tempfile::TempDir;
use video_sift::render::{
    BLUE, OutlineRenderer, PictureRenderer, RenderMode, RenderStrategy, VideoRenderer, create_renderer,
    project_into,
};
use video_sift::types::Rect;

fn translation(tx: f64, ty: f64) -> na::Matrix3<f64> {
    na::Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0)
}

#[test]
fn test_outline_draws_transformed_bounds() {
    let mut canvas = flat_image(100, 100, 0);
    let mut r = OutlineRenderer::default();
    assert!(r.ensure_loaded());
    r.render(&mut canvas, &translation(20.0, 30.0), &Rect::from_size(40, 20));
    assert_eq!(*canvas.get_pixel(40, 30), BLUE);
    assert_eq!(*canvas.get_pixel(20, 40), BLUE);
    assert_eq!(*canvas.get_pixel(40, 40), Rgb([0, 0, 0]));
    assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
}

#[test]
fn test_project_into() {
    let mut canvas = flat_image(50, 50, 0);
    let src = flat_image(10, 10, 200);
    project_into(&mut canvas, &src, &translation(5.0, 5.0));
    assert_eq!(*canvas.get_pixel(5, 5), Rgb([200, 200, 200]));
    assert_eq!(*canvas.get_pixel(14, 14), Rgb([200, 200, 200]));
    assert_eq!(*canvas.get_pixel(15, 15), Rgb([0, 0, 0]));
    assert_eq!(*canvas.get_pixel(4, 4), Rgb([0, 0, 0]));
}

#[test]
fn test_picture_is_loaded_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("overlay.png");
    flat_image(20, 10, 255).save(&path).unwrap();

    let mut r = PictureRenderer::new(&path);
    assert!(!r.is_loaded());
    assert!(r.ensure_loaded());
    std::fs::remove_file(&path).unwrap();
    // still served from the cache
    assert!(r.ensure_loaded());

    let mut canvas = flat_image(100, 100, 0);
    // picture is stretched over the 40x40 bounds
    r.render(&mut canvas, &translation(10.0, 10.0), &Rect::from_size(40, 40));
    assert_eq!(*canvas.get_pixel(10, 10), Rgb([255, 255, 255]));
    assert_eq!(*canvas.get_pixel(49, 49), Rgb([255, 255, 255]));
    assert_eq!(*canvas.get_pixel(51, 51), Rgb([0, 0, 0]));
}

#[test]
fn test_missing_picture_renders_nothing() {
    let dir = TempDir::new().unwrap();
    let mut r = PictureRenderer::new(&dir.path().join("missing.png"));
    assert!(!r.ensure_loaded());
    assert!(!r.ensure_loaded());
    let mut canvas = flat_image(30, 30, 7);
    r.render(&mut canvas, &translation(0.0, 0.0), &Rect::from_size(10, 10));
    assert!(canvas.pixels().all(|p| *p == Rgb([7, 7, 7])));
}

#[test]
fn test_video_cursor_loops() {
    let dir = TempDir::new().unwrap();
    for (i, v) in [10u8, 20, 30].iter().enumerate() {
        flat_image(8, 8, *v).save(dir.path().join(format!("{:03}.png", i))).unwrap();
    }
    let mut r = VideoRenderer::new(dir.path());
    assert!(r.ensure_loaded());
    let mut seen = Vec::new();
    for _ in 0..4 {
        let mut canvas = flat_image(16, 16, 0);
        r.render(&mut canvas, &translation(0.0, 0.0), &Rect::from_size(8, 8));
        seen.push(canvas.get_pixel(2, 2)[0]);
    }
    assert_eq!(seen, vec![10, 20, 30, 10]);
    assert_eq!(r.cursor(), 1);
}

#[test]
fn test_empty_video_folder() {
    let dir = TempDir::new().unwrap();
    let mut r = VideoRenderer::new(dir.path());
    assert!(!r.ensure_loaded());
    assert!(!r.is_loaded());
}

#[test]
fn test_create_renderer() {
    let dir = TempDir::new().unwrap();
    let mut outline = create_renderer(RenderMode::Outline, &dir.path().join("a.png"), dir.path());
    assert!(outline.ensure_loaded());
    let mut picture = create_renderer(RenderMode::Picture, &dir.path().join("a.png"), dir.path());
    assert!(!picture.ensure_loaded());
}

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::{RecordingStream, RecordingStreamError};

use crate::disambiguation::{FrameOutcome, RenderCommand};
use crate::types::{DescriptorSet, MatchPair};

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const MATCH_BLUE: Rgb<u8> = Rgb([0, 0, 255]);

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

pub fn draw_keypoints_mut(canvas: &mut RgbImage, keypoints: &DescriptorSet, color: Rgb<u8>, radius: i32) {
    for k in &keypoints.keypoints {
        draw_filled_circle_mut(canvas, (k.p2d.x as i32, k.p2d.y as i32), radius, color);
    }
}

/// Template and frame side by side with a line per match.
pub fn draw_matches(
    model_img: &RgbImage,
    frame: &RgbImage,
    model: &DescriptorSet,
    query: &DescriptorSet,
    matches: &[MatchPair],
    color: Rgb<u8>,
) -> RgbImage {
    let (output_width, output_height) = (
        model_img.width() + frame.width(),
        model_img.height().max(frame.height()),
    );
    let mut output_image = RgbImage::new(output_width, output_height);
    image::imageops::replace(&mut output_image, model_img, 0, 0);
    image::imageops::replace(&mut output_image, frame, model_img.width() as i64, 0);
    let offset = model_img.width() as f32;
    for m in matches {
        let (Some(mk), Some(qk)) = (model.keypoints.get(m.model), query.keypoints.get(m.query)) else {
            continue;
        };
        draw_line_segment_mut(
            &mut output_image,
            (mk.p2d.x, mk.p2d.y),
            (qk.p2d.x + offset, qk.p2d.y),
            color,
        );
    }
    output_image
}

pub fn log_rgb_image(
    recording: &RecordingStream,
    topic: &str,
    img: &RgbImage,
) -> Result<(), RecordingStreamError> {
    recording.log(
        format!("{}/image", topic),
        &rerun::Image::from_rgb24(img.as_raw().clone(), [img.width(), img.height()]),
    )
}

/// Logs one processed frame: the video window, its keypoints, the accepted
/// outline and identity, and the match visualisation.
pub fn log_frame_outcome(
    recording: &RecordingStream,
    frame_idx: i64,
    display: &RgbImage,
    matches_view: Option<&RgbImage>,
    outcome: Option<&FrameOutcome>,
) -> Result<(), RecordingStreamError> {
    recording.set_time("frame", rerun::TimeCell::from_sequence(frame_idx));
    log_rgb_image(recording, "video", display)?;
    if let Some(view) = matches_view {
        log_rgb_image(recording, "matches", view)?;
    }
    let Some(outcome) = outcome else {
        return Ok(());
    };

    let max_score = outcome
        .keypoints
        .keypoints
        .iter()
        .map(|k| k.score)
        .fold(f32::MIN_POSITIVE, f32::max);
    let (pts, colors): (Vec<_>, Vec<_>) = outcome
        .keypoints
        .keypoints
        .iter()
        .map(|k| {
            let c = colorous::TURBO.eval_continuous((k.score / max_score).clamp(0.0, 1.0) as f64);
            ((k.p2d.x, k.p2d.y), rerun::Color::from_rgb(c.r, c.g, c.b))
        })
        .unzip();
    recording.log(
        "video/keypoints",
        &rerun::Points2D::new(rerun_shift(&pts))
            .with_colors(colors)
            .with_radii([rerun::Radius::new_ui_points(2.0)]),
    )?;

    if let RenderCommand::Accepted(m) = &outcome.render {
        let (r, g, b, a) = id_to_color(m.template_index);
        let mut strip: Vec<(f32, f32)> = m.quad.vertices.iter().map(|p| (p.x, p.y)).collect();
        strip.push(strip[0]);
        let strip: Vec<[f32; 2]> = rerun_shift(&strip).into_iter().map(|(x, y)| [x, y]).collect();
        recording.log(
            "video/outline",
            &rerun::LineStrips2D::new([strip])
                .with_colors([rerun::Color::from_unmultiplied_rgba(r, g, b, a)])
                .with_labels([m.label.clone()]),
        )?;
        recording.log(
            "video/identity",
            &rerun::TextLog::new(format!("it's {}", m.label)),
        )?;
    } else {
        recording.log("video/outline", &rerun::Clear::flat())?;
    }
    Ok(())
}

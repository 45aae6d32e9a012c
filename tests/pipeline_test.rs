mod common;

use common::*;
use video_sift::config::TrackerConfig;
use video_sift::consistent::ConsistentMatcher;
use video_sift::disambiguation::{Disambiguator, RenderCommand};
use video_sift::features::{FastBriefEngine, FeatureEngine};
use video_sift::template::TemplateBank;

struct Pipeline {
    bank: TemplateBank,
    engine: FastBriefEngine,
    matcher: ConsistentMatcher,
    disambiguator: Disambiguator,
}

fn pipeline() -> Pipeline {
    let config = TrackerConfig::default();
    let bank = TemplateBank::new(synthetic_templates()).unwrap();
    let engine = FastBriefEngine::new(&config.features).unwrap();
    bank.compute_features(&engine).unwrap();
    Pipeline {
        bank,
        engine,
        matcher: ConsistentMatcher::new(&config.matcher, &config.estimator),
        disambiguator: Disambiguator::new(config.max_condition, config.selection),
    }
}

impl Pipeline {
    fn run(&mut self, frame: &image::RgbImage) -> video_sift::disambiguation::FrameOutcome {
        let snapshot = self.bank.snapshot().unwrap();
        self.disambiguator.process_frame(
            frame,
            self.bank.templates(),
            &snapshot,
            &self.engine,
            &mut self.matcher,
        )
    }
}

#[test]
fn test_templates_have_features() {
    let p = pipeline();
    let snapshot = p.bank.snapshot().unwrap();
    assert_eq!(snapshot.len(), 6);
    for set in snapshot.iter() {
        assert!(set.len() >= 8, "only {} keypoints", set.len());
    }
}

#[test]
fn test_engine_is_translation_consistent() {
    let mut config = TrackerConfig::default();
    config.features.max_keypoints = usize::MAX;
    config.features.edge_margin = 28;
    let engine = FastBriefEngine::new(&config.features).unwrap();
    let template = block_texture(1002, TEMPLATE_SIZE, BLOCK);
    let frame = frame_with(&template, 48, 40);
    let gray = |img: &image::RgbImage| image::DynamicImage::ImageRgb8(img.clone()).to_luma8();
    let model = engine.find_features(&gray(&template)).unwrap();
    let query = engine.find_features(&gray(&frame)).unwrap();
    assert!(!model.is_empty());
    for k in &model.keypoints {
        let shifted = k.p2d + glam::Vec2::new(48.0, 40.0);
        let twin = query
            .keypoints
            .iter()
            .find(|q| q.p2d == shifted)
            .expect("keypoint missing in frame");
        assert_eq!(twin.hamming_distance(k), 0);
    }
}

#[test]
fn test_frame_with_third_template_is_identified() {
    let mut p = pipeline();
    let template = p.bank.templates()[2].image.clone();
    let frame = frame_with(&template, 48, 40);
    let outcome = p.run(&frame);

    assert_eq!(outcome.identity.as_deref(), Some("500"));
    assert_eq!(outcome.evaluated, vec![0, 1, 2]);
    let accepted = outcome.accepted().unwrap();
    assert_eq!(accepted.template_index, 2);
    assert!(accepted.condition_number < 1e6);
    assert!(accepted.quad.is_convex());
    let expected = [(48.0, 40.0), (176.0, 40.0), (176.0, 168.0), (48.0, 168.0)];
    for (v, (x, y)) in accepted.quad.vertices.iter().zip(expected) {
        assert!((v.x - x).abs() < 0.5 && (v.y - y).abs() < 0.5, "{:?}", v);
    }
}

#[test]
fn test_noise_frame_has_no_identity() {
    let mut p = pipeline();
    let frame = noise_image(99, 224, 224);
    let outcome = p.run(&frame);
    assert!(outcome.identity.is_none());
    assert_eq!(outcome.evaluated, (0..6).collect::<Vec<_>>());
    assert!(matches!(
        outcome.render,
        RenderCommand::Rejected {
            template_index: 5,
            ..
        }
    ));
}

#[test]
fn test_zero_ceiling_rejects_true_match() {
    let mut p = pipeline();
    p.disambiguator.max_condition = 0.0;
    let frame = frame_with(&p.bank.templates()[2].image.clone(), 48, 40);
    let outcome = p.run(&frame);
    assert!(outcome.identity.is_none());
    assert_eq!(outcome.evaluated.len(), 6);
}

#[test]
fn test_recomputed_features_give_same_decisions() {
    let mut p = pipeline();
    let frames = [
        frame_with(&p.bank.templates()[4].image.clone(), 30, 60),
        noise_image(5, 224, 224),
    ];
    let before: Vec<_> = frames.iter().map(|f| p.run(f)).collect();
    p.bank.compute_features(&p.engine).unwrap();
    let after: Vec<_> = frames.iter().map(|f| p.run(f)).collect();
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.identity, a.identity);
        assert_eq!(b.evaluated, a.evaluated);
    }
    assert_eq!(before[0].identity.as_deref(), Some("2000"));
}

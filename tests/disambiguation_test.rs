use std::sync::{Arc, Mutex};

use glam::Vec2;
use image::{GrayImage, RgbImage};
use nalgebra as na;
use video_sift::TrackerError;
use video_sift::config::SelectionPolicy;
use video_sift::consistent::{MatchAttempt, ModelMatcher};
use video_sift::disambiguation::{Disambiguator, Rejection, RenderCommand, accept};
use video_sift::error::Result;
use video_sift::features::FeatureEngine;
use video_sift::template::Template;
use video_sift::types::{DescriptorSet, Keypoint, MatchPair, Rect};

struct NullEngine {
    fail: bool,
}

impl FeatureEngine for NullEngine {
    fn find_features(&self, _gray: &GrayImage) -> Result<DescriptorSet> {
        if self.fail {
            Err(TrackerError::FeatureExtraction("boom".to_string()))
        } else {
            Ok(DescriptorSet::default())
        }
    }
}

#[derive(Clone)]
enum Script {
    Attempt(MatchAttempt),
    Fail,
}

/// Template `i` is recognised by its descriptor set holding `i + 1` keypoints.
struct ScriptedMatcher {
    script: Vec<Script>,
    calls: Arc<Mutex<Vec<usize>>>,
}

impl ModelMatcher for ScriptedMatcher {
    fn find_matches(&mut self, model: &DescriptorSet, _query: &DescriptorSet) -> Result<MatchAttempt> {
        let idx = model.len() - 1;
        self.calls.lock().unwrap().push(idx);
        match &self.script[idx] {
            Script::Attempt(a) => Ok(a.clone()),
            Script::Fail => Err(TrackerError::Estimation("scripted failure".to_string())),
        }
    }
}

const N: usize = 6;

fn bank() -> (Vec<Template>, Vec<DescriptorSet>) {
    let templates = (0..N)
        .map(|i| Template::new(&format!("t{}", i), RgbImage::new(100, 50)))
        .collect();
    let features = (0..N)
        .map(|i| DescriptorSet::new(vec![Keypoint::new(Vec2::ZERO, 0.0, vec![0]); i + 1]))
        .collect();
    (templates, features)
}

fn translation(tx: f64, ty: f64) -> na::Matrix3<f64> {
    na::Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0)
}

fn good() -> MatchAttempt {
    MatchAttempt::with_transform(true, translation(-10.0, -20.0), vec![MatchPair { query: 0, model: 0 }])
}

fn not_found() -> MatchAttempt {
    MatchAttempt::with_transform(false, translation(-10.0, -20.0), vec![MatchPair { query: 1, model: 1 }])
}

fn ill_conditioned() -> MatchAttempt {
    MatchAttempt::with_transform(true, na::Matrix3::from_diagonal(&na::Vector3::new(1.0, 1.0, 1e-7)), vec![])
}

/// Inverse puts the vanishing line across the template bounds.
fn folding() -> MatchAttempt {
    let g = na::Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, -0.02, 0.0, 1.0);
    MatchAttempt::with_transform(true, g.try_inverse().unwrap(), vec![])
}

fn run(script: Vec<Script>, disambiguator: Disambiguator) -> (video_sift::disambiguation::FrameOutcome, Vec<usize>) {
    let (templates, features) = bank();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut matcher = ScriptedMatcher {
        script,
        calls: calls.clone(),
    };
    let outcome = disambiguator.process_frame(
        &RgbImage::new(32, 32),
        &templates,
        &features,
        &NullEngine { fail: false },
        &mut matcher,
    );
    let calls = calls.lock().unwrap().clone();
    (outcome, calls)
}

fn first_match() -> Disambiguator {
    Disambiguator::new(1e6, SelectionPolicy::FirstMatch)
}

#[test]
fn test_accept_good_transform() {
    let bounds = Rect::from_size(100, 50);
    let acceptance = accept(&good(), &bounds, 1e6).unwrap();
    let expected = bounds.corners().map(|c| c + Vec2::new(10.0, 20.0));
    for (p, e) in acceptance.quad.vertices.iter().zip(expected) {
        assert!((*p - e).length() < 1e-4);
    }
}

#[test]
fn test_accept_requires_found() {
    let bounds = Rect::from_size(100, 50);
    assert_eq!(accept(&not_found(), &bounds, 1e6), Err(Rejection::NotFound));
    assert_eq!(
        accept(&MatchAttempt::not_found(vec![]), &bounds, 1e6),
        Err(Rejection::NotFound)
    );
}

#[test]
fn test_accept_condition_boundary() {
    let bounds = Rect::from_size(100, 50);
    let attempt = good();
    let cond = attempt.condition_number;
    assert!(cond.is_finite() && cond > 1.0);
    assert!(accept(&attempt, &bounds, cond * 1.0001).is_ok());
    assert_eq!(
        accept(&attempt, &bounds, cond),
        Err(Rejection::IllConditioned(cond))
    );
    assert!(matches!(
        accept(&ill_conditioned(), &bounds, 1e6),
        Err(Rejection::IllConditioned(_))
    ));
}

#[test]
fn test_accept_requires_convex_projection() {
    let bounds = Rect::from_size(100, 50);
    let attempt = folding();
    assert!(attempt.condition_number < 1e6);
    assert_eq!(accept(&attempt, &bounds, 1e6), Err(Rejection::NotConvex));
}

#[test]
fn test_accept_singular_transform() {
    let attempt = MatchAttempt {
        found: true,
        transform: Some(na::Matrix3::zeros()),
        condition_number: 1.0,
        matches: vec![],
    };
    assert_eq!(
        accept(&attempt, &Rect::from_size(100, 50), 1e6),
        Err(Rejection::NotInvertible)
    );
}

#[test]
fn test_first_match_wins_and_stops() {
    let script = vec![
        Script::Attempt(not_found()),
        Script::Attempt(folding()),
        Script::Attempt(good()),
        Script::Attempt(good()),
        Script::Attempt(good()),
        Script::Attempt(good()),
    ];
    let (outcome, calls) = run(script, first_match());
    assert_eq!(calls, vec![0, 1, 2]);
    assert_eq!(outcome.evaluated, vec![0, 1, 2]);
    assert_eq!(outcome.identity.as_deref(), Some("t2"));
    let accepted = outcome.accepted().unwrap();
    assert_eq!(accepted.template_index, 2);
    assert_eq!(accepted.bounds, Rect::from_size(100, 50));
}

#[test]
fn test_no_match_keeps_last_rejection() {
    let script = vec![Script::Attempt(not_found()); N];
    let (outcome, calls) = run(script, first_match());
    assert_eq!(calls, (0..N).collect::<Vec<_>>());
    assert!(outcome.identity.is_none());
    assert_eq!(
        outcome.render,
        RenderCommand::Rejected {
            template_index: N - 1,
            matches: vec![MatchPair { query: 1, model: 1 }],
        }
    );
}

#[test]
fn test_zero_condition_ceiling_rejects_everything() {
    let script = vec![Script::Attempt(good()); N];
    let (outcome, calls) = run(script, Disambiguator::new(0.0, SelectionPolicy::FirstMatch));
    assert_eq!(calls.len(), N);
    assert!(outcome.identity.is_none());
    assert!(outcome.accepted().is_none());
}

#[test]
fn test_matcher_failure_ends_frame() {
    let script = vec![
        Script::Attempt(not_found()),
        Script::Fail,
        Script::Attempt(good()),
        Script::Attempt(good()),
        Script::Attempt(good()),
        Script::Attempt(good()),
    ];
    let (outcome, calls) = run(script, first_match());
    assert_eq!(calls, vec![0, 1]);
    assert!(outcome.identity.is_none());
    assert!(matches!(
        outcome.render,
        RenderCommand::Rejected {
            template_index: 0,
            ..
        }
    ));
}

#[test]
fn test_matcher_failure_drops_earlier_acceptance() {
    let script = vec![
        Script::Attempt(good()),
        Script::Fail,
        Script::Attempt(good()),
        Script::Attempt(good()),
        Script::Attempt(good()),
        Script::Attempt(good()),
    ];
    let (outcome, calls) = run(script, Disambiguator::new(1e6, SelectionPolicy::BestConditioned));
    assert_eq!(calls, vec![0, 1]);
    assert!(outcome.identity.is_none());
    assert!(outcome.accepted().is_none());
    assert_eq!(outcome.evaluated, vec![0, 1]);
}

#[test]
fn test_extraction_failure_ends_frame() {
    let (templates, features) = bank();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut matcher = ScriptedMatcher {
        script: vec![Script::Attempt(good()); N],
        calls: calls.clone(),
    };
    let outcome = first_match().process_frame(
        &RgbImage::new(32, 32),
        &templates,
        &features,
        &NullEngine { fail: true },
        &mut matcher,
    );
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(outcome.render, RenderCommand::Nothing);
    assert!(outcome.identity.is_none());
}

#[test]
fn test_best_conditioned_policy() {
    let better = MatchAttempt::with_transform(true, translation(-1.0, -1.0), vec![]);
    let script = vec![
        Script::Attempt(not_found()),
        Script::Attempt(good()),
        Script::Attempt(not_found()),
        Script::Attempt(better.clone()),
        Script::Attempt(good()),
        Script::Attempt(not_found()),
    ];
    let (outcome, calls) = run(script, Disambiguator::new(1e6, SelectionPolicy::BestConditioned));
    assert_eq!(calls.len(), N);
    assert!(better.condition_number < good().condition_number);
    assert_eq!(outcome.identity.as_deref(), Some("t3"));
}

//! Per-frame template disambiguation.
//!
//! Every frame is matched against the template bank in bank order. A
//! template is accepted when the matcher found a consistent transform, the
//! transform is well conditioned and the template bounds map to a convex
//! quad in the frame. With [`SelectionPolicy::FirstMatch`] the first
//! accepted template ends the pass.

use image::{DynamicImage, RgbImage};
use log::{debug, error, trace, warn};
use nalgebra as na;

use crate::config::SelectionPolicy;
use crate::consistent::{MatchAttempt, ModelMatcher};
use crate::features::FeatureEngine;
use crate::geometry::transform_rect;
use crate::template::Template;
use crate::types::{DescriptorSet, MatchPair, Quad, Rect};

/// Why a template was not accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    NotFound,
    IllConditioned(f64),
    NotInvertible,
    NotConvex,
}

/// The transform that passed the acceptance predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acceptance {
    /// maps template coordinates into the frame
    pub bounds_to_frame: na::Matrix3<f64>,
    /// template bounds projected into the frame
    pub quad: Quad,
}

/// Match found, condition number strictly below `max_condition`, and the
/// inverse transform maps `bounds` to a convex quad.
pub fn accept(
    attempt: &MatchAttempt,
    bounds: &Rect,
    max_condition: f64,
) -> Result<Acceptance, Rejection> {
    let transform = match (attempt.found, attempt.transform) {
        (true, Some(t)) => t,
        _ => return Err(Rejection::NotFound),
    };
    if attempt.condition_number.is_nan() || attempt.condition_number >= max_condition {
        return Err(Rejection::IllConditioned(attempt.condition_number));
    }
    let bounds_to_frame = transform.try_inverse().ok_or(Rejection::NotInvertible)?;
    match transform_rect(bounds, &bounds_to_frame) {
        Some(quad) if quad.is_convex() => Ok(Acceptance {
            bounds_to_frame,
            quad,
        }),
        _ => Err(Rejection::NotConvex),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedMatch {
    pub template_index: usize,
    pub label: String,
    pub bounds: Rect,
    pub bounds_to_frame: na::Matrix3<f64>,
    pub quad: Quad,
    pub condition_number: f64,
    pub matches: Vec<MatchPair>,
}

/// What the display should show for a processed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// nothing was evaluated
    Nothing,
    /// overlay the accepted template and draw its consistent matches
    Accepted(AcceptedMatch),
    /// best effort matches of the last rejected template
    Rejected {
        template_index: usize,
        matches: Vec<MatchPair>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// keypoints detected in the frame
    pub keypoints: DescriptorSet,
    /// template indices in the order they were tried
    pub evaluated: Vec<usize>,
    pub render: RenderCommand,
    pub identity: Option<String>,
}

impl FrameOutcome {
    fn empty() -> FrameOutcome {
        FrameOutcome {
            keypoints: DescriptorSet::default(),
            evaluated: Vec::new(),
            render: RenderCommand::Nothing,
            identity: None,
        }
    }

    pub fn accepted(&self) -> Option<&AcceptedMatch> {
        match &self.render {
            RenderCommand::Accepted(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disambiguator {
    pub max_condition: f64,
    pub selection: SelectionPolicy,
}

impl Disambiguator {
    pub fn new(max_condition: f64, selection: SelectionPolicy) -> Disambiguator {
        Disambiguator {
            max_condition,
            selection,
        }
    }

    /// Runs one frame through the template bank.
    ///
    /// `features[i]` must be the descriptor set of `templates[i]`. Extraction
    /// or matcher failures end the pass without an identity.
    pub fn process_frame(
        &self,
        frame: &RgbImage,
        templates: &[Template],
        features: &[DescriptorSet],
        engine: &dyn FeatureEngine,
        matcher: &mut dyn ModelMatcher,
    ) -> FrameOutcome {
        let mut outcome = FrameOutcome::empty();
        if templates.len() != features.len() {
            warn!(
                "{} templates but {} descriptor sets, using the common prefix",
                templates.len(),
                features.len()
            );
        }
        let gray = DynamicImage::ImageRgb8(frame.clone()).to_luma8();
        outcome.keypoints = match engine.find_features(&gray) {
            Ok(k) => k,
            Err(e) => {
                error!("feature extraction on frame failed: {}", e);
                return outcome;
            }
        };

        let mut best: Option<AcceptedMatch> = None;
        for (i, (template, model)) in templates.iter().zip(features).enumerate() {
            outcome.evaluated.push(i);
            let attempt = match matcher.find_matches(model, &outcome.keypoints) {
                Ok(a) => a,
                Err(e) => {
                    error!("matching template {} failed: {}", template.label, e);
                    // no identity, not even one accepted earlier in the pass
                    return outcome;
                }
            };
            let bounds = template.bounds();
            match accept(&attempt, &bounds, self.max_condition) {
                Ok(acceptance) => {
                    debug!(
                        "template {} accepted, cond {:.3e}, {} matches",
                        template.label,
                        attempt.condition_number,
                        attempt.matches.len()
                    );
                    let candidate = AcceptedMatch {
                        template_index: i,
                        label: template.label.clone(),
                        bounds,
                        bounds_to_frame: acceptance.bounds_to_frame,
                        quad: acceptance.quad,
                        condition_number: attempt.condition_number,
                        matches: attempt.matches,
                    };
                    let better = best
                        .as_ref()
                        .is_none_or(|b| candidate.condition_number < b.condition_number);
                    if better {
                        best = Some(candidate);
                    }
                    if self.selection == SelectionPolicy::FirstMatch {
                        break;
                    }
                }
                Err(rejection) => {
                    if rejection == Rejection::NotInvertible {
                        warn!("transform of template {} is singular", template.label);
                    }
                    trace!("template {} rejected: {:?}", template.label, rejection);
                    if best.is_none() {
                        outcome.render = RenderCommand::Rejected {
                            template_index: i,
                            matches: attempt.matches,
                        };
                    }
                }
            }
        }

        if let Some(m) = best {
            outcome.identity = Some(m.label.clone());
            outcome.render = RenderCommand::Accepted(m);
        }
        outcome
    }
}

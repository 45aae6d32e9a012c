use glam::Vec2;
use nalgebra as na;

use crate::config::{EstimatorConfig, MatcherConfig};
use crate::error::Result;
use crate::geometry::condition_number;
use crate::homography::RobustHomographyEstimator;
use crate::matcher::BasicKeypointMatcher;
use crate::types::{DescriptorSet, MatchPair};

/// Outcome of matching one frame against one template.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchAttempt {
    pub found: bool,
    /// maps query (frame) coordinates onto model (template) coordinates
    pub transform: Option<na::Matrix3<f64>>,
    /// `f64::INFINITY` when there is no transform
    pub condition_number: f64,
    /// consistent matches when found, otherwise every putative match
    pub matches: Vec<MatchPair>,
}

impl MatchAttempt {
    pub fn not_found(matches: Vec<MatchPair>) -> MatchAttempt {
        MatchAttempt {
            found: false,
            transform: None,
            condition_number: f64::INFINITY,
            matches,
        }
    }

    pub fn with_transform(found: bool, transform: na::Matrix3<f64>, matches: Vec<MatchPair>) -> MatchAttempt {
        MatchAttempt {
            found,
            transform: Some(transform),
            condition_number: condition_number(&transform),
            matches,
        }
    }
}

/// Matches a query descriptor set against a reference model and fits a
/// geometric transform to the matches.
pub trait ModelMatcher: Send {
    fn find_matches(&mut self, model: &DescriptorSet, query: &DescriptorSet) -> Result<MatchAttempt>;
}

/// Descriptor matching constrained by a robustly estimated homography.
#[derive(Debug, Clone)]
pub struct ConsistentMatcher {
    inner: BasicKeypointMatcher,
    estimator: RobustHomographyEstimator,
}

impl ConsistentMatcher {
    pub fn new(matcher_config: &MatcherConfig, estimator_config: &EstimatorConfig) -> ConsistentMatcher {
        ConsistentMatcher {
            inner: BasicKeypointMatcher::new(matcher_config),
            estimator: RobustHomographyEstimator::new(estimator_config),
        }
    }

    pub fn estimator(&self) -> &RobustHomographyEstimator {
        &self.estimator
    }
}

impl ModelMatcher for ConsistentMatcher {
    fn find_matches(&mut self, model: &DescriptorSet, query: &DescriptorSet) -> Result<MatchAttempt> {
        let putative = self.inner.find_matches(model, query);
        let pairs: Vec<(Vec2, Vec2)> = putative
            .iter()
            .map(|m| (query.keypoints[m.query].p2d, model.keypoints[m.model].p2d))
            .collect();
        let fit = self.estimator.fit(&pairs)?;
        Ok(match fit.h_mat {
            Some(h_mat) if fit.found => {
                let consistent = fit.inliers.iter().map(|&i| putative[i]).collect();
                MatchAttempt::with_transform(true, h_mat, consistent)
            }
            Some(h_mat) => MatchAttempt::with_transform(false, h_mat, putative),
            None => MatchAttempt::not_found(putative),
        })
    }
}

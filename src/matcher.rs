use crate::config::MatcherConfig;
use crate::types::{DescriptorSet, MatchPair};

/// Brute force nearest neighbour matching with a distance ratio test.
#[derive(Debug, Clone)]
pub struct BasicKeypointMatcher {
    ratio: f32,
}

impl BasicKeypointMatcher {
    pub fn new(config: &MatcherConfig) -> BasicKeypointMatcher {
        BasicKeypointMatcher {
            ratio: config.ratio,
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Returns the putative matches from `query` to `model`.
    ///
    /// A query keypoint is kept iff its best model distance is strictly below
    /// `ratio` times the second best, so ties never match.
    pub fn find_matches(&self, model: &DescriptorSet, query: &DescriptorSet) -> Vec<MatchPair> {
        if model.len() < 2 {
            return Vec::new();
        }
        query
            .keypoints
            .iter()
            .enumerate()
            .filter_map(|(qi, q)| {
                let mut best = (u32::MAX, usize::MAX);
                let mut second = u32::MAX;
                for (mi, m) in model.keypoints.iter().enumerate() {
                    let d = q.hamming_distance(m);
                    if d < best.0 {
                        second = best.0;
                        best = (d, mi);
                    } else if d < second {
                        second = d;
                    }
                }
                if (best.0 as f32) < self.ratio * second as f32 {
                    Some(MatchPair {
                        query: qi,
                        model: best.1,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

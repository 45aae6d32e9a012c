use glam::Vec2;
use log::{debug, trace};
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::EstimatorConfig;
use crate::error::{Result, TrackerError};
use crate::geometry::{condition_number, transform_point};

const SAMPLE_SIZE: usize = 4;

/// Similarity moving the centroid to the origin with mean distance sqrt(2).
fn normalization(pts: &[Vec2]) -> Option<na::Matrix3<f64>> {
    let n = pts.len() as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |acc, p| (acc.0 + p.x as f64, acc.1 + p.y as f64));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < 1e-12 || !mean_dist.is_finite() {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(na::Matrix3::new(
        s,
        0.0,
        -s * cx,
        0.0,
        s,
        -s * cy,
        0.0,
        0.0,
        1.0,
    ))
}

/// Result of a direct linear transform fit.
#[derive(Debug, Clone, Copy)]
pub struct DltFit {
    /// homography between the normalised point sets
    pub normalized: na::Matrix3<f64>,
    /// homography in pixel coordinates, `h[(2, 2)] == 1` when possible
    pub h_mat: na::Matrix3<f64>,
}

/// Normalised DLT mapping `pairs[i].0` onto `pairs[i].1`. Needs at least four pairs.
pub fn fit_dlt(pairs: &[(Vec2, Vec2)]) -> Option<DltFit> {
    if pairs.len() < SAMPLE_SIZE {
        return None;
    }
    let (src, dst): (Vec<Vec2>, Vec<Vec2>) = pairs.iter().cloned().unzip();
    let t0 = normalization(&src)?;
    let t1 = normalization(&dst)?;

    let mut ata = na::SMatrix::<f64, 9, 9>::zeros();
    for (p0, p1) in pairs {
        let a = t0 * na::Vector3::new(p0.x as f64, p0.y as f64, 1.0);
        let b = t1 * na::Vector3::new(p1.x as f64, p1.y as f64, 1.0);
        let (x, y) = (a[0], a[1]);
        let (u, v) = (b[0], b[1]);
        let r0 = na::SVector::<f64, 9>::from_column_slice(&[
            -x,
            -y,
            -1.0,
            0.0,
            0.0,
            0.0,
            x * u,
            y * u,
            u,
        ]);
        let r1 = na::SVector::<f64, 9>::from_column_slice(&[
            0.0,
            0.0,
            0.0,
            -x,
            -y,
            -1.0,
            x * v,
            y * v,
            v,
        ]);
        ata += r0 * r0.transpose() + r1 * r1.transpose();
    }
    let eigen = na::SymmetricEigen::new(ata);
    let min_idx = eigen.eigenvalues.imin();
    let h = eigen.eigenvectors.column(min_idx);
    let normalized = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t1_inv = t1.try_inverse()?;
    let mut h_mat = t1_inv * normalized * t0;
    let h22 = h_mat[(2, 2)];
    if h22.abs() > 1e-12 {
        h_mat /= h22;
    } else {
        let norm = h_mat.norm();
        if norm < 1e-12 {
            return None;
        }
        h_mat /= norm;
    }
    if h_mat.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(DltFit { normalized, h_mat })
}

/// Squared single image transfer error of mapping `p0` with `h_mat` onto `p1`.
pub fn transfer_error(h_mat: &na::Matrix3<f64>, p0: Vec2, p1: Vec2) -> f64 {
    match transform_point(h_mat, p0) {
        Some(p) => p.distance_squared(p1) as f64,
        None => f64::INFINITY,
    }
}

#[derive(Debug, Clone, Default)]
pub struct RansacResult {
    /// the stopping condition was met by the best model
    pub found: bool,
    pub h_mat: Option<na::Matrix3<f64>>,
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

/// RANSAC homography fitting with an inlier percentage stopping condition
/// and a condition number check on every sampled model.
#[derive(Debug, Clone)]
pub struct RobustHomographyEstimator {
    config: EstimatorConfig,
}

impl RobustHomographyEstimator {
    pub fn new(config: &EstimatorConfig) -> RobustHomographyEstimator {
        RobustHomographyEstimator {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    fn inliers_of(&self, h_mat: &na::Matrix3<f64>, pairs: &[(Vec2, Vec2)]) -> Vec<usize> {
        pairs
            .iter()
            .enumerate()
            .filter(|(_, (p0, p1))| transfer_error(h_mat, *p0, *p1) <= self.config.inlier_threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Fits a homography mapping `pairs[i].0` onto `pairs[i].1`.
    ///
    /// Deterministic for a given config: the sampler is reseeded on every call.
    pub fn fit(&self, pairs: &[(Vec2, Vec2)]) -> Result<RansacResult> {
        if pairs
            .iter()
            .any(|(p0, p1)| !p0.is_finite() || !p1.is_finite())
        {
            return Err(TrackerError::Estimation(
                "non finite point correspondence".to_string(),
            ));
        }
        let n = pairs.len();
        if n < SAMPLE_SIZE {
            trace!("{} correspondences, not enough to fit", n);
            return Ok(RansacResult::default());
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let target = ((self.config.inlier_percentage * n as f64).ceil() as usize).max(SAMPLE_SIZE);
        let mut best_h: Option<na::Matrix3<f64>> = None;
        let mut best_inliers: Vec<usize> = Vec::new();
        let mut iterations = 0;

        for _ in 0..self.config.max_iterations {
            iterations += 1;
            let sample: Vec<_> = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE)
                .into_iter()
                .map(|i| pairs[i])
                .collect();
            let Some(fit) = fit_dlt(&sample) else {
                continue;
            };
            if condition_number(&fit.normalized) > self.config.max_sample_condition {
                continue;
            }
            let inliers = self.inliers_of(&fit.h_mat, pairs);
            if inliers.len() > best_inliers.len() {
                best_inliers = inliers;
                best_h = Some(fit.h_mat);
            }
            if best_inliers.len() >= target {
                break;
            }
        }

        let found = best_inliers.len() >= target && best_inliers.len() >= self.config.min_inliers;
        debug!(
            "ransac: {}/{} inliers after {} iterations, found {}",
            best_inliers.len(),
            n,
            iterations,
            found
        );
        if found {
            let inlier_pairs: Vec<_> = best_inliers.iter().map(|&i| pairs[i]).collect();
            if let Some(refit) = fit_dlt(&inlier_pairs) {
                best_h = Some(refit.h_mat);
            }
        }
        Ok(RansacResult {
            found,
            h_mat: best_h,
            inliers: best_inliers,
            iterations,
        })
    }
}

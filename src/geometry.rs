use glam::Vec2;
use nalgebra as na;

use crate::types::{Quad, Rect};

/// Relative tolerance below which two consecutive quad edges count as colinear.
const COLINEAR_EPS: f32 = 1e-6;

/// Applies a homography to a point. `None` when the point maps to infinity.
pub fn transform_point(h_mat: &na::Matrix3<f64>, p: Vec2) -> Option<Vec2> {
    let r = h_mat * na::Vector3::new(p.x as f64, p.y as f64, 1.0);
    if r[2].abs() < f64::EPSILON || !r[2].is_finite() {
        return None;
    }
    let x = r[0] / r[2];
    let y = r[1] / r[2];
    if x.is_finite() && y.is_finite() {
        Some(Vec2::new(x as f32, y as f32))
    } else {
        None
    }
}

pub fn transform_rect(rect: &Rect, h_mat: &na::Matrix3<f64>) -> Option<Quad> {
    let c = rect.corners();
    Some(Quad {
        vertices: [
            transform_point(h_mat, c[0])?,
            transform_point(h_mat, c[1])?,
            transform_point(h_mat, c[2])?,
            transform_point(h_mat, c[3])?,
        ],
    })
}

impl Quad {
    /// Cross product sign test over every pair of consecutive edges.
    /// Colinear or folded (self intersecting) quads are not convex.
    pub fn is_convex(&self) -> bool {
        let v = &self.vertices;
        let mut sign = 0.0f32;
        for i in 0..4 {
            let e0 = v[(i + 1) % 4] - v[i];
            let e1 = v[(i + 2) % 4] - v[(i + 1) % 4];
            let cross = e0.perp_dot(e1);
            let scale = e0.length() * e1.length();
            if !cross.is_finite() || scale <= 0.0 || cross.abs() <= COLINEAR_EPS * scale {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Integer pixel bounds `(min_x, min_y, max_x, max_y)`, clamped to `width` x `height`.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let (mut min, mut max) = (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN));
        for p in &self.vertices {
            min = min.min(*p);
            max = max.max(*p);
        }
        if max.x < 0.0 || max.y < 0.0 || min.x >= width as f32 || min.y >= height as f32 {
            return None;
        }
        let x0 = min.x.max(0.0).floor() as u32;
        let y0 = min.y.max(0.0).floor() as u32;
        let x1 = (max.x.ceil() as u32).min(width - 1);
        let y1 = (max.y.ceil() as u32).min(height - 1);
        Some((x0, y0, x1, y1))
    }
}

/// Ratio of the largest to the smallest singular value.
/// Singular matrices give `f64::INFINITY`.
pub fn condition_number(h_mat: &na::Matrix3<f64>) -> f64 {
    if h_mat.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }
    let sv = h_mat.svd(false, false).singular_values;
    let max = sv.max();
    let min = sv.min();
    if min <= 0.0 {
        f64::INFINITY
    } else {
        max / min
    }
}

/// Scale and translation mapping rectangle `from` onto rectangle `to`.
pub fn rect_to_rect(from: &Rect, to: &Rect) -> na::Matrix3<f64> {
    let sx = to.width as f64 / from.width as f64;
    let sy = to.height as f64 / from.height as f64;
    na::Matrix3::new(
        sx,
        0.0,
        to.x as f64 - sx * from.x as f64,
        0.0,
        sy,
        to.y as f64 - sy * from.y as f64,
        0.0,
        0.0,
        1.0,
    )
}

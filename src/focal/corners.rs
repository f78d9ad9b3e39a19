//! "Good features to track" corner detection.
//!
//! The response at each pixel is the smaller eigenvalue of the local
//! structure tensor (Shi–Tomasi), not the Harris `det - k·trace²` score:
//!
//! ```text
//! M = [Σ Ix²   Σ IxIy]      λ_min = (a + c)/2 − √(((a − c)/2)² + b²)
//!     [Σ IxIy  Σ Iy² ]
//! ```
//!
//! Derivatives are 3×3 Sobel, sums run over a 3×3 window. A pixel is kept
//! when its response exceeds `quality_level × strongest response` and it is
//! a 3×3 local maximum. Survivors are taken strongest first, skipping any
//! closer than `min_distance` to one already taken, up to `max_corners`.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Tuning for [`good_features_to_track`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerParams {
    /// Maximum number of corners returned. `0` means no limit.
    pub max_corners: usize,
    /// Minimum accepted response relative to the strongest one (0–1].
    pub quality_level: f32,
    /// Minimum Euclidean distance between returned corners, in pixels.
    pub min_distance: f32,
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            max_corners: 20,
            quality_level: 0.04,
            min_distance: 1.0,
        }
    }
}

/// A detected corner with its minimum-eigenvalue response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: u32,
    pub y: u32,
    pub response: f32,
}

/// Find the strongest corners of a luminance image.
///
/// Returns corners sorted by descending response. Uniform images (and
/// images smaller than 3×3) have no corners.
pub fn good_features_to_track(image: &GrayImage, params: &CornerParams) -> Vec<Corner> {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return Vec::new();
    }
    let w = width as usize;
    let h = height as usize;

    let response = min_eigenvalue_map(image);
    let max_response = response.iter().copied().fold(0.0f32, f32::max);
    if max_response <= 0.0 {
        return Vec::new();
    }
    let threshold = max_response * params.quality_level;

    // The one-pixel border never holds a corner.
    let mut candidates = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let value = response[y * w + x];
            if value <= threshold || !is_local_max(&response, w, x, y, value) {
                continue;
            }
            candidates.push(Corner {
                x: x as u32,
                y: y as u32,
                response: value,
            });
        }
    }

    // Stable sort: equal responses keep row-major order.
    candidates.sort_by(|a, b| b.response.total_cmp(&a.response));
    select_spaced(candidates, params)
}

/// Per-pixel minimum eigenvalue of the 3×3 structure tensor.
fn min_eigenvalue_map(image: &GrayImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;

    let gx = horizontal_sobel(image);
    let gy = vertical_sobel(image);

    let n = w * h;
    let mut xx = Vec::with_capacity(n);
    let mut yy = Vec::with_capacity(n);
    let mut xy = Vec::with_capacity(n);
    for (&dx, &dy) in gx.as_raw().iter().zip(gy.as_raw().iter()) {
        let dx = f32::from(dx);
        let dy = f32::from(dy);
        xx.push(dx * dx);
        yy.push(dy * dy);
        xy.push(dx * dy);
    }

    let a = box_sum_3x3(&xx, w, h);
    let c = box_sum_3x3(&yy, w, h);
    let b = box_sum_3x3(&xy, w, h);

    a.iter()
        .zip(c.iter())
        .zip(b.iter())
        .map(|((&a, &c), &b)| {
            let half_trace = (a + c) * 0.5;
            let half_diff = (a - c) * 0.5;
            (half_trace - (half_diff * half_diff + b * b).sqrt()).max(0.0)
        })
        .collect()
}

/// Separable 3×3 box sum with edge clamping.
fn box_sum_3x3(values: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut rows = vec![0.0f32; values.len()];
    for y in 0..height {
        let row = &values[y * width..(y + 1) * width];
        for x in 0..width {
            let left = row[x.saturating_sub(1)];
            let right = row[(x + 1).min(width - 1)];
            rows[y * width + x] = left + row[x] + right;
        }
    }

    let mut out = vec![0.0f32; values.len()];
    for y in 0..height {
        let up = y.saturating_sub(1) * width;
        let here = y * width;
        let down = (y + 1).min(height - 1) * width;
        for x in 0..width {
            out[here + x] = rows[up + x] + rows[here + x] + rows[down + x];
        }
    }
    out
}

/// `value` is at least as large as all eight neighbours. Callers keep
/// `(x, y)` off the border.
fn is_local_max(response: &[f32], width: usize, x: usize, y: usize, value: f32) -> bool {
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            if response[ny * width + nx] > value {
                return false;
            }
        }
    }
    true
}

/// Greedy minimum-distance filter over corners sorted strongest first.
fn select_spaced(candidates: Vec<Corner>, params: &CornerParams) -> Vec<Corner> {
    let min_dist_sq = params.min_distance * params.min_distance;
    let limit = if params.max_corners == 0 {
        usize::MAX
    } else {
        params.max_corners
    };

    let mut kept: Vec<Corner> = Vec::with_capacity(limit.min(candidates.len()));
    for corner in candidates {
        if kept.len() >= limit {
            break;
        }
        let too_close = kept.iter().any(|k| {
            let dx = k.x as f32 - corner.x as f32;
            let dy = k.y as f32 - corner.y as f32;
            dx * dx + dy * dy < min_dist_sq
        });
        if !too_close {
            kept.push(corner);
        }
    }
    kept
}

//! Focal point values and their aggregation into one stored point.
//!
//! Detectors produce any number of weighted [`FocalPoint`]s. Only the
//! aggregate, the weighted centre of mass, is ever persisted, as a plain
//! `(x, y)` pixel pair on the image field.

/// A point of visual interest in source-image pixel space.
///
/// `weight` is the relative influence of this point during aggregation.
/// Points coming from a detector that does not rank its output all share
/// the default weight of 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalPoint {
    pub x: f64,
    pub y: f64,
    pub weight: f64,
}

impl FocalPoint {
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            weight: Self::DEFAULT_WEIGHT,
        }
    }

    pub fn with_weight(x: f64, y: f64, weight: f64) -> Self {
        Self { x, y, weight }
    }
}

/// Weighted centre of mass of a set of focal points.
///
/// Each axis is `sum(coord * weight) / sum(weight)`, floor-divided and then
/// rounded, which makes the result the floor of the weighted mean.
///
/// Returns `None` for an empty set (or one whose weights do not sum to a
/// positive number): the caller must treat that as "no focal point", never
/// as `(0, 0)`.
///
/// # Examples
/// ```
/// # use focalpoint::focal::{FocalPoint, center_of_mass};
/// let points = [FocalPoint::new(10.0, 20.0), FocalPoint::new(15.0, 31.0)];
/// assert_eq!(center_of_mass(&points), Some((12, 25)));
/// assert_eq!(center_of_mass(&[]), None);
/// ```
pub fn center_of_mass(points: &[FocalPoint]) -> Option<(u32, u32)> {
    let (total_weight, total_x, total_y) =
        points
            .iter()
            .fold((0.0f64, 0.0f64, 0.0f64), |(w, x, y), p| {
                (w + p.weight, x + p.x * p.weight, y + p.y * p.weight)
            });

    if total_weight.is_nan() || total_weight <= 0.0 {
        return None;
    }

    let avg_x = (total_x / total_weight).floor().round();
    let avg_y = (total_y / total_weight).floor().round();

    // Detector coordinates are never negative; clamp for hand-built input.
    Some((avg_x.max(0.0) as u32, avg_y.max(0.0) as u32))
}

//! Pure calculation functions for scale and crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use std::fmt;

/// A crop rectangle in source pixels: `left..right` × `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Round to two decimals, the precision at which aspect ratios compare equal.
fn ratio(width: u32, height: u32) -> f64 {
    ((f64::from(width) / f64::from(height)) * 100.0).round_ties_even() / 100.0
}

/// Compute a crop box that keeps `focal` as central as the target aspect
/// ratio allows.
///
/// The axis that needs the least scaling is kept whole; the other one is
/// cut to the target aspect ratio and its window is centred on the focal
/// coordinate, then clamped to stay inside the source.
///
/// Returns `None` when no crop is needed: the source and target aspect
/// ratios are equal at two decimals, so a plain resize is enough. Also
/// `None` for a zero-sized source.
///
/// The cropped side length is `round(sw·th/tw)` when keeping the full width
/// but `round(ceil(tw·sh/th))` when keeping the full height. The asymmetry
/// is kept on purpose so crops match existing scales pixel for pixel.
/// Rounding is half-to-even throughout.
///
/// # Arguments
/// * `source` - Source dimensions (width, height)
/// * `target` - Requested dimensions (width, height); zeros count as 1
/// * `focal` - Focal point (x, y) in source pixels
///
/// # Examples
/// ```
/// # use focalpoint::imaging::{CropBox, compute_crop};
/// // Landscape source, square target, focal point right of centre
/// let crop = compute_crop((800, 600), (400, 400), (600, 300)).unwrap();
/// assert_eq!(crop, CropBox { left: 200, top: 0, right: 800, bottom: 600 });
///
/// // Same aspect ratio: nothing to crop
/// assert_eq!(compute_crop((800, 600), (400, 300), (0, 0)), None);
/// ```
pub fn compute_crop(source: (u32, u32), target: (u32, u32), focal: (u32, u32)) -> Option<CropBox> {
    let (source_width, source_height) = source;
    if source_width == 0 || source_height == 0 {
        return None;
    }
    let target_width = target.0.max(1);
    let target_height = target.1.max(1);

    if ratio(source_width, source_height) == ratio(target_width, target_height) {
        return None;
    }

    let (sw, sh) = (f64::from(source_width), f64::from(source_height));
    let (tw, th) = (f64::from(target_width), f64::from(target_height));
    let (focal_x, focal_y) = (f64::from(focal.0), f64::from(focal.1));

    if tw / sw > th / sh {
        // Keep the full source width, cut rows.
        let crop_height = ((sw * th / tw).round_ties_even() as u32).clamp(1, source_height);
        let top = window_start(focal_y, crop_height, source_height);
        Some(CropBox {
            left: 0,
            top,
            right: source_width,
            bottom: (top + crop_height).min(source_height),
        })
    } else {
        // Keep the full source height, cut columns.
        let crop_width = ((tw * sh / th).ceil().round_ties_even() as u32).clamp(1, source_width);
        let left = window_start(focal_x, crop_width, source_width);
        Some(CropBox {
            left,
            top: 0,
            right: (left + crop_width).min(source_width),
            bottom: source_height,
        })
    }
}

/// Start of a `length`-pixel window centred on `center`, clamped to
/// `[0, extent - length]`.
fn window_start(center: f64, length: u32, extent: u32) -> u32 {
    let ideal = center - f64::from(length) / 2.0;
    let max_start = f64::from(extent - length);
    ideal.max(0.0).min(max_start).round_ties_even() as u32
}

/// Fill in a missing target dimension from the source aspect ratio.
///
/// Returns `None` when neither dimension is given; the caller then serves
/// the original.
///
/// # Examples
/// ```
/// # use focalpoint::imaging::resolve_target_dimensions;
/// assert_eq!(resolve_target_dimensions((800, 600), Some(400), None), Some((400, 300)));
/// assert_eq!(resolve_target_dimensions((800, 600), None, Some(300)), Some((400, 300)));
/// assert_eq!(resolve_target_dimensions((800, 600), None, None), None);
/// ```
pub fn resolve_target_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let (src_w, src_h) = (f64::from(source.0.max(1)), f64::from(source.1.max(1)));
    match (width, height) {
        (Some(w), Some(h)) => Some((w.max(1), h.max(1))),
        (Some(w), None) => Some((w.max(1), ((f64::from(w) * src_h / src_w).round() as u32).max(1))),
        (None, Some(h)) => Some((((f64::from(h) * src_w / src_h).round() as u32).max(1), h.max(1))),
        (None, None) => None,
    }
}

/// Dimensions for a plain scale: fit inside the target box, preserving the
/// source aspect ratio and never upscaling.
///
/// # Examples
/// ```
/// # use focalpoint::imaging::calculate_fit_dimensions;
/// assert_eq!(calculate_fit_dimensions((800, 600), (400, 400)), (400, 300));
/// assert_eq!(calculate_fit_dimensions((200, 100), (400, 400)), (200, 100));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = (target.0.max(1), target.1.max(1));

    if src_w <= tgt_w && src_h <= tgt_h {
        return (src_w, src_h);
    }

    let scale = (f64::from(tgt_w) / f64::from(src_w)).min(f64::from(tgt_h) / f64::from(src_h));
    (
        ((f64::from(src_w) * scale).round() as u32).max(1),
        ((f64::from(src_h) * scale).round() as u32).max(1),
    )
}

/// Orientation of an image, for human-readable summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aspect {
    Square,
    Landscape,
    Portrait,
}

impl Aspect {
    pub fn of(width: u32, height: u32) -> Self {
        if width == height {
            Aspect::Square
        } else if width > height {
            Aspect::Landscape
        } else {
            Aspect::Portrait
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aspect::Square => "square",
            Aspect::Landscape => "landscape",
            Aspect::Portrait => "portrait",
        })
    }
}

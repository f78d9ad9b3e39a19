//! # Focalpoint
//!
//! Automatic focal points for uploaded images, and crop-to-fit scaling that
//! keeps the focal point in frame.
//!
//! # Architecture: Detect Once, Crop Often
//!
//! ```text
//! 1. Detect   image field added/modified  →  one (x, y) stored on the field
//! 2. Scale    scale request, cache miss   →  crop box around (x, y) → resize
//! ```
//!
//! Detection is the expensive part and runs once per image change. Every
//! later scale only reads the stored point, so crops stay consistent across
//! sizes and across runs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`focal`] | Corner detection, the pluggable detector set, centre-of-mass aggregation |
//! | [`imaging`] | Crop geometry, scale-mode table, the `image`-crate backend |
//! | [`field`] | Image fields, sidecar metadata, content items and tiles |
//! | [`pipeline`] | Detection on fields; lifecycle subscriber and data manager |
//! | [`cache`] | File-backed scale storage with conflict detection |
//! | [`scaling`] | Scale factory: request → original, pass-through or stored scale |
//! | [`debug`] | `clear_scales` summary and `friendly_size` |
//! | [`config`] | `focalpoint.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Corners, Not Saliency
//!
//! The stock detector is Shi–Tomasi "good features to track" on luminance.
//! It is cheap, deterministic and needs no model files. Corners cluster
//! where an image has detail, and the centre of mass of the strongest twenty
//! is a good stand-in for "where the subject is". Other detectors (faces,
//! saliency) plug into [`focal::DetectorSet`] and contribute weighted points.
//!
//! ## One Stored Point
//!
//! Only the aggregate is persisted. An image with no detectable features
//! stores no focal point at all, and its scales fall back to a centred crop;
//! a degenerate `(0, 0)` would drag every crop into the top-left corner.
//!
//! ## Crop Geometry Matches Existing Scales
//!
//! [`imaging::compute_crop`] reproduces the established rounding exactly,
//! including the asymmetry between the two crop axes, so crop boxes match
//! the existing geometry. Resampling is Lanczos3, so pixels of regenerated
//! scales may differ slightly from older ones.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing (Lanczos3) and encoding use the `image` crate;
//! gradients come from `imageproc`. No system libraries are needed.

pub mod cache;
pub mod config;
pub mod debug;
pub mod field;
pub mod focal;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod scaling;

#[cfg(test)]
pub(crate) mod test_helpers;

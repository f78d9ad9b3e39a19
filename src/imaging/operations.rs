//! High-level scale operations.
//!
//! These functions combine the crop calculations with backend execution.
//! Each [`ScaleMode`] maps to one handler through a lookup table; a handler
//! turns a [`ScaleJob`] into concrete backend parameters and runs them.

use super::backend::{BackendError, ImageBackend, ScaledImage};
use super::calculations::{calculate_fit_dimensions, compute_crop};
use super::params::{CropResizeParams, FillParams, FitParams, OutputFormat, Quality, ScaleMode};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Everything a mode handler needs to produce one scale.
#[derive(Debug, Clone, Copy)]
pub struct ScaleJob<'a> {
    /// Encoded source bytes.
    pub data: &'a [u8],
    /// Source dimensions.
    pub source: (u32, u32),
    /// Requested dimensions, both already resolved.
    pub target: (u32, u32),
    pub format: OutputFormat,
    pub quality: Quality,
    /// Stored focal point, if detection found one.
    pub focal_point: Option<(u32, u32)>,
}

/// A mode handler.
pub type ModeHandler = fn(&dyn ImageBackend, &ScaleJob<'_>) -> Result<ScaledImage>;

const MODE_HANDLERS: [(ScaleMode, ModeHandler); 3] = [
    (ScaleMode::Contain, focal_crop),
    (ScaleMode::Cover, focal_crop),
    (ScaleMode::Scale, plain_scale),
];

/// Look up the handler for `mode`.
pub fn handler_for(mode: ScaleMode) -> ModeHandler {
    MODE_HANDLERS
        .iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, handler)| *handler)
        .unwrap_or(plain_scale)
}

/// Create one scale of `job.data` in the given mode.
pub fn create_scale(
    backend: &dyn ImageBackend,
    mode: ScaleMode,
    job: &ScaleJob<'_>,
) -> Result<ScaledImage> {
    handler_for(mode)(backend, job)
}

/// Crop around the focal point, then resize to the exact target.
///
/// Without a focal point this falls back to a centred fill. When the source
/// already has the target aspect ratio nothing is cropped.
fn focal_crop(backend: &dyn ImageBackend, job: &ScaleJob<'_>) -> Result<ScaledImage> {
    let (width, height) = (job.target.0.max(1), job.target.1.max(1));

    let Some(focal) = job.focal_point else {
        return backend.fill(
            job.data,
            &FillParams {
                width,
                height,
                format: job.format,
                quality: job.quality,
            },
        );
    };

    match compute_crop(job.source, job.target, focal) {
        Some(crop) => backend.crop_resize(
            job.data,
            &CropResizeParams {
                left: crop.left,
                top: crop.top,
                crop_width: crop.width(),
                crop_height: crop.height(),
                width,
                height,
                format: job.format,
                quality: job.quality,
            },
        ),
        None => backend.fit(
            job.data,
            &FitParams {
                width,
                height,
                format: job.format,
                quality: job.quality,
            },
        ),
    }
}

/// Fit inside the target box keeping the aspect ratio. Never upscales.
fn plain_scale(backend: &dyn ImageBackend, job: &ScaleJob<'_>) -> Result<ScaledImage> {
    let (width, height) = calculate_fit_dimensions(job.source, job.target);
    backend.fit(
        job.data,
        &FitParams {
            width,
            height,
            format: job.format,
            quality: job.quality,
        },
    )
}

//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: identify, crop-and-resize, fill and fit. All of them work on
//! in-memory encoded bytes, because image fields carry their blob rather
//! than a path.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{CropResizeParams, FillParams, FitParams, OutputFormat};
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Detected container format, if recognised.
    pub format: Option<ImageFormat>,
}

/// An encoded scale, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Every backend implements all operations so the mode table in
/// [`operations`](super::operations) is backend-agnostic.
pub trait ImageBackend: Sync {
    /// Read dimensions and format without a full decode.
    fn identify(&self, data: &[u8]) -> Result<SourceInfo, BackendError>;

    /// Crop a region, then resize it to exact dimensions.
    fn crop_resize(
        &self,
        data: &[u8],
        params: &CropResizeParams,
    ) -> Result<ScaledImage, BackendError>;

    /// Resize to cover the target, centre-cropping the overflow.
    fn fill(&self, data: &[u8], params: &FillParams) -> Result<ScaledImage, BackendError>;

    /// Resize to exact dimensions without cropping.
    fn fit(&self, data: &[u8], params: &FitParams) -> Result<ScaledImage, BackendError>;
}

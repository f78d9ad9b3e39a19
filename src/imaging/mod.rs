//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` (header only) |
//! | **Focal crop** | [`compute_crop`] + `crop_imm` + Lanczos3 `resize_exact` |
//! | **Centred fill** | `resize_to_fill` |
//! | **Plain scale** | [`calculate_fit_dimensions`] + Lanczos3 |
//! | **Encode** | JPEG (`JpegEncoder`) or PNG (`PngEncoder`) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and scale geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The scale-mode table combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ScaledImage, SourceInfo};
pub use calculations::{
    Aspect, CropBox, calculate_fit_dimensions, compute_crop, resolve_target_dimensions,
};
pub use operations::{ModeHandler, ScaleJob, create_scale, handler_for};
pub use params::{
    CropResizeParams, FillParams, FitParams, OutputFormat, Quality, ScaleMode, UnknownScaleMode,
};
pub use rust_backend::RustBackend;

//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::load_from_memory` |
//! | Identify | `ImageReader::with_guessed_format` + `into_dimensions` (header only) |
//! | Crop | `DynamicImage::crop_imm` |
//! | Resize | `DynamicImage::resize_exact` / `resize_to_fill` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |

use super::backend::{BackendError, ImageBackend, ScaledImage, SourceInfo};
use super::params::{CropResizeParams, FillParams, FitParams, OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageReader};
use std::io::Cursor;

/// Extensions whose decoders are compiled in.
const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "tif", "tiff", "webp"];

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    PHOTO_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an encoded image held in memory.
pub fn decode(data: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(data).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Encode to the requested format. JPEG drops alpha; PNG keeps the pixel
/// layout of the source.
fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<ScaledImage, BackendError> {
    let mut data = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = img.to_rgb8();
            // `value()` is clamped to 1..=100 so the cast never truncates.
            JpegEncoder::new_with_quality(&mut data, quality.value() as u8)
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| BackendError::Encode(e.to_string()))?;
        }
        OutputFormat::Png => {
            img.write_with_encoder(PngEncoder::new(&mut data))
                .map_err(|e| BackendError::Encode(e.to_string()))?;
        }
    }
    Ok(ScaledImage {
        data,
        format,
        width: img.width(),
        height: img.height(),
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<SourceInfo, BackendError> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let format = reader.format();
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(SourceInfo {
            width,
            height,
            format,
        })
    }

    fn crop_resize(
        &self,
        data: &[u8],
        params: &CropResizeParams,
    ) -> Result<ScaledImage, BackendError> {
        let img = decode(data)?;
        if params.left + params.crop_width > img.width()
            || params.top + params.crop_height > img.height()
        {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {}x{}+{}+{} outside {}x{} image",
                params.crop_width,
                params.crop_height,
                params.left,
                params.top,
                img.width(),
                img.height()
            )));
        }
        let cropped = img.crop_imm(params.left, params.top, params.crop_width, params.crop_height);
        let resized = cropped.resize_exact(params.width, params.height, FilterType::Lanczos3);
        encode(&resized, params.format, params.quality)
    }

    fn fill(&self, data: &[u8], params: &FillParams) -> Result<ScaledImage, BackendError> {
        let img = decode(data)?;
        let filled = img.resize_to_fill(params.width, params.height, FilterType::Lanczos3);
        encode(&filled, params.format, params.quality)
    }

    fn fit(&self, data: &[u8], params: &FitParams) -> Result<ScaledImage, BackendError> {
        let img = decode(data)?;
        let resized = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode(&resized, params.format, params.quality)
    }
}

//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how*. They are the interface
//! between the [`operations`](super::operations) mode table, which decides
//! which pixel work a scale needs, and the [`backend`](super::backend), which
//! does it. Swapping the backend (e.g. for a mock in tests) never changes the
//! operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 88). Clamped on construction.
//! - [`ScaleMode`]: contain / cover / scale, with the legacy aliases.
//! - [`OutputFormat`]: JPEG or PNG, chosen from the source format.
//! - [`CropResizeParams`], [`FillParams`], [`FitParams`]: one per backend call.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(88)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown scale mode '{0}'")]
pub struct UnknownScaleMode(pub String);

/// How a source image is fitted to requested dimensions.
///
/// | Mode | Aliases | Behaviour |
/// |---|---|---|
/// | `Contain` | `scale-crop-to-fit`, `down` | crop around the focal point, then resize |
/// | `Cover` | `scale-crop-to-fill`, `up` | crop around the focal point, then resize |
/// | `Scale` | `keep`, `thumbnail` | fit inside the box, no crop, no upscaling |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    #[serde(alias = "scale-crop-to-fit", alias = "down")]
    Contain,
    #[serde(alias = "scale-crop-to-fill", alias = "up")]
    Cover,
    #[serde(alias = "keep", alias = "thumbnail")]
    Scale,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 3] = [ScaleMode::Contain, ScaleMode::Cover, ScaleMode::Scale];

    pub fn as_str(self) -> &'static str {
        match self {
            ScaleMode::Contain => "contain",
            ScaleMode::Cover => "cover",
            ScaleMode::Scale => "scale",
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleMode {
    type Err = UnknownScaleMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" | "scale-crop-to-fit" | "down" => Ok(ScaleMode::Contain),
            "cover" | "scale-crop-to-fill" | "up" => Ok(ScaleMode::Cover),
            "scale" | "keep" | "thumbnail" => Ok(ScaleMode::Scale),
            _ => Err(UnknownScaleMode(s.to_string())),
        }
    }
}

/// Encoded format of a created scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// PNG and GIF sources stay lossless (GIF becomes PNG); everything else
    /// is written as JPEG.
    pub fn for_source(format: Option<ImageFormat>) -> Self {
        match format {
            Some(ImageFormat::Png) | Some(ImageFormat::Gif) => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        })
    }
}

/// Crop a region out of the source, then resize it to exactly
/// `width × height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropResizeParams {
    pub left: u32,
    pub top: u32,
    pub crop_width: u32,
    pub crop_height: u32,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Resize to cover `width × height` and centre-crop the overflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillParams {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Resize to exactly `width × height` (already aspect-correct).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

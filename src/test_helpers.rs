//! Shared test utilities for the focalpoint test suite.
//!
//! Synthetic images (drawn with `imageproc`), their encoded bytes, and
//! prebuilt content items holding them.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let img = square_on_black(64, 64, 20, 20, 20);
//! let item = item_with_image("photo", &png_bytes(&img));
//! ```

use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

use crate::field::{ContentItem, ImageField};

// =========================================================================
// Synthetic rasters
// =========================================================================

/// A uniform grey image.
pub fn blank_gray(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// A white `size × size` square at `(x, y)` on a black background.
///
/// The square covers `[x, x + size)` on both axes, so its corners sit at
/// `(x, y)`, `(x + size - 1, y)`, `(x, y + size - 1)` and
/// `(x + size - 1, y + size - 1)`.
pub fn square_on_black(width: u32, height: u32, x: u32, y: u32, size: u32) -> GrayImage {
    let mut img = blank_gray(width, height, 0);
    draw_filled_rect_mut(
        &mut img,
        Rect::at(x as i32, y as i32).of_size(size, size),
        Luma([255]),
    );
    img
}

/// A colour gradient with no strong corners.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

// =========================================================================
// Encoded bytes
// =========================================================================

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn png_bytes(img: &GrayImage) -> Vec<u8> {
    encode(&DynamicImage::ImageLuma8(img.clone()), ImageFormat::Png)
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(gradient_rgb(width, height)),
        ImageFormat::Png,
    )
}

pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(gradient_rgb(width, height)),
        ImageFormat::Jpeg,
    )
}

pub fn gradient_gif(width: u32, height: u32) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgba8(DynamicImage::ImageRgb8(gradient_rgb(width, height)).to_rgba8()),
        ImageFormat::Gif,
    )
}

/// A 64×64 PNG with one bright square, whose corners average to about
/// `(29, 29)`.
pub fn square_png() -> Vec<u8> {
    png_bytes(&square_on_black(64, 64, 20, 20, 20))
}

// =========================================================================
// Content items
// =========================================================================

/// A content item at `http://site/item` with a single image field.
pub fn item_with_image(field_name: &str, data: &[u8]) -> ContentItem {
    let mut item = ContentItem::new("http://site/item");
    item.set_image(field_name, ImageField::new(data.to_vec(), "image.png"));
    item
}

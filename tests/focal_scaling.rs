//! End-to-end: detect a focal point on a stored image, then scale it through
//! the factory and on-disk storage the way a content site would.

use focalpoint::cache::{ScaleError, ScaleStorage};
use focalpoint::config::FocalConfig;
use focalpoint::debug::clear_scales;
use focalpoint::field::{ContentItem, FieldContainer, FieldMetadata, ImageField, sidecar_path};
use focalpoint::focal::{DetectorError, DetectorSet, FocalPoint, FocalPointDetector};
use focalpoint::imaging::{RustBackend, ScaleMode};
use focalpoint::pipeline::{ContentEvent, Detection, FocalPointPipeline};
use focalpoint::scaling::{ScaleOutcome, ScaleRequest, ScalingFactory};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;
use tempfile::TempDir;
use tracing::Span;

/// 200x100 black PNG with a white 20x20 square at (150, 40).
fn wide_png_with_square_right() -> Vec<u8> {
    let img = GrayImage::from_fn(200, 100, |x, y| {
        if (150..170).contains(&x) && (40..60).contains(&y) {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn pipeline() -> FocalPointPipeline {
    FocalPointPipeline::from_config(&FocalConfig::default().detection, Span::none())
}

fn factory() -> ScalingFactory<RustBackend> {
    ScalingFactory::new(
        RustBackend::new(),
        FocalConfig::default().scaling,
        Span::none(),
    )
}

fn added_item() -> ContentItem {
    let mut item = ContentItem::new("http://site/news/wide");
    item.set_image("image", ImageField::new(wide_png_with_square_right(), "wide.png"));
    let results = pipeline().handle_event(&mut item, ContentEvent::Added);
    assert_eq!(results.len(), 1);
    item
}

// =========================================================================
// Detection
// =========================================================================

#[test]
fn added_item_gets_focal_point_on_the_square() {
    let item = added_item();
    let (x, y) = item.image("image").unwrap().focal_point.unwrap();
    assert!((145..=175).contains(&x), "x = {x}");
    assert!((35..=65).contains(&y), "y = {y}");
}

#[test]
fn plain_image_has_no_focal_point() {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([90])))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    let mut field = ImageField::new(buf.into_inner(), "flat.png");
    field.focal_point = Some((1, 1));

    assert_eq!(pipeline().determine_for_field(&mut field), Detection::Cleared);
    assert_eq!(field.focal_point, None);
}

struct TopLeftDetector;

impl FocalPointDetector for TopLeftDetector {
    fn name(&self) -> &str {
        "top-left"
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<FocalPoint>, DetectorError> {
        Ok(vec![FocalPoint::with_weight(0.0, 0.0, 3.0)])
    }
}

#[test]
fn registered_detector_pulls_the_aggregate() {
    let mut detectors = DetectorSet::new();
    detectors.register(TopLeftDetector);
    let only_custom = FocalPointPipeline::new(detectors, Span::none());

    let mut field = ImageField::new(wide_png_with_square_right(), "wide.png");
    assert_eq!(
        only_custom.determine_for_field(&mut field),
        Detection::Found((0, 0))
    );
}

#[test]
fn sidecar_round_trip_survives_until_image_changes() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("wide.png");
    std::fs::write(&path, wide_png_with_square_right()).unwrap();

    let mut field = ImageField::from_path(&path).unwrap();
    pipeline().determine_for_field(&mut field);
    field.metadata().save(&sidecar_path(&path)).unwrap();

    let meta = FieldMetadata::load(&sidecar_path(&path)).unwrap().unwrap();
    let mut reloaded = ImageField::from_path(&path).unwrap();
    assert!(reloaded.apply_metadata(&meta));
    assert_eq!(reloaded.focal_point, field.focal_point);

    let mut other = ImageField::new(b"different bytes".to_vec(), "wide.png");
    assert!(!other.apply_metadata(&meta));
    assert_eq!(other.focal_point, None);
}

// =========================================================================
// Scaling
// =========================================================================

#[test]
fn contain_crop_keeps_the_square_in_frame() {
    let tmp = TempDir::new().unwrap();
    let mut storage = ScaleStorage::open(tmp.path(), 86400).unwrap();
    let item = added_item();

    let request = ScaleRequest::sized(100, 100).with_mode(ScaleMode::Contain);
    let Some(ScaleOutcome::Scaled(stored)) =
        factory().scale(&item, &mut storage, &request, 0).unwrap()
    else {
        panic!("expected a stored scale");
    };
    assert_eq!((stored.entry.width, stored.entry.height), (100, 100));

    // The crop window is the right half, so the square lands at x 50..70.
    let out = image::load_from_memory(&stored.data).unwrap().to_luma8();
    assert_eq!(out.dimensions(), (100, 100));
    assert!(out.get_pixel(60, 50)[0] > 200);
    assert!(out.get_pixel(10, 50)[0] < 50);
}

#[test]
fn scale_mode_fits_without_cropping() {
    let tmp = TempDir::new().unwrap();
    let mut storage = ScaleStorage::open(tmp.path(), 86400).unwrap();
    let item = added_item();

    let request = ScaleRequest::sized(100, 100).with_mode(ScaleMode::Scale);
    let Some(ScaleOutcome::Scaled(stored)) =
        factory().scale(&item, &mut storage, &request, 0).unwrap()
    else {
        panic!("expected a stored scale");
    };
    assert_eq!((stored.entry.width, stored.entry.height), (100, 50));
}

#[test]
fn repeated_request_is_served_from_storage() {
    let tmp = TempDir::new().unwrap();
    let item = added_item();
    let request = ScaleRequest::named("thumb");

    let mut storage = ScaleStorage::open(tmp.path(), 86400).unwrap();
    let first = factory().scale(&item, &mut storage, &request, 0).unwrap();
    let second = factory().scale(&item, &mut storage, &request, 10).unwrap();
    assert_eq!(first, second);
    assert_eq!((storage.stats().hits, storage.stats().misses), (1, 1));

    // A fresh handle sees the persisted entry.
    let mut reopened = ScaleStorage::open(tmp.path(), 86400).unwrap();
    factory().scale(&item, &mut reopened, &request, 20).unwrap();
    assert_eq!(reopened.stats().hits, 1);
    assert_eq!(reopened.len(), 1);
}

#[test]
fn concurrent_writers_conflict() {
    let tmp = TempDir::new().unwrap();
    let item = added_item();

    let mut first = ScaleStorage::open(tmp.path(), 86400).unwrap();
    let mut second = ScaleStorage::open(tmp.path(), 86400).unwrap();
    factory()
        .scale(&item, &mut first, &ScaleRequest::named("mini"), 0)
        .unwrap();

    let result = factory().scale(&item, &mut second, &ScaleRequest::named("tile"), 0);
    assert!(matches!(result, Err(ScaleError::Conflict { .. })));
}

#[test]
fn unknown_scale_name_is_none() {
    let tmp = TempDir::new().unwrap();
    let mut storage = ScaleStorage::open(tmp.path(), 86400).unwrap();
    let item = added_item();
    let outcome = factory()
        .scale(&item, &mut storage, &ScaleRequest::named("poster"), 0)
        .unwrap();
    assert_eq!(outcome, None);
    assert!(storage.is_empty());
}

// =========================================================================
// Clearing
// =========================================================================

#[test]
fn forced_clear_empties_storage_and_reports() {
    let tmp = TempDir::new().unwrap();
    let mut storage = ScaleStorage::open(tmp.path(), 86400).unwrap();
    let mut item = added_item();
    for name in ["mini", "thumb", "icon"] {
        factory()
            .scale(&item, &mut storage, &ScaleRequest::named(name), 0)
            .unwrap();
    }
    assert_eq!(storage.len(), 3);

    let summary = clear_scales(&mut item, &mut storage, &pipeline(), true, 0).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], "Cleared 3 scales from annotation storage.");
    assert_eq!(lines[1], "0 scales left.");
    assert_eq!(lines[2], "Image dimensions: width 200 x height 100 (landscape)");
    assert!(storage.is_empty());
    assert_eq!(
        std::fs::read_dir(tmp.path()).unwrap().count(),
        1,
        "only the manifest remains"
    );
}

//! Focal point determination for image fields.
//!
//! [`FocalPointPipeline`] owns the registered detectors and a logging span.
//! It decodes a field, runs every detector, aggregates the points and
//! writes the result back to the field:
//!
//! | Outcome | Field after |
//! |---|---|
//! | points found | `focal_point = Some(centre of mass)` |
//! | no points | `focal_point = None` |
//! | pixels fail to decode after the header identified | `focal_point = None` (error logged) |
//! | blob not recognised as an image | unchanged (warning logged) |
//!
//! The same entry point serves the lifecycle subscriber ([`handle_event`])
//! and the data manager ([`set_field`]).
//!
//! [`handle_event`]: FocalPointPipeline::handle_event

use crate::config::DetectionConfig;
use crate::field::{ContentItem, FieldContainer, FieldError, ImageField};
use crate::focal::{DetectorSet, center_of_mass};
use crate::imaging::rust_backend::decode;
use crate::imaging::{ImageBackend, RustBackend};
use image::DynamicImage;
use tracing::{Span, debug, error, warn};

/// What happened to a field's focal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Detection ran and stored this point.
    Found((u32, u32)),
    /// Detection ran, found nothing, and cleared the point.
    Cleared,
    /// Detection did not run; the stored point is untouched.
    Skipped,
}

/// Lifecycle notification for a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEvent {
    Added,
    Modified,
}

pub struct FocalPointPipeline {
    detectors: DetectorSet,
    span: Span,
}

impl FocalPointPipeline {
    pub fn new(detectors: DetectorSet, span: Span) -> Self {
        Self { detectors, span }
    }

    pub fn from_config(config: &DetectionConfig, span: Span) -> Self {
        Self::new(DetectorSet::from_config(config), span)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run all detectors on a decoded image and aggregate.
    pub fn detect_image(&self, image: &DynamicImage) -> Option<(u32, u32)> {
        center_of_mass(&self.detectors.detect(image))
    }

    /// Determine and store the focal point of one field.
    pub fn determine_for_field(&self, field: &mut ImageField) -> Detection {
        let _enter = self.span.enter();

        if field.is_empty() || field.is_svg() {
            debug!(filename = %field.filename, "no raster data, detection skipped");
            return Detection::Skipped;
        }

        let image = match decode(field.data()) {
            Ok(img) => img,
            // A readable header means the detectors would have run and failed.
            Err(e) if RustBackend::new().identify(field.data()).is_ok() => {
                error!(filename = %field.filename, error = %e, "image data corrupt, focal point cleared");
                field.focal_point = None;
                return Detection::Cleared;
            }
            Err(e) => {
                warn!(filename = %field.filename, error = %e, "could not open image for focal point detection");
                return Detection::Skipped;
            }
        };

        match self.detect_image(&image) {
            Some(point) => {
                debug!(filename = %field.filename, x = point.0, y = point.1, "focal point stored");
                field.focal_point = Some(point);
                Detection::Found(point)
            }
            None => {
                debug!(filename = %field.filename, "no focal points, cleared");
                field.focal_point = None;
                Detection::Cleared
            }
        }
    }

    /// Run detection on every non-empty image field of a container.
    pub fn determine_for_container(
        &self,
        container: &mut dyn FieldContainer,
    ) -> Vec<(String, Detection)> {
        let url = container.url();
        let mut results = Vec::new();
        for name in container.field_names() {
            let Some(field) = container.image_mut(&name) else {
                continue;
            };
            if field.is_empty() {
                continue;
            }
            let outcome = self.determine_for_field(field);
            debug!(parent: &self.span, field = %name, url = %url, outcome = ?outcome, "field processed");
            results.push((name, outcome));
        }
        results
    }

    /// Subscriber for content lifecycle events.
    ///
    /// Items that do not want transforming are ignored.
    pub fn handle_event(
        &self,
        item: &mut ContentItem,
        event: ContentEvent,
    ) -> Vec<(String, Detection)> {
        if !item.wants_transforming {
            return Vec::new();
        }
        debug!(parent: &self.span, event = ?event, url = %item.url(), "content event");
        self.determine_for_container(item)
    }
}

/// Data manager write: determine the focal point of `value`, then store it.
///
/// A read-only field is rejected before any detection runs. `None` removes
/// the value. Returns the detection outcome for a stored value.
pub fn set_field(
    container: &mut dyn FieldContainer,
    name: &str,
    value: Option<ImageField>,
    pipeline: &FocalPointPipeline,
) -> Result<Option<Detection>, FieldError> {
    if container.is_read_only(name) {
        return Err(FieldError::ReadOnly {
            field: name.to_string(),
            url: container.url(),
        });
    }

    let Some(mut field) = value else {
        container.store(name, None);
        return Ok(None);
    };
    let outcome = pipeline.determine_for_field(&mut field);
    container.store(name, Some(field));
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focal::FocalPoint;
    use crate::focal::detector::tests::{FailingDetector, FixedDetector};
    use crate::field::TileData;
    use crate::test_helpers::{blank_gray, gradient_png, item_with_image, png_bytes, square_png};
    use tracing_test::traced_test;

    fn pipeline() -> FocalPointPipeline {
        FocalPointPipeline::from_config(&DetectionConfig::default(), Span::none())
    }

    fn fixed(points: Vec<FocalPoint>) -> FocalPointPipeline {
        let mut set = DetectorSet::new();
        set.register(FixedDetector(points));
        FocalPointPipeline::new(set, Span::none())
    }

    #[test]
    fn square_gets_focal_point_near_center() {
        let mut field = ImageField::new(square_png(), "sq.png");
        let outcome = pipeline().determine_for_field(&mut field);

        let Detection::Found((x, y)) = outcome else {
            panic!("expected a focal point, got {outcome:?}");
        };
        assert_eq!(field.focal_point, Some((x, y)));
        assert!((22..=37).contains(&x), "x = {x}");
        assert!((22..=37).contains(&y), "y = {y}");
    }

    #[test]
    fn blank_image_clears_existing_point() {
        let mut field = ImageField::new(png_bytes(&blank_gray(40, 40, 90)), "blank.png");
        field.focal_point = Some((5, 5));

        assert_eq!(pipeline().determine_for_field(&mut field), Detection::Cleared);
        assert_eq!(field.focal_point, None);
    }

    #[test]
    fn empty_detection_clears_never_zero() {
        let mut field = ImageField::new(square_png(), "sq.png");
        field.focal_point = Some((9, 9));
        assert_eq!(fixed(vec![]).determine_for_field(&mut field), Detection::Cleared);
        assert_eq!(field.focal_point, None);
    }

    #[test]
    fn failing_detector_clears() {
        let mut set = DetectorSet::new();
        set.register(FailingDetector);
        let pipeline = FocalPointPipeline::new(set, Span::none());

        let mut field = ImageField::new(square_png(), "sq.png");
        field.focal_point = Some((9, 9));
        assert_eq!(pipeline.determine_for_field(&mut field), Detection::Cleared);
    }

    #[traced_test]
    #[test]
    fn undecodable_blob_keeps_point_and_warns() {
        let mut field = ImageField::new(b"\x89PNG broken".to_vec(), "broken.png");
        field.focal_point = Some((7, 7));

        assert_eq!(pipeline().determine_for_field(&mut field), Detection::Skipped);
        assert_eq!(field.focal_point, Some((7, 7)));
        assert!(logs_contain("could not open image"));
        assert!(logs_contain("broken.png"));
    }

    #[traced_test]
    #[test]
    fn truncated_pixel_data_clears_point() {
        let mut data = gradient_png(64, 64);
        data.truncate(data.len() / 2);
        let mut field = ImageField::new(data, "cut.png");
        field.focal_point = Some((7, 7));

        assert_eq!(pipeline().determine_for_field(&mut field), Detection::Cleared);
        assert_eq!(field.focal_point, None);
        assert!(logs_contain("image data corrupt"));
    }

    #[test]
    fn svg_skipped() {
        let mut field = ImageField::new(b"<svg/>".to_vec(), "logo.svg");
        assert_eq!(pipeline().determine_for_field(&mut field), Detection::Skipped);
    }

    #[test]
    fn redetection_is_idempotent() {
        let mut field = ImageField::new(square_png(), "sq.png");
        let p = pipeline();
        let first = p.determine_for_field(&mut field);
        let second = p.determine_for_field(&mut field);
        assert_eq!(first, second);
    }

    #[test]
    fn fixed_points_aggregate() {
        let mut field = ImageField::new(square_png(), "sq.png");
        let p = fixed(vec![
            FocalPoint::new(0.0, 100.0),
            FocalPoint::new(50.0, 50.0),
            FocalPoint::new(50.0, 50.0),
        ]);
        assert_eq!(p.determine_for_field(&mut field), Detection::Found((33, 66)));
    }

    // =========================================================================
    // Subscriber
    // =========================================================================

    #[test]
    fn event_processes_all_image_fields() {
        let mut item = item_with_image("image", &square_png());
        item.set_image("banner", ImageField::new(square_png(), "b.png"));

        let results = pipeline().handle_event(&mut item, ContentEvent::Added);
        assert_eq!(results.len(), 2);
        assert!(item.image("image").unwrap().focal_point.is_some());
        assert!(item.image("banner").unwrap().focal_point.is_some());
    }

    #[test]
    fn event_ignored_when_not_transforming() {
        let mut item = item_with_image("image", &square_png());
        item.wants_transforming = false;

        assert!(
            pipeline()
                .handle_event(&mut item, ContentEvent::Modified)
                .is_empty()
        );
        assert_eq!(item.image("image").unwrap().focal_point, None);
    }

    #[test]
    fn empty_fields_are_not_processed() {
        let mut item = item_with_image("image", &[]);
        assert!(
            pipeline()
                .handle_event(&mut item, ContentEvent::Modified)
                .is_empty()
        );
    }

    // =========================================================================
    // Data manager
    // =========================================================================

    #[test]
    fn set_field_detects_before_storing() {
        let mut tile = TileData::new("http://site/page", "image.tile", "t1");
        let outcome = set_field(
            &mut tile,
            "image",
            Some(ImageField::new(square_png(), "sq.png")),
            &pipeline(),
        )
        .unwrap();

        assert!(matches!(outcome, Some(Detection::Found(_))));
        assert!(tile.image("image").unwrap().focal_point.is_some());
    }

    #[test]
    fn set_field_none_removes() {
        let mut item = item_with_image("image", &square_png());
        assert_eq!(set_field(&mut item, "image", None, &pipeline()).unwrap(), None);
        assert!(item.image("image").is_none());
    }

    #[test]
    fn set_field_read_only_rejected() {
        let mut item = item_with_image("image", &square_png());
        item.mark_read_only("image");

        let err = set_field(
            &mut item,
            "image",
            Some(ImageField::new(square_png(), "new.png")),
            &pipeline(),
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::ReadOnly { ref field, .. } if field == "image"));
        // Untouched: still the original, never detected
        assert_eq!(item.image("image").unwrap().focal_point, None);
        assert_eq!(item.image("image").unwrap().filename, "image.png");
    }
}

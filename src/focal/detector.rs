//! Pluggable focal point detectors.
//!
//! A [`FocalPointDetector`] turns a decoded image into zero or more weighted
//! [`FocalPoint`]s. Several detectors can be registered in a [`DetectorSet`];
//! the set runs all of them and concatenates their output, so aggregation
//! never depends on which detector found what, or in which order.
//!
//! Only one detector ships today: [`FeatureDetector`], a corner detector.
//! A face detector would plug in the same way, typically with a larger
//! weight per point.

use super::corners::{CornerParams, good_features_to_track};
use super::point::FocalPoint;
use crate::config::DetectionConfig;
use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("detection failed: {0}")]
    Failed(String),
}

/// Something that finds points of visual interest in an image.
pub trait FocalPointDetector: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Detect focal points. An empty vector means "nothing interesting".
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FocalPoint>, DetectorError>;
}

/// Corner-feature detector ("good features to track").
///
/// Works on luminance only; every corner becomes a point with the same
/// weight, so this detector does not rank its output.
#[derive(Debug, Clone)]
pub struct FeatureDetector {
    params: CornerParams,
    weight: f64,
}

impl FeatureDetector {
    pub fn new(params: CornerParams, weight: f64) -> Self {
        Self { params, weight }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            CornerParams {
                max_corners: config.max_corners,
                quality_level: config.quality_level,
                min_distance: config.min_distance,
            },
            config.weight,
        )
    }
}

impl Default for FeatureDetector {
    fn default() -> Self {
        Self::new(CornerParams::default(), FocalPoint::DEFAULT_WEIGHT)
    }
}

impl FocalPointDetector for FeatureDetector {
    fn name(&self) -> &str {
        "features"
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<FocalPoint>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectorError::EmptyImage);
        }
        let gray = image.to_luma8();
        let corners = good_features_to_track(&gray, &self.params);
        Ok(corners
            .into_iter()
            .map(|c| FocalPoint::with_weight(f64::from(c.x), f64::from(c.y), self.weight))
            .collect())
    }
}

/// The registered detectors, run as one.
#[derive(Default)]
pub struct DetectorSet {
    detectors: Vec<Box<dyn FocalPointDetector>>,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock set: corner features configured from `config`.
    pub fn from_config(config: &DetectionConfig) -> Self {
        let mut set = Self::new();
        set.register(FeatureDetector::from_config(config));
        set
    }

    pub fn register(&mut self, detector: impl FocalPointDetector + 'static) {
        self.detectors.push(Box::new(detector));
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector and merge the results.
    ///
    /// A failing detector is logged and contributes no points; it never
    /// prevents the others from running.
    pub fn detect(&self, image: &DynamicImage) -> Vec<FocalPoint> {
        let mut points = Vec::new();
        for detector in &self.detectors {
            match detector.detect(image) {
                Ok(found) => {
                    debug!(detector = detector.name(), count = found.len(), "focal points found");
                    points.extend(found);
                }
                Err(e) => {
                    error!(detector = detector.name(), error = ?e, "error during focal point detection");
                }
            }
        }
        points
    }
}

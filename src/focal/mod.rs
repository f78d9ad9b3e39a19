//! Focal point detection.
//!
//! | Piece | Role |
//! |---|---|
//! | [`corners`] | Shi–Tomasi "good features to track" on a luminance image |
//! | [`detector`] | [`FocalPointDetector`] trait, [`FeatureDetector`], [`DetectorSet`] |
//! | [`point`] | [`FocalPoint`] value type and [`center_of_mass`] aggregation |

pub mod corners;
pub mod detector;
pub mod point;

pub use corners::{Corner, CornerParams, good_features_to_track};
pub use detector::{DetectorError, DetectorSet, FeatureDetector, FocalPointDetector};
pub use point::{FocalPoint, center_of_mass};

//! Configuration module.
//!
//! Handles loading, validating, and merging `focalpoint.toml`. Stock defaults
//! are serialized to a TOML value and the user file is merged on top, so a
//! config file only needs the keys it wants to override.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [detection]
//! max_corners = 20          # Corners kept per image (0 = unlimited)
//! quality_level = 0.04      # Minimum response relative to the strongest corner
//! min_distance = 1.0        # Minimum pixel distance between corners
//! weight = 1.0              # Weight of each detected corner
//!
//! [scaling]
//! quality = 88              # JPEG quality (1-100)
//! default_mode = "scale"    # contain | cover | scale (or an alias)
//!
//! [scaling.sizes]           # Named scales as [width, height]
//! large = [768, 768]
//! preview = [400, 400]
//!
//! [cache]
//! keep_seconds = 86400      # Scales older than this are dropped on cleanup
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::ScaleMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "focalpoint.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
///
/// All fields have defaults matching the stock behaviour. Unknown keys are
/// rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FocalConfig {
    /// Corner-detector tuning.
    pub detection: DetectionConfig,
    /// Scale creation settings (quality, mode, named sizes).
    pub scaling: ScalingConfig,
    /// Scale cache lifetime.
    pub cache: CacheConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl FocalConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = self.detection.quality_level;
        if q.is_nan() || q <= 0.0 || q > 1.0 {
            return Err(ConfigError::Validation(
                "detection.quality_level must be in (0, 1]".into(),
            ));
        }
        let d = self.detection.min_distance;
        if d.is_nan() || d < 0.0 {
            return Err(ConfigError::Validation(
                "detection.min_distance must not be negative".into(),
            ));
        }
        let w = self.detection.weight;
        if w.is_nan() || w <= 0.0 {
            return Err(ConfigError::Validation(
                "detection.weight must be positive".into(),
            ));
        }
        if self.scaling.quality == 0 || self.scaling.quality > 100 {
            return Err(ConfigError::Validation(
                "scaling.quality must be 1-100".into(),
            ));
        }
        if let Some((name, _)) = self
            .scaling
            .sizes
            .iter()
            .find(|(_, dims)| dims[0] == 0 || dims[1] == 0)
        {
            return Err(ConfigError::Validation(format!(
                "scaling.sizes.{name} dimensions must be non-zero"
            )));
        }
        Ok(())
    }
}

/// Corner-detector tuning. Defaults are the values every stored focal point
/// was computed with; changing them moves focal points on re-detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub max_corners: usize,
    pub quality_level: f32,
    pub min_distance: f32,
    pub weight: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_corners: 20,
            quality_level: 0.04,
            min_distance: 1.0,
            weight: 1.0,
        }
    }
}

/// Scale creation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScalingConfig {
    /// Encoding quality used when a request does not carry its own.
    pub quality: u32,
    /// Mode used when a request does not name one.
    pub default_mode: ScaleMode,
    /// Named scales, `name = [width, height]`.
    pub sizes: BTreeMap<String, [u32; 2]>,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        let sizes = [
            ("large", 768),
            ("preview", 400),
            ("mini", 200),
            ("thumb", 128),
            ("tile", 64),
            ("icon", 32),
            ("listing", 16),
        ]
        .into_iter()
        .map(|(name, side)| (name.to_string(), [side, side]))
        .collect();

        Self {
            quality: 88,
            default_mode: ScaleMode::Scale,
            sizes,
        }
    }
}

impl ScalingConfig {
    /// Look up a named scale.
    pub fn size(&self, name: &str) -> Option<(u32, u32)> {
        self.sizes.get(name).map(|d| (d[0], d[1]))
    }
}

/// Scale cache lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub keep_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_seconds: 24 * 60 * 60,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Stock defaults as a TOML value, the base every user file merges onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(FocalConfig::default())?)
}

/// Deep-merge two TOML values. Tables merge key by key; anything else in
/// `overlay` replaces `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but
/// contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<FocalConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: FocalConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged on top of stock defaults.
///
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<FocalConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Focalpoint Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Focal point detection ("good features to track" corner detector)
# ---------------------------------------------------------------------------
[detection]
# Maximum corners kept per image. 0 keeps every corner above the threshold.
max_corners = 20

# Corners weaker than quality_level x strongest response are dropped.
quality_level = 0.04

# Minimum distance in pixels between two kept corners.
min_distance = 1.0

# Weight given to each corner when averaging them into one focal point.
weight = 1.0

# ---------------------------------------------------------------------------
# Scaling
# ---------------------------------------------------------------------------
[scaling]
# JPEG quality (1 = worst, 100 = best). PNG output ignores it.
quality = 88

# Mode used when a request names none:
#   contain (scale-crop-to-fit, down)  - crop around the focal point
#   cover   (scale-crop-to-fill, up)   - crop around the focal point
#   scale   (keep, thumbnail)          - fit inside the box, no crop
default_mode = "scale"

# Named scales as [width, height].
[scaling.sizes]
icon = [32, 32]
large = [768, 768]
listing = [16, 16]
mini = [200, 200]
preview = [400, 400]
thumb = [128, 128]
tile = [64, 64]

# ---------------------------------------------------------------------------
# Scale cache
# ---------------------------------------------------------------------------
[cache]
# Scales older than this many seconds are dropped by cleanup.
keep_seconds = 86400

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `detect`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

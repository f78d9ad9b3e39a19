//! Debug helpers for inspecting and resetting scales.

use crate::cache::{ScaleError, ScaleStorage};
use crate::field::{FieldContainer, ImageField};
use crate::imaging::{Aspect, ImageBackend, RustBackend};
use crate::pipeline::FocalPointPipeline;
use std::collections::BTreeMap;

/// `width 800 x height 600 (landscape)`.
///
/// Dimensions are read from the image data; a missing or unreadable field
/// reports `0 x 0`, which counts as square.
pub fn friendly_size(field: Option<&ImageField>) -> String {
    let (width, height) = field
        .and_then(|f| RustBackend::new().identify(f.data()).ok())
        .map(|info| (info.width, info.height))
        .unwrap_or((0, 0));
    format!(
        "width {width} x height {height} ({})",
        Aspect::of(width, height)
    )
}

/// Hash of every non-empty image field, keyed by field name.
fn current_hashes(container: &dyn FieldContainer) -> BTreeMap<String, String> {
    container
        .field_names()
        .into_iter()
        .filter_map(|name| {
            let hash = container.image(&name).filter(|f| !f.is_empty())?.source_hash();
            Some((name, hash))
        })
        .collect()
}

/// Re-run detection on the container, then drop its scales.
///
/// With `force` every scale goes; otherwise only expired scales, scales of
/// older image data and scales of fields that are gone. Returns a human-readable summary of the primary
/// field.
pub fn clear_scales(
    container: &mut dyn FieldContainer,
    storage: &mut ScaleStorage,
    pipeline: &FocalPointPipeline,
    force: bool,
    now: u64,
) -> Result<String, ScaleError> {
    pipeline.determine_for_container(container);

    let primary = container.primary_field();
    let field = primary.as_deref().and_then(|name| container.image(name));

    let count = storage.len();
    if force {
        storage.clear();
    } else {
        storage.cleanup(now, &current_hashes(container));
    }
    storage.save()?;
    let left = storage.len();

    let focal_point = match field.and_then(|f| f.focal_point) {
        Some((x, y)) => format!("({x}, {y})"),
        None => "None".to_string(),
    };
    Ok(format!(
        "Cleared {} scales from annotation storage.\n\
         {left} scales left.\n\
         Image dimensions: {}\n\
         Focal point: {focal_point}.",
        count - left,
        friendly_size(field),
    ))
}

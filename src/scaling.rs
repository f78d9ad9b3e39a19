//! Scale factory: turns a scale request on a field into a stored scale.
//!
//! The request flow, in order:
//!
//! 1. Pick the field (request, else the container's primary field).
//! 2. Resolve a named scale to its configured dimensions.
//! 3. No dimensions at all → the original.
//! 4. Dimensions equal to the original and no extra parameters → the original.
//! 5. SVG → passed through untouched.
//! 6. Otherwise fill in a missing dimension from the source aspect ratio and
//!    serve from [`ScaleStorage`], creating the scale with the mode handler
//!    on a miss.
//!
//! Creation failures are logged and yield no scale. A storage conflict is
//! the one error that always reaches the caller.

use crate::cache::{ScaleError, ScaleKey, ScaleStorage, StoredScale};
use crate::config::ScalingConfig;
use crate::field::FieldContainer;
use crate::imaging::{
    ImageBackend, OutputFormat, Quality, ScaleJob, ScaleMode, create_scale,
    resolve_target_dimensions,
};
use std::collections::BTreeMap;
use tracing::{Span, debug, error};

/// A request for one scale of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaleRequest {
    /// Field to scale; the container's primary field when `None`.
    pub fieldname: Option<String>,
    /// Named scale from `[scaling.sizes]`; overrides width and height.
    pub scale: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mode: Option<ScaleMode>,
    pub quality: Option<u32>,
    /// Extra parameters, part of the cache key.
    pub params: BTreeMap<String, String>,
}

impl ScaleRequest {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn named(scale: &str) -> Self {
        Self {
            scale: Some(scale.to_string()),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: ScaleMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn for_field(mut self, name: &str) -> Self {
        self.fieldname = Some(name.to_string());
        self
    }
}

/// What a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleOutcome {
    /// Serve the field itself. `format` is the content-type subtype.
    Original {
        format: String,
        width: u32,
        height: u32,
    },
    /// Vector data, served unchanged at the requested size.
    Passthrough {
        data: Vec<u8>,
        format: String,
        width: u32,
        height: u32,
    },
    /// A raster scale from storage.
    Scaled(StoredScale),
}

pub struct ScalingFactory<B: ImageBackend> {
    backend: B,
    config: ScalingConfig,
    span: Span,
}

impl<B: ImageBackend> ScalingFactory<B> {
    pub fn new(backend: B, config: ScalingConfig, span: Span) -> Self {
        Self {
            backend,
            config,
            span,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve `request` against `container`.
    ///
    /// `Ok(None)` means no scale could be produced (missing field, unknown
    /// scale name, or a logged creation failure).
    pub fn scale(
        &self,
        container: &dyn FieldContainer,
        storage: &mut ScaleStorage,
        request: &ScaleRequest,
        now: u64,
    ) -> Result<Option<ScaleOutcome>, ScaleError> {
        let _enter = self.span.enter();

        let Some(fieldname) = request
            .fieldname
            .clone()
            .or_else(|| container.primary_field())
        else {
            debug!(url = %container.url(), "no image field to scale");
            return Ok(None);
        };
        let Some(field) = container.image(&fieldname).filter(|f| !f.is_empty()) else {
            debug!(field = %fieldname, url = %container.url(), "field missing or empty");
            return Ok(None);
        };

        let (width, height) = match &request.scale {
            Some(name) => match self.config.size(name) {
                Some((w, h)) => (Some(w), Some(h)),
                None => {
                    debug!(scale = %name, "unknown scale name");
                    return Ok(None);
                }
            },
            None => (request.width, request.height),
        };

        let original = ScaleOutcome::Original {
            format: subtype(&field.content_type),
            width: field.width,
            height: field.height,
        };
        if width.is_none() && height.is_none() {
            return Ok(Some(original));
        }
        if request.params.is_empty()
            && width == Some(field.width)
            && height == Some(field.height)
        {
            return Ok(Some(original));
        }

        let Some(target) = resolve_target_dimensions((field.width, field.height), width, height)
        else {
            return Ok(Some(original));
        };

        if field.is_svg() {
            return Ok(Some(ScaleOutcome::Passthrough {
                data: field.data().to_vec(),
                format: subtype(&field.content_type),
                width: target.0,
                height: target.1,
            }));
        }

        let mode = request.mode.unwrap_or(self.config.default_mode);
        let quality = Quality::new(request.quality.unwrap_or(self.config.quality));
        let key = ScaleKey {
            fieldname: fieldname.clone(),
            width: target.0,
            height: target.1,
            mode,
            quality: quality.value(),
            params: request.params.clone(),
        };

        let result = storage.scale(&key, &field.source_hash(), now, || {
            let info = self.backend.identify(field.data())?;
            let job = ScaleJob {
                data: field.data(),
                source: (info.width, info.height),
                target,
                format: OutputFormat::for_source(info.format),
                quality,
                focal_point: field.focal_point,
            };
            Ok(create_scale(&self.backend, mode, &job)?)
        });

        match result {
            Ok(stored) => Ok(Some(ScaleOutcome::Scaled(stored))),
            Err(e @ ScaleError::Conflict { .. }) => Err(e),
            Err(e) => {
                error!(field = %fieldname, url = %container.url(), error = %e, "could not scale");
                Ok(None)
            }
        }
    }
}

/// `image/jpeg` → `jpeg`.
fn subtype(content_type: &str) -> String {
    content_type
        .split_once('/')
        .map(|(_, sub)| sub)
        .unwrap_or(content_type)
        .to_string()
}

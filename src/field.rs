//! Image fields and the containers that hold them.
//!
//! An [`ImageField`] is an encoded image blob plus the metadata the scaling
//! side needs: content type, filename, dimensions and the stored focal
//! point. Fields live in a [`FieldContainer`]; two ship here:
//!
//! - [`ContentItem`]: a content object with a URL, named image fields, a set
//!   of read-only field names and a flag saying whether it wants focal-point
//!   transforming at all.
//! - [`TileData`]: the field values of one tile placed on a content item.
//!   Its URL is `<content url>/@@<tile type>/<tile id>`.
//!
//! On disk, a field's metadata is kept in a JSON sidecar next to the image
//! (`photo.jpg` → `photo.jpg.focal.json`). The sidecar records the SHA-256 of
//! the image it describes; once the image changes the stored focal point no
//! longer applies.

use crate::cache::hash_bytes;
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

const SIDECAR_SUFFIX: &str = ".focal.json";

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("field '{field}' on {url} is read-only")]
    ReadOnly { field: String, url: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An image blob with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageField {
    data: Vec<u8>,
    pub content_type: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    /// Aggregate focal point in source pixels. `None` when detection found
    /// nothing or never ran.
    pub focal_point: Option<(u32, u32)>,
}

impl ImageField {
    /// Wrap `data`, sniffing content type and dimensions from the bytes.
    ///
    /// SVG is recognised by extension or a leading `<svg`/`<?xml` and gets
    /// zero dimensions. Unrecognised data gets `application/octet-stream`.
    pub fn new(data: Vec<u8>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let (content_type, width, height) = sniff(&data, &filename);
        Self {
            data,
            content_type,
            filename,
            width,
            height,
            focal_point: None,
        }
    }

    /// Read the field from a file.
    pub fn from_path(path: &Path) -> Result<Self, FieldError> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(data, filename))
    }

    /// A reader over the blob.
    pub fn open(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.data)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_svg(&self) -> bool {
        self.content_type == SVG_CONTENT_TYPE
    }

    /// SHA-256 of the blob, hex encoded.
    pub fn source_hash(&self) -> String {
        hash_bytes(&self.data)
    }

    pub fn metadata(&self) -> FieldMetadata {
        FieldMetadata {
            content_type: self.content_type.clone(),
            filename: self.filename.clone(),
            width: self.width,
            height: self.height,
            focal_point: self.focal_point,
            source_hash: self.source_hash(),
        }
    }

    /// Take the focal point from `meta` if it was computed for this blob.
    /// Returns whether it applied.
    pub fn apply_metadata(&mut self, meta: &FieldMetadata) -> bool {
        if meta.source_hash != self.source_hash() {
            return false;
        }
        self.focal_point = meta.focal_point;
        true
    }
}

fn sniff(data: &[u8], filename: &str) -> (String, u32, u32) {
    let svg_name = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    let head = &data[..data.len().min(64)];
    let svg_data = head.starts_with(b"<svg") || head.starts_with(b"<?xml");
    if svg_name || svg_data {
        return (SVG_CONTENT_TYPE.to_string(), 0, 0);
    }

    let Ok(reader) = ImageReader::new(Cursor::new(data)).with_guessed_format() else {
        return ("application/octet-stream".to_string(), 0, 0);
    };
    let content_type = reader
        .format()
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let (width, height) = reader.into_dimensions().unwrap_or((0, 0));
    (content_type, width, height)
}

/// Persisted field metadata, the sidecar's JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub content_type: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub focal_point: Option<(u32, u32)>,
    pub source_hash: String,
}

impl FieldMetadata {
    /// Load a sidecar. `Ok(None)` if there is none.
    pub fn load(path: &Path) -> Result<Option<Self>, FieldError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), FieldError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Sidecar location for an image file.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Something holding named image fields.
pub trait FieldContainer {
    /// Absolute URL, used in log output.
    fn url(&self) -> String;

    /// Names of all image fields, sorted.
    fn field_names(&self) -> Vec<String>;

    fn image(&self, name: &str) -> Option<&ImageField>;

    fn image_mut(&mut self, name: &str) -> Option<&mut ImageField>;

    /// Store (or with `None`, remove) a field value. Bypasses the read-only
    /// check; go through the data manager for guarded writes.
    fn store(&mut self, name: &str, value: Option<ImageField>);

    fn is_read_only(&self, _name: &str) -> bool {
        false
    }

    /// The field used when a scale request names none.
    fn primary_field(&self) -> Option<String> {
        self.field_names().into_iter().next()
    }
}

/// A content object with image fields.
#[derive(Debug, Clone, Default)]
pub struct ContentItem {
    url: String,
    fields: BTreeMap<String, ImageField>,
    read_only: BTreeSet<String>,
    primary: Option<String>,
    /// Whether lifecycle events on this item trigger detection.
    pub wants_transforming: bool,
}

impl ContentItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wants_transforming: true,
            ..Self::default()
        }
    }

    pub fn set_image(&mut self, name: &str, field: ImageField) {
        self.fields.insert(name.to_string(), field);
    }

    pub fn mark_read_only(&mut self, name: &str) {
        self.read_only.insert(name.to_string());
    }

    pub fn set_primary(&mut self, name: &str) {
        self.primary = Some(name.to_string());
    }
}

impl FieldContainer for ContentItem {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn image(&self, name: &str) -> Option<&ImageField> {
        self.fields.get(name)
    }

    fn image_mut(&mut self, name: &str) -> Option<&mut ImageField> {
        self.fields.get_mut(name)
    }

    fn store(&mut self, name: &str, value: Option<ImageField>) {
        match value {
            Some(field) => {
                self.fields.insert(name.to_string(), field);
            }
            None => {
                self.fields.remove(name);
            }
        }
    }

    fn is_read_only(&self, name: &str) -> bool {
        self.read_only.contains(name)
    }

    fn primary_field(&self) -> Option<String> {
        self.primary
            .clone()
            .or_else(|| self.fields.keys().next().cloned())
    }
}

/// Field values of a tile placed on a content item.
#[derive(Debug, Clone)]
pub struct TileData {
    context_url: String,
    tile_type: String,
    id: String,
    fields: BTreeMap<String, ImageField>,
}

impl TileData {
    pub fn new(
        context_url: impl Into<String>,
        tile_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            context_url: context_url.into(),
            tile_type: tile_type.into(),
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }
}

impl FieldContainer for TileData {
    fn url(&self) -> String {
        format!("{}/@@{}/{}", self.context_url, self.tile_type, self.id)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn image(&self, name: &str) -> Option<&ImageField> {
        self.fields.get(name)
    }

    fn image_mut(&mut self, name: &str) -> Option<&mut ImageField> {
        self.fields.get_mut(name)
    }

    fn store(&mut self, name: &str, value: Option<ImageField>) {
        match value {
            Some(field) => {
                self.fields.insert(name.to_string(), field);
            }
            None => {
                self.fields.remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_jpeg, gradient_png};
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn new_field_sniffs_png() {
        let field = ImageField::new(gradient_png(30, 20), "a.png");
        assert_eq!(field.content_type, "image/png");
        assert_eq!((field.width, field.height), (30, 20));
        assert_eq!(field.focal_point, None);
    }

    #[test]
    fn new_field_sniffs_jpeg() {
        let field = ImageField::new(gradient_jpeg(40, 10), "photo");
        assert_eq!(field.content_type, "image/jpeg");
        assert_eq!((field.width, field.height), (40, 10));
    }

    #[test]
    fn svg_recognised_by_extension_and_content() {
        let by_name = ImageField::new(b"whatever".to_vec(), "logo.SVG");
        assert!(by_name.is_svg());
        let by_data = ImageField::new(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec(), "x");
        assert!(by_data.is_svg());
        assert_eq!((by_data.width, by_data.height), (0, 0));
    }

    #[test]
    fn garbage_is_octet_stream() {
        let field = ImageField::new(b"\x00\x01garbage".to_vec(), "x.bin");
        assert_eq!(field.content_type, "application/octet-stream");
        assert_eq!((field.width, field.height), (0, 0));
    }

    #[test]
    fn open_reads_blob() {
        let field = ImageField::new(b"abc".to_vec(), "x");
        let mut out = Vec::new();
        field.open().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
    }

    // =========================================================================
    // Metadata sidecar
    // =========================================================================

    #[test]
    fn sidecar_path_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/photos/a.jpg")),
            PathBuf::from("/photos/a.jpg.focal.json")
        );
    }

    #[test]
    fn metadata_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.png.focal.json");
        let mut field = ImageField::new(gradient_png(8, 8), "a.png");
        field.focal_point = Some((3, 4));

        field.metadata().save(&path).unwrap();
        let loaded = FieldMetadata::load(&path).unwrap().unwrap();
        assert_eq!(loaded, field.metadata());
        assert_eq!(loaded.focal_point, Some((3, 4)));
    }

    #[test]
    fn metadata_load_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(
            FieldMetadata::load(&tmp.path().join("none.json"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn metadata_load_corrupt_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(FieldMetadata::load(&path), Err(FieldError::Json(_))));
    }

    #[test]
    fn stale_metadata_not_applied() {
        let mut original = ImageField::new(gradient_png(8, 8), "a.png");
        original.focal_point = Some((1, 1));
        let meta = original.metadata();

        let mut changed = ImageField::new(gradient_png(9, 9), "a.png");
        assert!(!changed.apply_metadata(&meta));
        assert_eq!(changed.focal_point, None);

        let mut same = ImageField::new(gradient_png(8, 8), "a.png");
        assert!(same.apply_metadata(&meta));
        assert_eq!(same.focal_point, Some((1, 1)));
    }

    // =========================================================================
    // Containers
    // =========================================================================

    #[test]
    fn content_item_primary_field_defaults_to_first_name() {
        let mut item = ContentItem::new("http://site/doc");
        item.set_image("zeta", ImageField::new(gradient_png(2, 2), "z.png"));
        item.set_image("alpha", ImageField::new(gradient_png(2, 2), "a.png"));
        assert_eq!(item.primary_field().as_deref(), Some("alpha"));

        item.set_primary("zeta");
        assert_eq!(item.primary_field().as_deref(), Some("zeta"));
    }

    #[test]
    fn content_item_store_and_remove() {
        let mut item = ContentItem::new("http://site/doc");
        item.store("image", Some(ImageField::new(gradient_png(2, 2), "a.png")));
        assert!(item.image("image").is_some());
        item.store("image", None);
        assert!(item.image("image").is_none());
        assert_eq!(item.primary_field(), None);
    }

    #[test]
    fn content_item_read_only() {
        let mut item = ContentItem::new("http://site/doc");
        item.mark_read_only("locked");
        assert!(item.is_read_only("locked"));
        assert!(!item.is_read_only("image"));
    }

    #[test]
    fn tile_url() {
        let tile = TileData::new("http://site/page", "image.tile", "abc123");
        assert_eq!(tile.url(), "http://site/page/@@image.tile/abc123");
        assert!(!tile.is_read_only("image"));
    }
}

//! File-backed scale storage.
//!
//! Creating a scale means decoding, cropping, resizing and re-encoding the
//! source, so every created scale is kept on disk and reused until it
//! expires or its source changes.
//!
//! # Design
//!
//! ## Keys
//!
//! A scale is identified by a [`ScaleKey`]: field name, requested width and
//! height, mode, quality and any extra request parameters. The key is hashed
//! with SHA-256 into a `uid`, which also names the scale's file.
//!
//! Each entry additionally records the `source_hash` (SHA-256 of the blob it
//! was derived from). A lookup only hits when the source is unchanged and the
//! file is still on disk, so replacing an image never serves a stale scale.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<dir>/.focal-scales.json` next to the
//! scale files. It carries a format version (a mismatch loads as empty) and
//! a generation counter bumped on every save.
//!
//! ## Concurrent writers
//!
//! Two processes may open the same directory. Saving compares the on-disk
//! generation with the one this handle loaded; if another writer saved in
//! between, the save fails with [`ScaleError::Conflict`] instead of silently
//! overwriting their entries. The caller reopens and retries.

use crate::imaging::{BackendError, OutputFormat, ScaleMode, ScaledImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the manifest file within the storage directory.
const MANIFEST_FILENAME: &str = ".focal-scales.json";

/// Version of the manifest format. Bump this to invalidate all existing
/// storages when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ScaleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Backend(#[from] BackendError),
    #[error("scale storage modified concurrently (loaded generation {loaded}, found {found})")]
    Conflict { loaded: u64, found: u64 },
}

/// SHA-256 of a byte slice, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Everything that distinguishes one scale of a field from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleKey {
    pub fieldname: String,
    pub width: u32,
    pub height: u32,
    pub mode: ScaleMode,
    pub quality: u32,
    pub params: BTreeMap<String, String>,
}

impl ScaleKey {
    /// Stable identifier of this key.
    pub fn uid(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"scale\0");
        hasher.update(self.fieldname.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.width.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.mode.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.quality.to_le_bytes());
        for (k, v) in &self.params {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// One stored scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleEntry {
    pub uid: String,
    pub fieldname: String,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// File name within the storage directory.
    pub filename: String,
    /// Creation time, seconds since the Unix epoch.
    pub created: u64,
    pub source_hash: String,
}

/// A scale served from storage: its entry plus the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredScale {
    pub entry: ScaleEntry,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    generation: u64,
    entries: BTreeMap<String, ScaleEntry>,
}

impl Manifest {
    fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            generation: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Returns an empty manifest if the file doesn't exist or can't be
    /// parsed (version mismatch, corruption).
    fn load(dir: &Path) -> Self {
        let content = match std::fs::read_to_string(dir.join(MANIFEST_FILENAME)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }
}

/// Scale cache bound to one directory.
pub struct ScaleStorage {
    dir: PathBuf,
    manifest: Manifest,
    loaded_generation: u64,
    keep_seconds: u64,
    stats: CacheStats,
}

impl ScaleStorage {
    /// Open (creating if needed) the storage in `dir`. Entries older than
    /// `keep_seconds` are dropped by [`cleanup`](Self::cleanup).
    pub fn open(dir: &Path, keep_seconds: u64) -> Result<Self, ScaleError> {
        std::fs::create_dir_all(dir)?;
        let manifest = Manifest::load(dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            loaded_generation: manifest.generation,
            manifest,
            keep_seconds,
            stats: CacheStats::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.manifest.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn entries(&self) -> impl Iterator<Item = &ScaleEntry> {
        self.manifest.entries.values()
    }

    /// Look up a stored scale without creating it.
    ///
    /// Misses when the entry was derived from other source data or its file
    /// is gone.
    pub fn get(&self, key: &ScaleKey, source_hash: &str) -> Option<StoredScale> {
        let entry = self.manifest.entries.get(&key.uid())?;
        if entry.source_hash != source_hash {
            return None;
        }
        let data = std::fs::read(self.dir.join(&entry.filename)).ok()?;
        Some(StoredScale {
            entry: entry.clone(),
            data,
        })
    }

    /// Return the stored scale for `key`, creating and persisting it on a
    /// miss.
    ///
    /// A new scale is written to disk and the manifest saved immediately, so
    /// a concurrent writer surfaces here as [`ScaleError::Conflict`]. A failed
    /// save leaves neither the entry nor its file behind.
    pub fn scale<F>(
        &mut self,
        key: &ScaleKey,
        source_hash: &str,
        now: u64,
        create: F,
    ) -> Result<StoredScale, ScaleError>
    where
        F: FnOnce() -> Result<ScaledImage, ScaleError>,
    {
        if let Some(hit) = self.get(key, source_hash) {
            self.stats.hit();
            return Ok(hit);
        }
        self.stats.miss();

        let scaled = create()?;
        let uid = key.uid();
        let filename = format!("{uid}.{}", scaled.format.extension());
        std::fs::write(self.dir.join(&filename), &scaled.data)?;

        let entry = ScaleEntry {
            uid: uid.clone(),
            fieldname: key.fieldname.clone(),
            width: scaled.width,
            height: scaled.height,
            format: scaled.format,
            filename,
            created: now,
            source_hash: source_hash.to_string(),
        };
        self.manifest.entries.insert(uid.clone(), entry.clone());
        if let Err(e) = self.save() {
            // Any older entry under this uid pointed at the file just replaced.
            if let Some(unsaved) = self.manifest.entries.remove(&uid) {
                self.remove_file(&unsaved);
            }
            return Err(e);
        }

        Ok(StoredScale {
            entry,
            data: scaled.data,
        })
    }

    /// Drop every entry and its file. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let entries = std::mem::take(&mut self.manifest.entries);
        for entry in entries.values() {
            self.remove_file(entry);
        }
        entries.len()
    }

    /// Drop entries that expired by `now` or no longer match their field.
    ///
    /// `current` maps each field name to the hash of its present data. An
    /// entry is kept only if its field is listed with the hash it was
    /// derived from. Returns how many were dropped.
    pub fn cleanup(&mut self, now: u64, current: &BTreeMap<String, String>) -> usize {
        let keep = self.keep_seconds;
        let (stale, fresh): (BTreeMap<_, _>, BTreeMap<_, _>) =
            std::mem::take(&mut self.manifest.entries)
                .into_iter()
                .partition(|(_, e)| {
                    current.get(&e.fieldname) != Some(&e.source_hash)
                        || now.saturating_sub(e.created) > keep
                });
        self.manifest.entries = fresh;
        for entry in stale.values() {
            self.remove_file(entry);
        }
        stale.len()
    }

    fn remove_file(&self, entry: &ScaleEntry) {
        // A file already gone is what we want anyway.
        let _ = std::fs::remove_file(self.dir.join(&entry.filename));
    }

    /// Persist the manifest, failing if another writer saved since load.
    pub fn save(&mut self) -> Result<(), ScaleError> {
        let found = Manifest::load(&self.dir).generation;
        if found != self.loaded_generation {
            return Err(ScaleError::Conflict {
                loaded: self.loaded_generation,
                found,
            });
        }
        self.manifest.generation = self.loaded_generation + 1;
        let json = serde_json::to_string_pretty(&self.manifest)?;
        std::fs::write(self.dir.join(MANIFEST_FILENAME), json)?;
        self.loaded_generation = self.manifest.generation;
        Ok(())
    }
}

/// Resolve the manifest path for a storage directory.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
}

/// Hit/miss counts for one storage handle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} created ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} created", self.misses)
        }
    }
}

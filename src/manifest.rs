//! Manifest files read by the slideshow viewer.
//!
//! A run ends by writing five JSON documents directly into `slides/`:
//!
//! | File | Content |
//! |---|---|
//! | `directories.json` | size directory names, thumbnail first |
//! | `filenames.json` | basenames in processing order |
//! | `captions.json` | basename → caption, empty captions omitted |
//! | `resolutions.json` | `[code → resolution set, basename → code]` |
//! | `info.json` | presentation options as strings |
//!
//! Objects are emitted with sorted keys so identical runs produce
//! byte-identical files. Every file is written to a temporary file in the
//! same directory, synced and renamed into place, so a reader never sees a
//! half-written manifest.

use crate::types::ResolutionSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DIRECTORIES_FILE: &str = "directories.json";
pub const FILENAMES_FILE: &str = "filenames.json";
pub const CAPTIONS_FILE: &str = "captions.json";
pub const RESOLUTIONS_FILE: &str = "resolutions.json";
pub const INFO_FILE: &str = "info.json";

/// Line break marker understood by the viewer.
const LINE_BREAK: &str = "<br />";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error in {file}: {source}")]
    Json {
        file: &'static str,
        source: serde_json::Error,
    },
}

/// Everything the viewer needs to know about one assembled album.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumManifest {
    pub filenames: Vec<String>,
    /// Raw captions by basename; normalized on write.
    pub captions: BTreeMap<String, String>,
    pub resolutions: BTreeMap<String, ResolutionSet>,
    pub assignments: BTreeMap<String, String>,
    pub directories: Vec<String>,
    pub info: BTreeMap<String, String>,
}

/// Viewer form of a caption: trailing whitespace trimmed, line breaks
/// (real or escaped `\n`) replaced by `<br />`. `None` for a blank caption.
pub fn manifest_caption(caption: &str) -> Option<String> {
    let trimmed = caption.trim_end();
    if trimmed.trim().is_empty() {
        return None;
    }
    Some(
        trimmed
            .replace("\r\n", LINE_BREAK)
            .replace('\n', LINE_BREAK)
            .replace("\\n", LINE_BREAK),
    )
}

/// Writes an [`AlbumManifest`] into a `slides/` directory.
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    slides_dir: PathBuf,
}

impl ManifestWriter {
    pub fn new(slides_dir: impl Into<PathBuf>) -> Self {
        Self {
            slides_dir: slides_dir.into(),
        }
    }

    /// Write all five documents. Each one is replaced atomically; a failure
    /// leaves earlier files written and later ones untouched.
    pub fn write(&self, manifest: &AlbumManifest) -> Result<(), ManifestError> {
        let captions: BTreeMap<&str, String> = manifest
            .captions
            .iter()
            .filter_map(|(name, caption)| {
                manifest_caption(caption).map(|c| (name.as_str(), c))
            })
            .collect();

        self.write_json(DIRECTORIES_FILE, &manifest.directories)?;
        self.write_json(FILENAMES_FILE, &manifest.filenames)?;
        self.write_json(CAPTIONS_FILE, &captions)?;
        self.write_json(
            RESOLUTIONS_FILE,
            &(&manifest.resolutions, &manifest.assignments),
        )?;
        self.write_json(INFO_FILE, &manifest.info)?;
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(
        &self,
        file: &'static str,
        value: &T,
    ) -> Result<(), ManifestError> {
        let json =
            serde_json::to_string_pretty(value).map_err(|source| ManifestError::Json { file, source })?;
        let path = self.slides_dir.join(file);
        write_atomic(&self.slides_dir, &path, json.as_bytes())
            .map_err(|source| ManifestError::Io { path, source })
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Parsed `resolutions.json`: code → set and basename → code.
pub type Resolutions = (BTreeMap<String, ResolutionSet>, BTreeMap<String, String>);

/// Read `resolutions.json` back from a `slides/` directory.
pub fn read_resolutions(slides_dir: &Path) -> Result<Resolutions, ManifestError> {
    let path = slides_dir.join(RESOLUTIONS_FILE);
    let content = fs::read_to_string(&path).map_err(|source| ManifestError::Io { path, source })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Json {
        file: RESOLUTIONS_FILE,
        source,
    })
}

/// Read `info.json` back from a `slides/` directory.
pub fn read_info(slides_dir: &Path) -> Result<BTreeMap<String, String>, ManifestError> {
    let path = slides_dir.join(INFO_FILE);
    let content = fs::read_to_string(&path).map_err(|source| ManifestError::Io { path, source })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Json {
        file: INFO_FILE,
        source,
    })
}

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// One file in the review playlist, with path metadata cached at creation.
///
/// Only `fullpath` matters for identity. `filename` is lossy and only for
/// display; relocation names come from `fullpath` itself.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub fullpath: PathBuf,
    pub filename: String,
    pub dirname: PathBuf,
    pub relpath: PathBuf,
    pub media_type: Option<String>,
}

/// Serialized form of an entry inside a playlist snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub fullpath: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub dirname: String,
    #[serde(default)]
    pub relpath: String,
    #[serde(default)]
    pub mime: String,
}

#[derive(Serialize)]
struct EntryDetails<'a> {
    #[serde(rename = "Full Path")]
    full_path: String,
    #[serde(rename = "Filename")]
    filename: &'a str,
    #[serde(rename = "Directory")]
    directory: String,
    #[serde(rename = "Relative path")]
    relative_path: String,
    #[serde(rename = "Mime-type")]
    mime_type: &'a str,
}

impl FileEntry {
    /// Resolve `path` and capture its metadata. Fails unless it is an existing regular file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Path(path.to_path_buf()));
        }

        let fullpath = path
            .canonicalize()
            .map_err(|_| Error::Path(path.to_path_buf()))?;
        let filename = fullpath
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Path(path.to_path_buf()))?;
        let dirname = fullpath
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let relpath = match env::current_dir() {
            Ok(cwd) => relative_to(&fullpath, &cwd),
            Err(_) => fullpath.clone(),
        };

        Ok(Self {
            fullpath,
            filename,
            dirname,
            relpath,
            media_type: None,
        })
    }

    pub fn with_media_type(mut self, media_type: Option<String>) -> Self {
        self.set_media_type(media_type);
        self
    }

    /// Empty values keep whatever type is already cached.
    pub fn set_media_type(&mut self, media_type: Option<String>) {
        if let Some(media_type) = media_type.filter(|m| !m.is_empty()) {
            self.media_type = Some(media_type);
        }
    }

    pub fn to_record(&self) -> EntryRecord {
        EntryRecord {
            fullpath: self.fullpath.to_string_lossy().into_owned(),
            filename: self.filename.clone(),
            dirname: self.dirname.to_string_lossy().into_owned(),
            relpath: self.relpath.to_string_lossy().into_owned(),
            mime: self.media_type.clone().unwrap_or_default(),
        }
    }

    /// Human readable block shown by the `details` command
    pub fn details(&self) -> String {
        let details = EntryDetails {
            full_path: self.fullpath.display().to_string(),
            filename: &self.filename,
            directory: self.dirname.display().to_string(),
            relative_path: self.relpath.display().to_string(),
            mime_type: self.media_type.as_deref().unwrap_or("None"),
        };
        serde_json::to_string_pretty(&details)
            .unwrap_or_else(|_| self.fullpath.display().to_string())
    }
}

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fullpath == other.fullpath
    }
}

impl Eq for FileEntry {}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename)
    }
}

/// `path` expressed relative to `base`, walking up with `..` where needed.
/// Both paths are expected to be absolute.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    // Different roots (e.g. other drive) cannot be expressed relatively
    if path_parts.first() != base_parts.first() {
        return path.to_path_buf();
    }

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }

    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

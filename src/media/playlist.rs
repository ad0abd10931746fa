use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classify::{is_media_type, Classifier};
use super::entry::{EntryRecord, FileEntry};
use crate::error::{Error, Result};

/// Format tag written into every snapshot. Informational only.
pub const SNAPSHOT_FORMAT: &str = "mediacull playlist";

/// On-disk form of a playlist plus the position to resume from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "type", default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub next_to_play: usize,
    #[serde(default)]
    pub next_filename: String,
    #[serde(default, alias = "data")]
    pub list: Vec<EntryRecord>,
}

fn default_format() -> String {
    SNAPSHOT_FORMAT.to_string()
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            format: default_format(),
            next_to_play: 0,
            next_filename: String::new(),
            list: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Build an ingestion snapshot from raw paths, keeping only media the classifier accepts
    pub fn from_paths<C: Classifier + ?Sized>(paths: &[PathBuf], classifier: &C) -> Self {
        let mut snapshot = Self::default();
        for path in paths {
            match classifier.classify(path) {
                Some(mime) if is_media_type(&mime) => {
                    debug!("Accepted {} as {}", path.display(), mime);
                    snapshot.list.push(EntryRecord {
                        fullpath: path.to_string_lossy().into_owned(),
                        mime,
                        ..EntryRecord::default()
                    });
                }
                other => debug!("Skipping {} ({:?})", path.display(), other),
            }
        }
        snapshot
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(e.to_string()))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let snapshot = Self::from_json(&content).map_err(|e| match e {
            Error::InvalidInput(msg) => Error::InvalidInput(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        info!("Loaded snapshot {} ({} entries)", path.display(), snapshot.list.len());
        Ok(snapshot)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Saved playlist snapshot to {}", path.display());
        Ok(())
    }
}

/// Ordered review list. A `fullpath` appears at most once.
#[derive(Debug, Clone, Default)]
pub struct PlaylistStore {
    entries: Vec<FileEntry>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every entry of `snapshot` in order, dropping duplicates and
    /// paths that no longer resolve to a file. Returns how many were added.
    pub fn load(&mut self, snapshot: Option<Snapshot>) -> Result<usize> {
        let snapshot =
            snapshot.ok_or_else(|| Error::InvalidInput("no playlist given".to_string()))?;

        let mut added = 0;
        for record in snapshot.list {
            let entry = match FileEntry::new(&record.fullpath) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Dropping playlist entry: {}", e);
                    continue;
                }
            };
            let mime = Some(record.mime).filter(|m| !m.is_empty());
            if self.append(entry.with_media_type(mime)) {
                added += 1;
            }
        }
        debug!("Loaded {} entries, playlist now has {}", added, self.entries.len());
        Ok(added)
    }

    /// Classify `paths` and load the accepted ones
    pub fn ingest<C: Classifier + ?Sized>(&mut self, paths: &[PathBuf], classifier: &C) -> Result<usize> {
        self.load(Some(Snapshot::from_paths(paths, classifier)))
    }

    /// Returns false when an entry with the same path is already present
    pub fn append(&mut self, entry: FileEntry) -> bool {
        if self.entries.contains(&entry) {
            debug!("Ignoring duplicate {}", entry.fullpath.display());
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Snapshot of the current order. Resume fields are left for the caller to fill.
    pub fn export(&self) -> Snapshot {
        Snapshot {
            list: self.entries.iter().map(FileEntry::to_record).collect(),
            ..Snapshot::default()
        }
    }

    pub fn remove(&mut self, entry: &FileEntry) -> bool {
        if let Some(pos) = self.position(entry) {
            self.entries.remove(pos);
            true
        } else {
            false
        }
    }

    /// Stable, case-sensitive sort by file name
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.filename.cmp(&b.filename));
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.entries.shuffle(rng);
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    pub fn position(&self, entry: &FileEntry) -> Option<usize> {
        self.entries.iter().position(|e| e == entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::classify::MediaClassifier;
    use tempfile::{tempdir, TempDir};

    fn fixture(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let dir = tempdir().unwrap();
        let paths = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, name.as_bytes()).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    fn snapshot_of(paths: &[PathBuf]) -> Snapshot {
        Snapshot {
            list: paths
                .iter()
                .map(|p| EntryRecord {
                    fullpath: p.to_string_lossy().into_owned(),
                    mime: "video/mp4".to_string(),
                    ..EntryRecord::default()
                })
                .collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_load_requires_snapshot() {
        let mut store = PlaylistStore::new();
        assert!(matches!(store.load(None), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_non_sequence_list_is_invalid() {
        let err = Snapshot::from_json(r#"{"type": "x", "list": {"fullpath": "/a"}}"#);
        assert!(matches!(err, Err(Error::InvalidInput(_))));

        let missing = Snapshot::from_json(r#"{"type": "x"}"#).unwrap();
        assert!(missing.list.is_empty());

        let legacy = Snapshot::from_json(r#"{"data": [{"fullpath": "/a", "mime": "audio/ogg"}]}"#).unwrap();
        assert_eq!(legacy.list.len(), 1);
    }

    #[test]
    fn test_load_drops_duplicates_and_missing_files() {
        let (dir, paths) = fixture(&["a.mp4", "b.mp4"]);
        let mut all = paths.clone();
        all.push(paths[0].clone());
        all.push(dir.path().join("gone.mp4"));

        let mut store = PlaylistStore::new();
        let added = store.load(Some(snapshot_of(&all))).unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.len(), 2);

        // A second load of the same files adds nothing
        assert_eq!(store.load(Some(snapshot_of(&paths))).unwrap(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_export_round_trips_load() {
        let (_dir, paths) = fixture(&["c.mp4", "a.mp4", "b.mp4"]);
        let mut store = PlaylistStore::new();
        store.load(Some(snapshot_of(&paths))).unwrap();

        let exported = store.export();
        let mut reloaded = PlaylistStore::new();
        reloaded.load(Some(exported.clone())).unwrap();

        assert_eq!(reloaded.export().list, exported.list);
        let names: Vec<&str> = exported.list.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["c.mp4", "a.mp4", "b.mp4"]);
        assert!(exported.list.iter().all(|r| r.mime == "video/mp4"));
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let (dir, paths) = fixture(&["a.mp4"]);
        let mut store = PlaylistStore::new();
        store.load(Some(snapshot_of(&paths))).unwrap();

        let file = dir.path().join("pl.json");
        let mut snapshot = store.export();
        snapshot.next_to_play = 1;
        snapshot.write_to(&file).unwrap();

        let read = Snapshot::read_from(&file).unwrap();
        assert_eq!(read, snapshot);
        assert_eq!(read.format, SNAPSHOT_FORMAT);
    }

    #[test]
    fn test_remove_and_sort() {
        let (_dir, paths) = fixture(&["beta.mp4", "Zed.mp4", "alpha.mp4"]);
        let mut store = PlaylistStore::new();
        store.load(Some(snapshot_of(&paths))).unwrap();

        store.sort();
        let names: Vec<String> = store.iter().map(|e| e.filename.clone()).collect();
        assert_eq!(names, vec!["Zed.mp4", "alpha.mp4", "beta.mp4"]);

        let first = store.get(0).unwrap().clone();
        assert!(store.remove(&first));
        assert!(!store.remove(&first));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().filename, "alpha.mp4");
    }

    #[test]
    fn test_shuffle_keeps_entries() {
        let (_dir, paths) = fixture(&["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);
        let mut store = PlaylistStore::new();
        store.load(Some(snapshot_of(&paths))).unwrap();

        store.shuffle(&mut rand::thread_rng());
        store.sort();
        let names: Vec<String> = store.iter().map(|e| e.filename.clone()).collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);
    }

    #[test]
    fn test_ingest_filters_non_media() {
        let (_dir, paths) = fixture(&["song.mp3", "notes.txt", "cover.jpg", "film.mkv"]);
        let mut store = PlaylistStore::new();
        let added = store.ingest(&paths, &MediaClassifier::new()).unwrap();

        assert_eq!(added, 2);
        let entry = store.get(0).unwrap();
        assert_eq!(entry.filename, "song.mp3");
        assert_eq!(entry.media_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(store.get(1).unwrap().filename, "film.mkv");
    }
}

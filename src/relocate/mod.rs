// File relocation - moves reviewed files into sorting directories
// Never overwrites: identical copies collapse into the delete area, different ones get numbered names

use crate::config::DirectoryConfig;
use crate::error::{Error, Result};
use crate::media::FileEntry;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COMPARE_CHUNK: usize = 64 * 1024;

/// What happened to a file handed to [`Relocator::relocate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// Source now lives at `to`. `duplicate_of` is set when an identical file
    /// blocked the requested directory and the source went to the delete area instead.
    Moved {
        to: PathBuf,
        duplicate_of: Option<PathBuf>,
    },
    /// An identical copy was already in the delete area, so the source was removed
    Discarded { duplicate_of: PathBuf },
    /// The source already is the destination file
    Unchanged,
}

impl Relocation {
    /// Whether the entry left its original place (and so leaves the playlist)
    pub fn removes_entry(&self) -> bool {
        !matches!(self, Relocation::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct Relocator {
    delete_dir: PathBuf,
    conflict_tag: String,
}

impl Relocator {
    pub fn new(delete_dir: impl Into<PathBuf>, conflict_tag: impl Into<String>) -> Self {
        Self {
            delete_dir: delete_dir.into(),
            conflict_tag: conflict_tag.into(),
        }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(config.delete_dir.clone(), config.conflict_tag.clone())
    }

    pub fn delete_dir(&self) -> &Path {
        &self.delete_dir
    }

    /// Move `entry` into `dest_dir`.
    ///
    /// On a name clash the contents are compared byte for byte. Identical
    /// files are diverted to the delete area (or, already there, the source is
    /// removed). Different files retry as `<name>.0.<tag>`, `<name>.1.<tag>`, ...
    /// until a free name or an identical file turns up.
    pub fn relocate(&self, entry: &FileEntry, dest_dir: &Path) -> Result<Relocation> {
        let source = entry.fullpath.as_path();
        let name = source
            .file_name()
            .ok_or_else(|| Error::Path(source.to_path_buf()))?;
        let mut dir = dest_dir.to_path_buf();
        let mut attempt: Option<u32> = None;
        let mut duplicate_of: Option<PathBuf> = None;

        loop {
            ensure_directory(&dir)?;
            let candidate = dir.join(self.candidate_name(name, attempt));
            debug!("Trying {}", candidate.display());

            // Dangling symlinks still occupy the name
            if fs::symlink_metadata(&candidate).is_err() {
                move_file(source, &candidate)?;
                info!("Moved {} -> {}", source.display(), candidate.display());
                return Ok(Relocation::Moved {
                    to: candidate,
                    duplicate_of,
                });
            }

            if is_same_file(source, &candidate) {
                return Ok(Relocation::Unchanged);
            }

            let comparable = fs::metadata(&candidate).map_or(false, |meta| meta.is_file());
            if comparable && files_identical(source, &candidate)? {
                if self.is_delete_area(&dir) {
                    fs::remove_file(source)?;
                    info!("Removed {}, identical to {}", source.display(), candidate.display());
                    return Ok(Relocation::Discarded {
                        duplicate_of: candidate,
                    });
                }
                debug!("{} duplicates {}, diverting to delete area", source.display(), candidate.display());
                duplicate_of = Some(candidate);
                dir = self.delete_dir.clone();
                attempt = None;
                continue;
            }

            attempt = Some(attempt.map_or(0, |n| n + 1));
        }
    }

    fn candidate_name(&self, name: &OsStr, attempt: Option<u32>) -> OsString {
        let mut candidate = name.to_os_string();
        if let Some(n) = attempt {
            candidate.push(format!(".{}.{}", n, self.conflict_tag));
        }
        candidate
    }

    fn is_delete_area(&self, dir: &Path) -> bool {
        if dir == self.delete_dir {
            return true;
        }
        match (dir.canonicalize(), self.delete_dir.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::DestinationConflict(dir.to_path_buf()));
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Rename, or copy then remove when the destination is on another filesystem
fn move_file(source: &Path, dest: &Path) -> Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Cross-device move, copying {}", source.display());
            if let Err(copy_err) = fs::copy(source, dest) {
                let _ = fs::remove_file(dest);
                return Err(copy_err.into());
            }
            fs::remove_file(source)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Full content comparison. Sizes are checked first.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut left = BufReader::new(File::open(a)?);
    let mut right = BufReader::new(File::open(b)?);
    let mut left_buf = vec![0u8; COMPARE_CHUNK];
    let mut right_buf = vec![0u8; COMPARE_CHUNK];

    loop {
        let left_len = fill(&mut left, &mut left_buf)?;
        let right_len = fill(&mut right, &mut right_buf)?;
        if left_len != right_len || left_buf[..left_len] != right_buf[..right_len] {
            return Ok(false);
        }
        if left_len == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the reader is exhausted
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        root: TempDir,
        relocator: Relocator,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempdir().unwrap();
            let relocator = Relocator::new(root.path().join(".delete"), "notsame");
            Self { root, relocator }
        }

        fn file(&self, rel: &str, content: &[u8]) -> PathBuf {
            let path = self.root.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn dir(&self, rel: &str) -> PathBuf {
            self.root.path().join(rel)
        }
    }

    #[test]
    fn test_moves_into_new_directory() {
        let fx = Fixture::new();
        let src = fx.file("in/a.mp4", b"movie");
        let entry = FileEntry::new(&src).unwrap();

        let outcome = fx.relocator.relocate(&entry, &fx.dir("sett")).unwrap();
        assert_eq!(
            outcome,
            Relocation::Moved {
                to: fx.dir("sett").join("a.mp4"),
                duplicate_of: None
            }
        );
        assert!(!src.exists());
        assert_eq!(fs::read(fx.dir("sett/a.mp4")).unwrap(), b"movie");
    }

    #[test]
    fn test_collisions_get_increasing_suffixes() {
        let fx = Fixture::new();
        fx.file("sett/x.mp4", b"first");

        let second = FileEntry::new(fx.file("in/x.mp4", b"second")).unwrap();
        let outcome = fx.relocator.relocate(&second, &fx.dir("sett")).unwrap();
        assert!(matches!(outcome, Relocation::Moved { ref to, .. } if to == &fx.dir("sett/x.mp4.0.notsame")));

        let third = FileEntry::new(fx.file("in/x.mp4", b"third!")).unwrap();
        let outcome = fx.relocator.relocate(&third, &fx.dir("sett")).unwrap();
        assert!(matches!(outcome, Relocation::Moved { ref to, .. } if to == &fx.dir("sett/x.mp4.1.notsame")));

        assert_eq!(fs::read(fx.dir("sett/x.mp4")).unwrap(), b"first");
        assert_eq!(fs::read(fx.dir("sett/x.mp4.0.notsame")).unwrap(), b"second");
        assert_eq!(fs::read(fx.dir("sett/x.mp4.1.notsame")).unwrap(), b"third!");
    }

    #[test]
    fn test_identical_file_diverts_to_delete_area() {
        let fx = Fixture::new();
        let existing = fx.file("sett/x.mp4", b"same bytes");
        let src = fx.file("in/x.mp4", b"same bytes");
        let entry = FileEntry::new(&src).unwrap();

        let outcome = fx.relocator.relocate(&entry, &fx.dir("sett")).unwrap();
        assert_eq!(
            outcome,
            Relocation::Moved {
                to: fx.dir(".delete/x.mp4"),
                duplicate_of: Some(existing.clone())
            }
        );
        assert!(existing.exists());
        assert!(!src.exists());
    }

    #[test]
    fn test_identical_file_in_delete_area_removes_source() {
        let fx = Fixture::new();
        let trashed = fx.file(".delete/x.mp4", b"same bytes");
        let src = fx.file("in/x.mp4", b"same bytes");
        let entry = FileEntry::new(&src).unwrap();

        let outcome = fx.relocator.relocate(&entry, &fx.dir(".delete")).unwrap();
        assert_eq!(outcome, Relocation::Discarded { duplicate_of: trashed.clone() });
        assert!(!src.exists());
        assert_eq!(fs::read(&trashed).unwrap(), b"same bytes");
    }

    #[test]
    fn test_duplicate_after_suffix_collision() {
        let fx = Fixture::new();
        fx.file("sett/x.mp4", b"other");
        fx.file("sett/x.mp4.0.notsame", b"mine");
        let src = fx.file("in/x.mp4", b"mine");
        let entry = FileEntry::new(&src).unwrap();

        let outcome = fx.relocator.relocate(&entry, &fx.dir("sett")).unwrap();
        assert_eq!(
            outcome,
            Relocation::Moved {
                to: fx.dir(".delete/x.mp4"),
                duplicate_of: Some(fx.dir("sett/x.mp4.0.notsame"))
            }
        );
    }

    #[test]
    fn test_destination_that_is_a_file_is_rejected() {
        let fx = Fixture::new();
        let blocker = fx.file("sett", b"not a dir");
        let src = fx.file("in/a.mp4", b"movie");
        let entry = FileEntry::new(&src).unwrap();

        let err = fx.relocator.relocate(&entry, &blocker).unwrap_err();
        assert!(matches!(err, Error::DestinationConflict(_)));
        assert!(src.exists());
        assert_eq!(fs::read(&blocker).unwrap(), b"not a dir");
    }

    #[test]
    fn test_file_already_in_destination_is_left_alone() {
        let fx = Fixture::new();
        let src = fx.file(".delete/a.mp4", b"movie");
        let entry = FileEntry::new(&src).unwrap();

        let outcome = fx.relocator.relocate(&entry, &fx.dir(".delete")).unwrap();
        assert_eq!(outcome, Relocation::Unchanged);
        assert!(!outcome.removes_entry());
        assert!(src.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_keeps_its_name() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.dir("sett")).unwrap();
        let link = fx.dir("sett/a.mp4");
        std::os::unix::fs::symlink(fx.dir("nowhere/a.mp4"), &link).unwrap();
        let src = fx.file("in/a.mp4", b"movie");
        let entry = FileEntry::new(&src).unwrap();

        let outcome = fx.relocator.relocate(&entry, &fx.dir("sett")).unwrap();
        assert!(matches!(outcome, Relocation::Moved { ref to, .. } if to == &fx.dir("sett/a.mp4.0.notsame")));
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(!src.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_survives_move() {
        use std::os::unix::ffi::OsStrExt;

        let fx = Fixture::new();
        let raw = OsStr::from_bytes(b"caf\xE9.mp4");
        fs::create_dir_all(fx.dir("in")).unwrap();
        let src = fx.dir("in").join(raw);
        fs::write(&src, b"movie").unwrap();
        let entry = FileEntry::new(&src).unwrap();

        fx.relocator.relocate(&entry, &fx.dir("sett")).unwrap();
        let names: Vec<OsString> = fs::read_dir(fx.dir("sett"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![raw.to_os_string()]);

        // A second file with the same raw name collides on the real name
        fs::write(&src, b"other movie").unwrap();
        let entry = FileEntry::new(&src).unwrap();
        let outcome = fx.relocator.relocate(&entry, &fx.dir("sett")).unwrap();
        let mut expected = raw.to_os_string();
        expected.push(".0.notsame");
        assert!(matches!(outcome, Relocation::Moved { ref to, .. } if to == &fx.dir("sett").join(&expected)));
    }

    #[test]
    fn test_files_identical_compares_content() {
        let fx = Fixture::new();
        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut changed = big.clone();
        changed[150_000] ^= 1;

        let a = fx.file("a.bin", &big);
        let b = fx.file("b.bin", &big);
        let c = fx.file("c.bin", &changed);
        assert!(files_identical(&a, &b).unwrap());
        assert!(!files_identical(&a, &c).unwrap());
    }
}

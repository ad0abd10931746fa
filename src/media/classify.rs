use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Only types under these prefixes make it into the playlist
const ACCEPTED_PREFIXES: [&str; 2] = ["video/", "audio/"];

/// Media containers the MIME table files elsewhere or not at all
const EXTRA_MEDIA_EXTENSIONS: &[(&str, &str)] = &[
    ("aif", "audio/aiff"),
    ("aiff", "audio/aiff"),
    ("amr", "audio/amr"),
    ("ape", "audio/x-ape"),
    ("wv", "audio/x-wavpack"),
    ("mka", "audio/x-matroska"),
    ("opus", "audio/opus"),
    ("m2ts", "video/mp2t"),
    ("mts", "video/mp2t"),
    ("ts", "video/mp2t"),
    ("vob", "video/mpeg"),
    ("rm", "video/vnd.rn-realvideo"),
    ("rmvb", "video/vnd.rn-realvideo"),
];

/// Enough bytes to recognize every container we sniff for
const SNIFF_LEN: usize = 64;

/// Decides what kind of file a path is. Returns a MIME-style type string.
pub trait Classifier {
    fn classify(&self, path: &Path) -> Option<String>;
}

/// True for types the review playlist accepts
pub fn is_media_type(media_type: &str) -> bool {
    ACCEPTED_PREFIXES
        .iter()
        .any(|prefix| media_type.starts_with(prefix))
}

/// Extension lookup first; content sniffing when the extension says nothing
/// useful (unknown, text-ish, or a bare `.1`..`.9` part number).
#[derive(Debug, Clone, Default)]
pub struct MediaClassifier;

impl MediaClassifier {
    pub fn new() -> Self {
        Self
    }

    /// MIME guess from the file extension alone
    pub fn guess_from_extension(path: &Path) -> Option<&'static str> {
        let guess = mime_guess::from_path(path).first_raw();
        if guess.map_or(false, is_media_type) {
            return guess;
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        EXTRA_MEDIA_EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, mime)| *mime)
            .or(guess)
    }

    fn needs_deep_check(path: &Path, guess: Option<&str>) -> bool {
        let ambiguous = match guess {
            None => true,
            Some(mime) => {
                mime.starts_with("text/")
                    || mime.starts_with("model/")
                    || mime == "application/octet-stream"
            }
        };
        let numbered = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse::<u32>().ok())
            .map_or(false, |n| (1..=9).contains(&n));
        ambiguous || numbered
    }

    /// Recognize a container from its leading bytes
    pub fn sniff(header: &[u8]) -> Option<&'static str> {
        let starts = |magic: &[u8]| header.starts_with(magic);

        if starts(b"ID3") {
            return Some("audio/mpeg");
        }
        if starts(b"fLaC") {
            return Some("audio/flac");
        }
        if starts(b"OggS") {
            return Some("audio/ogg");
        }
        if starts(b"RIFF") && header.len() >= 12 {
            return match &header[8..12] {
                b"WAVE" => Some("audio/x-wav"),
                b"AVI " => Some("video/x-msvideo"),
                _ => None,
            };
        }
        if header.len() >= 12 && &header[4..8] == b"ftyp" {
            return match &header[8..11] {
                b"M4A" | b"M4B" => Some("audio/mp4"),
                b"qt " => Some("video/quicktime"),
                _ => Some("video/mp4"),
            };
        }
        if starts(&[0x1A, 0x45, 0xDF, 0xA3]) {
            let is_webm = header.windows(4).any(|w| w == b"webm");
            return Some(if is_webm { "video/webm" } else { "video/x-matroska" });
        }
        if starts(b"FORM") && header.len() >= 12 && matches!(&header[8..12], b"AIFF" | b"AIFC") {
            return Some("audio/aiff");
        }
        if starts(b"#!AMR") {
            return Some("audio/amr");
        }
        if starts(b"MAC ") {
            return Some("audio/x-ape");
        }
        if starts(b"wvpk") {
            return Some("audio/x-wavpack");
        }
        if starts(b".RMF") {
            return Some("video/vnd.rn-realvideo");
        }
        if starts(b"FLV") {
            return Some("video/x-flv");
        }
        if starts(&[0x00, 0x00, 0x01, 0xBA]) || starts(&[0x00, 0x00, 0x01, 0xB3]) {
            return Some("video/mpeg");
        }
        if starts(&[0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11]) {
            return Some("video/x-ms-asf");
        }
        if header.len() > 188 && header[0] == 0x47 && header[188] == 0x47 {
            return Some("video/mp2t");
        }
        // Bare MPEG audio frame sync
        if header.len() >= 2 && header[0] == 0xFF && (header[1] & 0xE0) == 0xE0 {
            return Some("audio/mpeg");
        }
        None
    }

    fn sniff_file(path: &Path) -> Option<&'static str> {
        let mut header = Vec::with_capacity(SNIFF_LEN * 4);
        let file = File::open(path).ok()?;
        // Transport streams need two packets to be recognized
        file.take((SNIFF_LEN * 4) as u64)
            .read_to_end(&mut header)
            .ok()?;
        Self::sniff(&header)
    }
}

impl Classifier for MediaClassifier {
    fn classify(&self, path: &Path) -> Option<String> {
        let guess = Self::guess_from_extension(path);
        let mime = if Self::needs_deep_check(path, guess) {
            debug!("Sniffing content of {}", path.display());
            Self::sniff_file(path).or(guess)
        } else {
            guess
        };
        mime.map(str::to_string)
    }
}

/// Expand command-line inputs into candidate file paths.
///
/// Directories are walked recursively (dotfiles skipped), every text file in
/// `text_files` contributes one path per non-empty line, anything else is
/// passed through as is.
pub fn collect_paths(inputs: &[PathBuf], text_files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_dir() {
            paths.extend(walk_directory(input));
        } else {
            paths.push(input.clone());
        }
    }

    for list in text_files {
        let content = fs::read_to_string(list)
            .with_context(|| format!("failed to read path list {}", list.display()))?;
        paths.extend(
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(PathBuf::from),
        );
    }

    debug!("Collected {} candidate paths", paths.len());
    Ok(paths)
}

fn walk_directory(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let hidden = entry
            .path()
            .strip_prefix(dir)
            .map(|rel| {
                rel.components()
                    .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            })
            .unwrap_or(false);
        if !hidden {
            found.push(entry.into_path());
        }
    }
    found
}

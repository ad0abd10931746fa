pub mod classify;
pub mod entry;
pub mod player;
pub mod playlist;

pub use classify::{collect_paths, is_media_type, Classifier, MediaClassifier};
pub use entry::{EntryRecord, FileEntry};
pub use player::{MpvPlayer, OptionValue, PlaybackOutcome, Player, PlayerOptions};
pub use playlist::{PlaylistStore, Snapshot, SNAPSHOT_FORMAT};

// mediacull library - review a pile of media files one at a time and sort them
// Play a file, decide where it goes, move on

pub mod config;    // directory names and player command
pub mod error;     // library error type
pub mod media;     // entries, playlist, classification, player
pub mod relocate;  // collision-safe moves into sorting directories
pub mod session;   // the interactive review loop

pub use config::{Config, DefaultActions, DirectoryConfig, PlayerConfig};
pub use error::{Error, Result};
pub use media::{FileEntry, MediaClassifier, MpvPlayer, Player, PlaylistStore, Snapshot};
pub use relocate::{Relocation, Relocator};
pub use session::{Command, InputSource, Session, SessionInput, SessionOptions, TerminalInput};

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::{debug, warn};

pub const MUTE: &str = "mute";
pub const VERBOSE: &str = "verbose";
pub const STEREO: &str = "stereo";
pub const CACHE: &str = "cache";
pub const SUBTITLE_LANGUAGE: &str = "slang";
pub const AUDIO_LANGUAGE: &str = "alang";
pub const SUBTITLE_ID: &str = "sid";
pub const AUDIO_ID: &str = "aid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl OptionValue {
    /// False flags and empty text are left off the command line
    pub fn is_set(&self) -> bool {
        match self {
            OptionValue::Flag(on) => *on,
            OptionValue::Number(_) => true,
            OptionValue::Text(text) => !text.is_empty(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Flag(on) => write!(f, "{}", on),
            OptionValue::Number(n) => write!(f, "{}", n),
            OptionValue::Text(text) => write!(f, "{}", text),
        }
    }
}

pub type PlayerOptions = BTreeMap<String, OptionValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    /// Player ran but reported failure; the session moves on regardless
    Failed(Option<i32>),
}

/// Something that can play a file to completion
pub trait Player {
    fn options(&self) -> PlayerOptions;
    /// Merge `options` into the current set
    fn set_options(&mut self, options: PlayerOptions);
    fn toggle_mute(&mut self);
    /// Blocks until playback ends
    fn play(&mut self, path: &Path) -> Result<PlaybackOutcome>;
}

/// Runs an mpv-compatible program once per file
#[derive(Debug, Clone)]
pub struct MpvPlayer {
    program: String,
    base_args: Vec<String>,
    options: PlayerOptions,
}

impl MpvPlayer {
    pub fn new(config: &PlayerConfig) -> Self {
        let mut options = PlayerOptions::new();
        for key in [MUTE, VERBOSE, STEREO] {
            options.insert(key.to_string(), OptionValue::Flag(false));
        }

        Self {
            program: config.program.clone(),
            base_args: config.base_args.clone(),
            options,
        }
    }

    /// Arguments passed to the program for `path`, in order
    pub fn command_args(&self, path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.base_args.iter().map(OsString::from).collect();

        for (key, value) in &self.options {
            if !value.is_set() {
                continue;
            }
            match key.as_str() {
                MUTE => args.push("--no-audio".into()),
                VERBOSE => args.push("-v".into()),
                STEREO => args.push("--audio-channels=stereo".into()),
                CACHE => {
                    args.push("--cache=yes".into());
                    args.push(format!("--demuxer-max-bytes={}KiB", value).into());
                }
                _ => match value {
                    OptionValue::Flag(_) => args.push(format!("--{}", key).into()),
                    other => args.push(format!("--{}={}", key, other).into()),
                },
            }
        }

        args.push(path.as_os_str().to_os_string());
        args
    }

    fn status_outcome(status: ExitStatus) -> PlaybackOutcome {
        if status.success() {
            PlaybackOutcome::Finished
        } else {
            PlaybackOutcome::Failed(status.code())
        }
    }
}

impl Player for MpvPlayer {
    fn options(&self) -> PlayerOptions {
        self.options.clone()
    }

    fn set_options(&mut self, options: PlayerOptions) {
        self.options.extend(options);
    }

    fn toggle_mute(&mut self) {
        let muted = matches!(self.options.get(MUTE), Some(OptionValue::Flag(true)));
        self.options.insert(MUTE.to_string(), OptionValue::Flag(!muted));
    }

    fn play(&mut self, path: &Path) -> Result<PlaybackOutcome> {
        let args = self.command_args(path);
        debug!("Running {} {:?}", self.program, args);

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|e| Error::Player(format!("could not run '{}': {}", self.program, e)))?;

        let outcome = Self::status_outcome(status);
        if let PlaybackOutcome::Failed(code) = outcome {
            warn!("{} exited with {:?} for {}", self.program, code, path.display());
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_as_strings(player: &MpvPlayer, path: &Path) -> Vec<String> {
        player
            .command_args(path)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_default_command_line() {
        let player = MpvPlayer::new(&PlayerConfig::default());
        let args = args_as_strings(&player, Path::new("/m/a.mkv"));
        assert_eq!(args, vec!["--fs", "/m/a.mkv"]);
    }

    #[test]
    fn test_known_and_passthrough_options() {
        let mut player = MpvPlayer::new(&PlayerConfig::default());
        let mut options = PlayerOptions::new();
        options.insert(MUTE.into(), OptionValue::Flag(true));
        options.insert(STEREO.into(), OptionValue::Flag(true));
        options.insert(CACHE.into(), OptionValue::Number(4096));
        options.insert(SUBTITLE_LANGUAGE.into(), OptionValue::Text("en".into()));
        options.insert(AUDIO_LANGUAGE.into(), OptionValue::Text(String::new()));
        options.insert("really-quiet".into(), OptionValue::Flag(true));
        player.set_options(options);

        let args = args_as_strings(&player, &PathBuf::from("x.mp4"));
        assert_eq!(
            args,
            vec![
                "--fs",
                "--cache=yes",
                "--demuxer-max-bytes=4096KiB",
                "--no-audio",
                "--really-quiet",
                "--slang=en",
                "--audio-channels=stereo",
                "x.mp4",
            ]
        );
    }

    #[test]
    fn test_toggle_mute() {
        let mut player = MpvPlayer::new(&PlayerConfig::default());
        player.toggle_mute();
        assert_eq!(player.options().get(MUTE), Some(&OptionValue::Flag(true)));
        player.toggle_mute();
        assert_eq!(player.options().get(MUTE), Some(&OptionValue::Flag(false)));
    }

    #[test]
    fn test_missing_program_is_player_error() {
        let config = PlayerConfig {
            program: "/nonexistent/definitely-not-a-player".into(),
            base_args: Vec::new(),
        };
        let mut player = MpvPlayer::new(&config);
        assert!(matches!(player.play(Path::new("a.mp4")), Err(Error::Player(_))));
    }
}

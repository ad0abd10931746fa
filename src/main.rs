// mediacull - play media files one by one and sort them as you go
// Everything interactive lives in the library; this wires up config, logging and input

use anyhow::{Context, Result};
use clap::Parser;
use mediacull::{
    media::player::{
        OptionValue, PlayerOptions, AUDIO_ID, AUDIO_LANGUAGE, CACHE, MUTE, STEREO, SUBTITLE_ID,
        SUBTITLE_LANGUAGE, VERBOSE,
    },
    media::collect_paths,
    Config, DefaultActions, MediaClassifier, MpvPlayer, Player, PlaylistStore, Session,
    SessionInput, SessionOptions, Snapshot, TerminalInput,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mediacull", version)]
#[command(about = "Play media files one at a time and move, keep or delete each one")]
struct Args {
    /// Files or directories to review
    files: Vec<PathBuf>,

    /// Start with audio off
    #[arg(short = 'n', long)]
    nosound: bool,

    /// Shuffle the playlist before starting
    #[arg(short = 'z', long)]
    randomize: bool,

    /// Save the playlist when the session ends
    #[arg(short = 'x', long)]
    save_playlist: bool,

    /// Blank input deletes the previous file
    #[arg(short = 'd', long)]
    move_delete: bool,

    /// Blank input moves the previous file to the move directory
    #[arg(short = 'm', long)]
    move_files: bool,

    /// Move directory to use instead of the configured one (implies --move-files)
    #[arg(short = 'M', long, value_name = "DIR")]
    move_file_dir: Option<PathBuf>,

    /// Never delete, even when asked to
    #[arg(short = 'D', long)]
    no_delete: bool,

    /// Player cache size in KiB
    #[arg(short = 'c', long, value_name = "KB")]
    cache: Option<u32>,

    /// Play everything without asking in between
    #[arg(short = 'q', long)]
    no_wait: bool,

    /// Force stereo output
    #[arg(short = 's', long)]
    stereo: bool,

    #[arg(short = 'v', long)]
    verbose: bool,

    /// Playlist index to start at
    #[arg(short = 'i', long, value_name = "N", default_value_t = 0)]
    start_at: usize,

    /// File with one path per line
    #[arg(short = 't', long = "text-file", value_name = "FILE")]
    text_files: Vec<PathBuf>,

    /// Saved playlist to load
    #[arg(short = 'p', long = "playlist", value_name = "FILE")]
    playlists: Vec<PathBuf>,

    #[arg(short = 'j', long, value_name = "LANG")]
    subtitle_language: Option<String>,

    #[arg(short = 'J', long, value_name = "ID")]
    subtitle_id: Option<i64>,

    #[arg(short = 'l', long, value_name = "LANG")]
    audio_language: Option<String>,

    #[arg(short = 'L', long, value_name = "ID")]
    audio_id: Option<i64>,

    /// Wait for a command before playing the first file
    #[arg(short = 'a', long)]
    no_autostart: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,
}

impl Args {
    fn player_options(&self) -> PlayerOptions {
        let mut options = PlayerOptions::new();
        options.insert(MUTE.into(), OptionValue::Flag(self.nosound));
        options.insert(STEREO.into(), OptionValue::Flag(self.stereo));
        options.insert(VERBOSE.into(), OptionValue::Flag(self.verbose));

        if let Some(cache) = self.cache {
            options.insert(CACHE.into(), OptionValue::Number(i64::from(cache)));
        }
        if let Some(lang) = &self.subtitle_language {
            options.insert(SUBTITLE_LANGUAGE.into(), OptionValue::Text(lang.clone()));
        }
        if let Some(id) = self.subtitle_id {
            options.insert(SUBTITLE_ID.into(), OptionValue::Number(id));
        }
        if let Some(lang) = &self.audio_language {
            options.insert(AUDIO_LANGUAGE.into(), OptionValue::Text(lang.clone()));
        }
        if let Some(id) = self.audio_id {
            options.insert(AUDIO_ID.into(), OptionValue::Number(id));
        }
        options
    }

    fn default_actions(&self) -> DefaultActions {
        DefaultActions {
            no_delete: self.no_delete,
            continuous: self.no_wait,
            move_files: self.move_files || self.move_file_dir.is_some(),
            move_delete: self.move_delete,
            save_playlist: self.save_playlist,
            move_file_dir: self.move_file_dir.clone(),
            start_randomized: self.randomize,
        }
    }
}

/// File logging always, stderr too in dev mode. Keep the guard alive until exit.
fn init_logging(dev: bool) -> Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .context("could not determine data directory")?
        .join("mediacull")
        .join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mediacull.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mediacull=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);
    let stderr_layer = dev.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}

fn build_playlist(args: &Args) -> Result<PlaylistStore> {
    let mut store = PlaylistStore::new();

    for path in &args.playlists {
        let snapshot = Snapshot::read_from(path)
            .with_context(|| format!("failed to load playlist {}", path.display()))?;
        let added = store.load(Some(snapshot))?;
        info!("Loaded {} entries from {}", added, path.display());
    }

    let paths = collect_paths(&args.files, &args.text_files)?;
    let added = store.ingest(&paths, &MediaClassifier::new())?;
    debug!("{} of {} paths accepted as media", added, paths.len());

    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_logging(args.dev)?;
    info!("mediacull starting up");

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let mut player = MpvPlayer::new(&config.player);
    player.set_options(args.player_options());

    let playlist = build_playlist(&args)?;
    let actions = args.default_actions();
    let options = SessionOptions {
        autostart: !args.no_autostart,
        start_index: args.start_at,
    };

    let mut input = TerminalInput::spawn();
    let interrupts = input.interrupt_sender();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received");
            if interrupts.send(SessionInput::Interrupt).is_err() {
                break;
            }
        }
    });

    let directories = config.directories;
    tokio::task::spawn_blocking(move || {
        let mut session = Session::new(
            playlist,
            player,
            actions,
            directories,
            options,
            std::io::stdout(),
        );
        session.run(&mut input)
    })
    .await
    .context("session thread panicked")?
    .map_err(|e| {
        warn!("Session ended with an error: {}", e);
        e
    })?;

    info!("mediacull shutting down");
    Ok(())
}

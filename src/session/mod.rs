// Review session - the play -> decide -> advance loop
// Owns the playlist and cursor; every command reports whether the session should end

pub mod command;
pub mod input;

pub use command::{Command, Shortcut, COMMAND_TABLE};
pub use input::{InputSource, SessionInput, TerminalInput};

use crate::config::{DefaultActions, DirectoryConfig};
use crate::error::{Error, Result};
use crate::media::{FileEntry, PlaybackOutcome, Player, PlaylistStore};
use crate::relocate::{Relocation, Relocator};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Play the first entry before showing the prompt
    pub autostart: bool,
    pub start_index: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autostart: true,
            start_index: 0,
        }
    }
}

/// Interactive review of a playlist.
///
/// `next_idx` is the entry that plays next; the entry before it is the one
/// relocation commands act on. Playing always advances the cursor, even past
/// the end, so nothing acts on the last file twice once the list is exhausted.
pub struct Session<P: Player, W: Write> {
    playlist: PlaylistStore,
    player: P,
    actions: DefaultActions,
    directories: DirectoryConfig,
    relocator: Relocator,
    out: W,
    next_idx: usize,
    save_on_exit: bool,
    move_on_exit: bool,
    autostart: bool,
}

impl<P: Player, W: Write> Session<P, W> {
    pub fn new(
        mut playlist: PlaylistStore,
        player: P,
        actions: DefaultActions,
        directories: DirectoryConfig,
        options: SessionOptions,
        out: W,
    ) -> Self {
        if actions.start_randomized {
            playlist.shuffle(&mut rand::thread_rng());
        }

        let next_idx = if options.start_index > playlist.len() {
            warn!(
                "Start index {} is past the end of the playlist ({} entries)",
                options.start_index,
                playlist.len()
            );
            playlist.len()
        } else {
            options.start_index
        };

        Self {
            relocator: Relocator::from_config(&directories),
            playlist,
            player,
            actions,
            directories,
            out,
            next_idx,
            save_on_exit: true,
            move_on_exit: true,
            autostart: options.autostart,
        }
    }

    pub fn playlist(&self) -> &PlaylistStore {
        &self.playlist
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn next_index(&self) -> usize {
        self.next_idx
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.next_idx.checked_sub(1)
    }

    pub fn previous_entry(&self) -> Option<&FileEntry> {
        self.previous_index().and_then(|idx| self.playlist.get(idx))
    }

    pub fn next_entry(&self) -> Option<&FileEntry> {
        self.playlist.get(self.next_idx)
    }

    /// Drive the session until the playlist runs out or the operator quits
    pub fn run<I: InputSource + ?Sized>(&mut self, input: &mut I) -> Result<()> {
        if self.playlist.is_empty() {
            writeln!(self.out, "No files to play!")?;
            return Ok(());
        }

        info!("Starting session with {} files", self.playlist.len());
        if self.actions.continuous {
            self.run_unattended(input)
        } else {
            self.run_interactive(input)
        }
    }

    fn run_unattended<I: InputSource + ?Sized>(&mut self, input: &mut I) -> Result<()> {
        loop {
            if self.play_next()? {
                debug!("Unattended playback finished");
                return Ok(());
            }
            if input.interrupted() {
                writeln!(self.out)?;
                return self.finish();
            }
        }
    }

    fn run_interactive<I: InputSource + ?Sized>(&mut self, input: &mut I) -> Result<()> {
        if self.autostart {
            self.play_next()?;
        }

        loop {
            self.write_prompt()?;
            let stop = match input.read() {
                SessionInput::Line(line) => self.execute(Command::parse(&line)),
                SessionInput::Eof | SessionInput::Interrupt => {
                    writeln!(self.out)?;
                    true
                }
            };
            if stop {
                break;
            }
        }

        self.finish()
    }

    /// Run one command, reporting failures to the operator. Returns true when the session should end.
    pub fn execute(&mut self, command: Command) -> bool {
        debug!("Executing {:?}", command);
        match self.dispatch(command) {
            Ok(stop) => stop,
            Err(e) => {
                warn!("Command failed: {}", e);
                let _ = writeln!(self.out, "{}", e);
                false
            }
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Quit => Ok(true),
            Command::List => {
                self.list()?;
                Ok(false)
            }
            Command::Randomize => {
                self.playlist.shuffle(&mut rand::thread_rng());
                self.set_index(0);
                Ok(false)
            }
            Command::Replay => {
                if self.next_idx > 0 {
                    self.set_index(self.next_idx - 1);
                    return self.play_next();
                }
                Ok(false)
            }
            Command::ShowPlayerOptions => {
                for (key, value) in self.player.options() {
                    writeln!(self.out, "{:<10}{}", key, value)?;
                }
                Ok(false)
            }
            Command::MoveTo(dest) => {
                self.move_previous(dest.as_deref())?;
                self.play_next()
            }
            Command::NextNoMove => self.play_next(),
            Command::QuitNoMove => {
                self.move_on_exit = false;
                Ok(true)
            }
            Command::Delete => {
                self.delete_previous()?;
                self.play_next()
            }
            Command::QuitAfterDelete => {
                self.delete_previous()?;
                self.move_on_exit = false;
                Ok(true)
            }
            Command::MoveToShortcut { target, quit } => {
                let dir = self.shortcut_dir(target);
                self.move_previous(Some(&dir))?;
                if quit {
                    self.move_on_exit = false;
                    Ok(true)
                } else {
                    self.play_next()
                }
            }
            Command::ShowDetails => {
                if let Some(entry) = self.previous_entry() {
                    let details = entry.details();
                    writeln!(self.out, "{}", details)?;
                }
                Ok(false)
            }
            Command::ToggleAudio => {
                self.player.toggle_mute();
                writeln!(self.out, "Sound toggled")?;
                Ok(false)
            }
            Command::Save(dest) => {
                self.save(dest.as_deref())?;
                Ok(false)
            }
            Command::SaveAndQuit(dest) => {
                self.save(dest.as_deref())?;
                self.save_on_exit = false;
                Ok(true)
            }
            Command::Sort => {
                self.playlist.sort();
                self.set_index(0);
                Ok(false)
            }
            Command::Help => {
                for (usage, description) in COMMAND_TABLE {
                    writeln!(self.out, "{:<12}{}", usage, description)?;
                }
                Ok(false)
            }
            Command::Jump(index) => {
                match usize::try_from(index) {
                    Ok(idx) if idx < self.playlist.len() => self.set_index(idx),
                    _ => return Err(Error::NoSuchIndex(index)),
                }
                Ok(false)
            }
            Command::Empty => self.automatic_step(),
            Command::Unknown(token) => Err(Error::UnknownCommand(token)),
        }
    }

    /// Play the entry under the cursor. Returns true when there was nothing left to play.
    pub fn play_next(&mut self) -> Result<bool> {
        let index = self.next_idx;
        self.set_index(index + 1);

        let Some(entry) = self.playlist.get(index).cloned() else {
            writeln!(self.out, "No more files to play!")?;
            return Ok(true);
        };

        writeln!(self.out, "{}", "-".repeat(20))?;
        writeln!(self.out, "Playing #{}, \"{}\"", index, entry.filename)?;
        writeln!(self.out)?;
        self.out.flush()?;

        match self.player.play(&entry.fullpath) {
            Ok(PlaybackOutcome::Finished) => debug!("Finished {}", entry.fullpath.display()),
            Ok(PlaybackOutcome::Failed(code)) => {
                debug!("Player gave up on {} ({:?})", entry.fullpath.display(), code)
            }
            Err(e) => {
                warn!("Playback of {} failed: {}", entry.fullpath.display(), e);
                writeln!(self.out, "{}", e)?;
            }
        }
        Ok(false)
    }

    /// Blank input: apply the configured default action, then move on
    fn automatic_step(&mut self) -> Result<bool> {
        if self.actions.move_delete {
            info!("Automatically moving file to the delete area");
            self.delete_previous()?;
        } else if self.actions.move_files {
            info!("Automatically moving file to the move directory");
            self.move_previous(None)?;
        }

        // The step above already handled the last file
        if self.next_idx >= self.playlist.len() {
            self.move_on_exit = false;
            self.save_on_exit = false;
        }
        self.play_next()
    }

    fn delete_previous(&mut self) -> Result<()> {
        if self.actions.no_delete {
            info!("Not deleting, no-delete is set");
            return Ok(());
        }
        let delete_dir = self.relocator.delete_dir().to_path_buf();
        self.move_previous(Some(&delete_dir))
    }

    fn move_previous(&mut self, dest: Option<&Path>) -> Result<()> {
        let Some(entry) = self.previous_entry().cloned() else {
            debug!("Nothing to move");
            return Ok(());
        };
        let dest_dir = dest
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_move_dir());

        let outcome = match self.relocator.relocate(&entry, &dest_dir) {
            Ok(outcome) => outcome,
            Err(Error::DestinationConflict(dir)) => {
                writeln!(self.out, "'{}' already exists and is not a directory!", dir.display())?;
                writeln!(self.out, "Not moving the file!")?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.report_relocation(&entry, &dest_dir, &outcome)?;
        if outcome.removes_entry() {
            self.playlist.remove(&entry);
            self.set_index(self.next_idx.saturating_sub(1));
        }
        Ok(())
    }

    fn report_relocation(&mut self, entry: &FileEntry, dest_dir: &Path, outcome: &Relocation) -> Result<()> {
        match outcome {
            Relocation::Moved { to, duplicate_of } => {
                if let Some(original) = duplicate_of {
                    writeln!(
                        self.out,
                        "File already exists and is the same as {}! Moving file to {}",
                        original.display(),
                        self.relocator.delete_dir().display()
                    )?;
                }
                let target_dir = to.parent().unwrap_or(dest_dir);
                writeln!(self.out, "Moving {} -> {}", entry.relpath.display(), target_dir.display())?;
                writeln!(self.out, "{}", "-".repeat(20))?;
            }
            Relocation::Discarded { duplicate_of } => {
                writeln!(
                    self.out,
                    "File is already in {} as {}, removing!",
                    self.relocator.delete_dir().display(),
                    duplicate_of.display()
                )?;
            }
            Relocation::Unchanged => {
                writeln!(self.out, "{} is already in {}", entry.filename, dest_dir.display())?;
            }
        }
        Ok(())
    }

    fn save(&mut self, dest: Option<&Path>) -> Result<()> {
        let path = dest
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.directories.snapshot_file.clone());

        let mut snapshot = self.playlist.export();
        snapshot.next_to_play = self.next_idx;
        snapshot.next_filename = self
            .next_entry()
            .map(|entry| entry.filename.clone())
            .unwrap_or_default();
        snapshot.write_to(&path)?;

        writeln!(self.out, "Playlist saved to {}", path.display())?;
        Ok(())
    }

    /// End-of-session actions, skipped where a command already opted out
    fn finish(&mut self) -> Result<()> {
        if self.actions.move_delete && self.move_on_exit {
            let result = self.delete_previous();
            self.report(result)?;
        } else if self.actions.move_files && self.move_on_exit {
            let result = self.move_previous(None);
            self.report(result)?;
        }

        if self.actions.save_playlist && self.save_on_exit {
            let result = self.save(None);
            self.report(result)?;
        }

        writeln!(self.out, "Bye bye!")?;
        info!("Session finished, {} files left in playlist", self.playlist.len());
        Ok(())
    }

    fn report(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = result {
            warn!("{}", e);
            writeln!(self.out, "{}", e)?;
        }
        Ok(())
    }

    fn list(&mut self) -> Result<()> {
        let width = self.playlist.len().to_string().len();
        for (idx, entry) in self.playlist.iter().enumerate() {
            let marker = if idx == self.next_idx { '*' } else { ' ' };
            writeln!(self.out, "{}{:>width$} : {}", marker, idx, entry.filename, width = width)?;
        }
        Ok(())
    }

    fn write_prompt(&mut self) -> Result<()> {
        let prev = self.previous_entry().map(|e| e.filename.clone());
        let next = self.next_entry().map(|e| e.filename.clone());
        write!(
            self.out,
            "\nPrev: {}\nNext: {}\nDo? ",
            prev.as_deref().unwrap_or("None"),
            next.as_deref().unwrap_or("None")
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn set_index(&mut self, next_idx: usize) {
        self.next_idx = next_idx;
    }

    fn default_move_dir(&self) -> PathBuf {
        self.actions
            .move_file_dir
            .clone()
            .unwrap_or_else(|| self.directories.move_dir.clone())
    }

    fn shortcut_dir(&self, target: Shortcut) -> PathBuf {
        match target {
            Shortcut::Good => self.directories.good_dir.clone(),
            Shortcut::NotGood => self.directories.not_good_dir.clone(),
        }
    }
}

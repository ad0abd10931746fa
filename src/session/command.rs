use std::path::PathBuf;

/// Which of the two quick-sort directories a shortcut targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Good,
    NotGood,
}

/// One parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    List,
    Randomize,
    Replay,
    ShowPlayerOptions,
    MoveTo(Option<PathBuf>),
    NextNoMove,
    QuitNoMove,
    Delete,
    QuitAfterDelete,
    MoveToShortcut { target: Shortcut, quit: bool },
    ShowDetails,
    ToggleAudio,
    Save(Option<PathBuf>),
    SaveAndQuit(Option<PathBuf>),
    Sort,
    Help,
    Jump(i64),
    /// Blank line: run the configured automatic action
    Empty,
    Unknown(String),
}

/// Usage and description for every command, in help order
pub const COMMAND_TABLE: &[(&str, &str)] = &[
    ("q", "Quit"),
    ("l", "List all entries in playlist"),
    ("z", "Randomize playlist order"),
    ("r", "Replay playlist entry"),
    ("p", "Print out player options"),
    ("m [dir]", "Move previous file to dir (default move dir) and play next"),
    ("nm", "Play next file without moving previous file"),
    ("nmq", "Quit without moving previous file"),
    ("y, a", "Delete previous file unless no-delete is set, play next"),
    ("yq", "Delete previous file and quit"),
    ("g", "Move previous file to the good dir, play next"),
    ("gq", "Move previous file to the good dir and quit"),
    ("ng", "Move previous file to the not-good dir, play next"),
    ("ngq", "Move previous file to the not-good dir and quit"),
    ("details", "Show details of file just played"),
    ("nosound", "Toggle player audio on/off"),
    ("s [file]", "Save playlist to file"),
    ("sq [file]", "Save playlist to file and quit"),
    ("sort", "Sort playlist by file name"),
    ("<number>", "Make that playlist index the next to play"),
    ("<enter>", "Run the default action, then play next"),
    ("help, ?", "Show this list"),
];

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }

        let (token, rest) = match line.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then(|| PathBuf::from(rest));

        match token {
            "q" => Command::Quit,
            "l" => Command::List,
            "z" => Command::Randomize,
            "r" => Command::Replay,
            "p" => Command::ShowPlayerOptions,
            "m" => Command::MoveTo(arg),
            "nm" => Command::NextNoMove,
            "nmq" => Command::QuitNoMove,
            "y" | "a" => Command::Delete,
            "yq" => Command::QuitAfterDelete,
            "g" => Command::MoveToShortcut { target: Shortcut::Good, quit: false },
            "gq" => Command::MoveToShortcut { target: Shortcut::Good, quit: true },
            "ng" => Command::MoveToShortcut { target: Shortcut::NotGood, quit: false },
            "ngq" => Command::MoveToShortcut { target: Shortcut::NotGood, quit: true },
            "details" => Command::ShowDetails,
            "nosound" => Command::ToggleAudio,
            "s" => Command::Save(arg),
            "sq" => Command::SaveAndQuit(arg),
            "sort" => Command::Sort,
            "help" | "?" => Command::Help,
            other => parse_index(other)
                .map(Command::Jump)
                .unwrap_or_else(|| Command::Unknown(other.to_string())),
        }
    }
}

/// Signed decimal integer; anything else is not an index.
/// Too many digits saturates, which no playlist can reach.
fn parse_index(token: &str) -> Option<i64> {
    let digits = token.trim_start_matches(['+', '-']);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let saturated = if token.starts_with('-') { i64::MIN } else { i64::MAX };
    Some(token.parse().unwrap_or(saturated))
}

// Operator input for the session
// stdin is only read on request so the player owns the terminal while it runs

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::mpsc as std_mpsc;
use std::thread;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Line(String),
    /// Input stream closed
    Eof,
    /// Ctrl-C from the operator
    Interrupt,
}

pub trait InputSource {
    /// Block until the next line (or end of input / interrupt)
    fn read(&mut self) -> SessionInput;

    /// Non-blocking check used between unattended playbacks
    fn interrupted(&mut self) -> bool {
        false
    }
}

/// Scripted input, mostly for tests. Runs dry as `Eof`.
impl InputSource for VecDeque<SessionInput> {
    fn read(&mut self) -> SessionInput {
        self.pop_front().unwrap_or(SessionInput::Eof)
    }

    fn interrupted(&mut self) -> bool {
        if self.front() == Some(&SessionInput::Interrupt) {
            self.pop_front();
            return true;
        }
        false
    }
}

/// stdin lines and Ctrl-C merged into one channel
pub struct TerminalInput {
    requests: std_mpsc::Sender<()>,
    events_tx: mpsc::UnboundedSender<SessionInput>,
    events_rx: mpsc::UnboundedReceiver<SessionInput>,
    pending: bool,
}

impl TerminalInput {
    /// Starts the stdin reader thread. It idles until a line is requested.
    pub fn spawn() -> Self {
        let (requests, request_rx) = std_mpsc::channel::<()>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let reader_tx = events_tx.clone();
        thread::spawn(move || {
            let stdin = io::stdin();
            while request_rx.recv().is_ok() {
                let mut line = String::new();
                let event = match stdin.lock().read_line(&mut line) {
                    Ok(0) | Err(_) => SessionInput::Eof,
                    Ok(_) => SessionInput::Line(line.trim_end_matches(['\r', '\n']).to_string()),
                };
                let done = event == SessionInput::Eof;
                if reader_tx.send(event).is_err() || done {
                    break;
                }
            }
            debug!("stdin reader finished");
        });

        Self {
            requests,
            events_tx,
            events_rx,
            pending: false,
        }
    }

    /// Handle for delivering interrupts from a signal task
    pub fn interrupt_sender(&self) -> mpsc::UnboundedSender<SessionInput> {
        self.events_tx.clone()
    }
}

impl InputSource for TerminalInput {
    fn read(&mut self) -> SessionInput {
        // One outstanding request at a time; an interrupt may answer first
        if !self.pending {
            if self.requests.send(()).is_err() {
                return SessionInput::Eof;
            }
            self.pending = true;
        }

        let event = self.events_rx.blocking_recv().unwrap_or(SessionInput::Eof);
        if matches!(event, SessionInput::Line(_) | SessionInput::Eof) {
            self.pending = false;
        }
        event
    }

    fn interrupted(&mut self) -> bool {
        while let Ok(event) = self.events_rx.try_recv() {
            if event == SessionInput::Interrupt {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_runs_dry_as_eof() {
        let mut input: VecDeque<SessionInput> = VecDeque::from(vec![SessionInput::Line("l".into())]);
        assert_eq!(input.read(), SessionInput::Line("l".into()));
        assert_eq!(input.read(), SessionInput::Eof);
    }

    #[test]
    fn test_scripted_interrupt_is_consumed_once() {
        let mut input: VecDeque<SessionInput> =
            VecDeque::from(vec![SessionInput::Interrupt, SessionInput::Line("q".into())]);
        assert!(input.interrupted());
        assert!(!input.interrupted());
        assert_eq!(input.read(), SessionInput::Line("q".into()));
    }
}

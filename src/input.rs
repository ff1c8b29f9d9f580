//! Classified direction inputs: the keyboard and the motion sources.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction {0:?}, expected up, down or neutral")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "neutral" | "" => Ok(Direction::Neutral),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

impl Direction {
    fn to_u8(self) -> u8 {
        match self {
            Direction::Neutral => 0,
            Direction::Up => 1,
            Direction::Down => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Direction::Up,
            2 => Direction::Down,
            _ => Direction::Neutral,
        }
    }
}

/// A direction cell shared between a reader thread and the event loop.
#[derive(Clone, Debug, Default)]
pub struct SharedDirection(Arc<AtomicU8>);

impl SharedDirection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Direction {
        Direction::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, direction: Direction) {
        self.0.store(direction.to_u8(), Ordering::Release);
    }
}

/// Maps a key to the direction it stands for, if any.
pub fn classify_key(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('k') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('j') => Some(Direction::Down),
        _ => None,
    }
}

/// Latest keyboard direction plus the sequence number of the press that set it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeySample {
    pub direction: Direction,
    pub seq: u64,
}

/// Keyboard classifier. Every press is a discrete event; auto-repeat is
/// ignored and a release (when the terminal reports one) returns to neutral.
#[derive(Debug, Default)]
pub struct KeyboardInput {
    direction: Direction,
    seq: u64,
}

impl KeyboardInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the key was a direction key.
    pub fn on_key(&mut self, key: &KeyEvent) -> bool {
        let Some(direction) = classify_key(key.code) else {
            return false;
        };

        match key.kind {
            KeyEventKind::Press => {
                self.direction = direction;
                self.seq += 1;
            }
            KeyEventKind::Release => {
                if self.direction == direction {
                    self.direction = Direction::Neutral;
                }
            }
            KeyEventKind::Repeat => {}
        }
        true
    }

    pub fn sample(&self) -> KeySample {
        KeySample {
            direction: self.direction,
            seq: self.seq,
        }
    }
}

/// A device-motion direction source.
pub trait MotionSource {
    fn is_supported(&self) -> bool;

    /// Whether the user has to approve access before directions flow.
    fn needs_permission(&self) -> bool {
        false
    }

    /// Latest classified direction; neutral when unsupported or not granted.
    fn direction(&self) -> Direction;

    /// Asks for access without blocking. The receiver yields the answer once;
    /// a dropped sender counts as a refusal.
    fn request_permission(&mut self) -> Receiver<bool>;
}

/// The terminal has no motion sensor: always neutral.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMotion;

impl MotionSource for NoMotion {
    fn is_supported(&self) -> bool {
        false
    }

    fn direction(&self) -> Direction {
        Direction::Neutral
    }

    fn request_permission(&mut self) -> Receiver<bool> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(false);
        rx
    }
}

/// Reads classified directions, one per line, from a file or FIFO.
///
/// Opening the feed doubles as the permission request: it runs on its own
/// thread because opening a FIFO waits for a writer.
#[derive(Debug)]
pub struct FeedMotion {
    path: PathBuf,
    direction: SharedDirection,
    requested: bool,
}

impl FeedMotion {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            direction: SharedDirection::new(),
            requested: false,
        }
    }
}

impl MotionSource for FeedMotion {
    fn is_supported(&self) -> bool {
        true
    }

    fn needs_permission(&self) -> bool {
        true
    }

    fn direction(&self) -> Direction {
        self.direction.get()
    }

    fn request_permission(&mut self) -> Receiver<bool> {
        let (tx, rx) = mpsc::channel();
        if self.requested {
            // A second reader would race the first one for lines.
            let _ = tx.send(true);
            return rx;
        }
        self.requested = true;

        let path = self.path.clone();
        let direction = self.direction.clone();
        thread::spawn(move || {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "motion feed unavailable");
                    let _ = tx.send(false);
                    return;
                }
            };
            info!(path = %path.display(), "motion feed opened");
            if tx.send(true).is_err() {
                return;
            }
            read_feed(BufReader::new(file), &direction);
        });
        rx
    }
}

fn read_feed<R: BufRead>(reader: R, direction: &SharedDirection) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        match line.parse::<Direction>() {
            Ok(d) => direction.set(d),
            Err(e) => debug!(error = %e, "ignoring motion feed line"),
        }
    }
    direction.set(Direction::Neutral);
    debug!("motion feed closed");
}

/// Motion source driven by hand, for tests and headless runs.
#[derive(Debug)]
pub struct ManualMotion {
    direction: SharedDirection,
    supported: bool,
    needs_permission: bool,
    answer: Option<bool>,
    pending: Option<Sender<bool>>,
}

impl ManualMotion {
    pub fn new(direction: SharedDirection) -> Self {
        Self {
            direction,
            supported: true,
            needs_permission: false,
            answer: Some(true),
            pending: None,
        }
    }

    /// Requires a permission request. With `answer` set the request resolves
    /// at once; with `None` it stays pending until [`ManualMotion::resolve`].
    pub fn with_permission(mut self, answer: Option<bool>) -> Self {
        self.needs_permission = true;
        self.answer = answer;
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    pub fn resolve(&mut self, granted: bool) {
        if let Some(tx) = self.pending.take() {
            let _ = tx.send(granted);
        }
    }
}

impl MotionSource for ManualMotion {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn needs_permission(&self) -> bool {
        self.needs_permission
    }

    fn direction(&self) -> Direction {
        if self.supported {
            self.direction.get()
        } else {
            Direction::Neutral
        }
    }

    fn request_permission(&mut self) -> Receiver<bool> {
        let (tx, rx) = mpsc::channel();
        match self.answer {
            Some(granted) => {
                let _ = tx.send(granted);
            }
            None => self.pending = Some(tx),
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, KeyModifiers};
    use std::io::{Cursor, Write};
    use std::time::Duration;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn parse_directions() {
        assert_eq!("up".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!(" DOWN \n".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!("neutral".parse::<Direction>(), Ok(Direction::Neutral));
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Neutral.to_string(), "neutral");
    }

    #[test]
    fn classify_keys() {
        assert_eq!(classify_key(KeyCode::Up), Some(Direction::Up));
        assert_eq!(classify_key(KeyCode::Char('k')), Some(Direction::Up));
        assert_eq!(classify_key(KeyCode::Down), Some(Direction::Down));
        assert_eq!(classify_key(KeyCode::Char('s')), Some(Direction::Down));
        assert_eq!(classify_key(KeyCode::Char('x')), None);
    }

    #[test]
    fn keyboard_press_bumps_sequence_repeat_does_not() {
        let mut kb = KeyboardInput::new();
        assert!(kb.on_key(&key(KeyCode::Down, KeyEventKind::Press)));
        assert_eq!(
            kb.sample(),
            KeySample {
                direction: Direction::Down,
                seq: 1
            }
        );

        kb.on_key(&key(KeyCode::Down, KeyEventKind::Repeat));
        assert_eq!(kb.sample().seq, 1);

        kb.on_key(&key(KeyCode::Down, KeyEventKind::Release));
        assert_eq!(kb.sample().direction, Direction::Neutral);

        assert!(!kb.on_key(&key(KeyCode::Char('x'), KeyEventKind::Press)));
        assert_eq!(kb.sample().seq, 1);
    }

    #[test]
    fn release_of_other_key_keeps_direction() {
        let mut kb = KeyboardInput::new();
        kb.on_key(&key(KeyCode::Up, KeyEventKind::Press));
        kb.on_key(&key(KeyCode::Down, KeyEventKind::Release));
        assert_eq!(kb.sample().direction, Direction::Up);
    }

    #[test]
    fn no_motion_is_neutral_and_refuses() {
        let mut m = NoMotion;
        assert!(!m.is_supported());
        assert!(!m.needs_permission());
        assert_eq!(m.direction(), Direction::Neutral);
        assert_eq!(m.request_permission().recv(), Ok(false));
    }

    #[test]
    fn read_feed_tracks_last_line_then_resets() {
        let shared = SharedDirection::new();
        let seen = shared.clone();
        read_feed(Cursor::new("up\nbogus\ndown\n"), &shared);
        // The feed ended, so the direction falls back to neutral.
        assert_eq!(seen.get(), Direction::Neutral);
    }

    #[test]
    fn feed_motion_missing_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut feed = FeedMotion::new(dir.path().join("missing"));
        let rx = feed.request_permission();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(false));
        assert_eq!(feed.direction(), Direction::Neutral);
    }

    #[test]
    fn feed_motion_grants_when_file_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "up").unwrap();
        drop(f);

        let mut feed = FeedMotion::new(&path);
        assert!(feed.is_supported());
        assert!(feed.needs_permission());
        let rx = feed.request_permission();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(true));
    }

    #[test]
    fn manual_motion_pending_until_resolved() {
        let mut m = ManualMotion::new(SharedDirection::new()).with_permission(None);
        let rx = m.request_permission();
        assert!(rx.try_recv().is_err());
        m.resolve(true);
        assert_eq!(rx.try_recv(), Ok(true));
    }

    #[test]
    fn unsupported_manual_motion_is_neutral() {
        let shared = SharedDirection::new();
        shared.set(Direction::Up);
        let m = ManualMotion::new(shared).unsupported();
        assert_eq!(m.direction(), Direction::Neutral);
    }
}

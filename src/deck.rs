//! Word decks: the embedded ones and the ones users create on disk.
//!
//! A deck file is plain text with one item per line. Names are sanitised to
//! `[a-z0-9_-]` so they map straight onto file names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::app_dirs::AppDirs;

static DECK_DIR: Dir = include_dir!("src/decks");

const DECK_EXT: &str = "txt";

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("deck name is required")]
    NameRequired,
    #[error("no words provided")]
    NoWords,
    #[error("a deck named {0:?} already exists")]
    AlreadyExists(String),
    #[error("deck {0:?} not found")]
    NotFound(String),
    #[error("deck {0:?} is built in and cannot be deleted")]
    Builtin(String),
    #[error("deck storage: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DeckError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeckSource {
    Builtin,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub name: String,
    pub source: DeckSource,
    pub words: Vec<String>,
}

impl Deck {
    /// Items for one game, shuffled unless asked not to and capped at
    /// `max_items` when given.
    pub fn draw(&self, shuffle: bool, max_items: Option<usize>) -> Vec<String> {
        let mut items = self.words.clone();
        if shuffle {
            items.shuffle(&mut rand::thread_rng());
        }
        if let Some(max) = max_items {
            items.truncate(max);
        }
        items
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckSummary {
    pub name: String,
    pub source: DeckSource,
    pub size: usize,
}

/// Splits deck text into trimmed, non-empty lines.
pub fn parse_words(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

/// Lowercases, drops anything outside `[a-z0-9 -]` and joins words with `_`.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let kept: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    let name = kept.split_whitespace().join("_");
    (!name.is_empty()).then_some(name)
}

pub fn builtin_names() -> Vec<String> {
    DECK_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|e| e == DECK_EXT))
        .filter_map(|f| f.path().file_stem()?.to_str().map(String::from))
        .sorted()
        .collect()
}

pub fn builtin(name: &str) -> Option<Deck> {
    let file = DECK_DIR.get_file(format!("{name}.{DECK_EXT}"))?;
    let text = file.contents_utf8()?;
    Some(Deck {
        name: name.to_string(),
        source: DeckSource::Builtin,
        words: parse_words(text),
    })
}

/// File-backed store of custom decks, layered over the built-in ones.
#[derive(Debug, Clone)]
pub struct DeckStore {
    dir: PathBuf,
}

impl Default for DeckStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckStore {
    pub fn new() -> Self {
        Self {
            dir: AppDirs::deck_dir(),
        }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn custom_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{DECK_EXT}"))
    }

    fn custom_names(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut names = vec![];
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == DECK_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Built-in and custom decks, sorted by name.
    pub fn list(&self) -> Result<Vec<DeckSummary>> {
        let builtins = builtin_names().into_iter().filter_map(|name| builtin(&name));
        let mut customs = vec![];
        for name in self.custom_names()? {
            customs.push(self.load_custom(&name)?);
        }

        Ok(builtins
            .chain(customs)
            .map(|deck| DeckSummary {
                size: deck.words.len(),
                name: deck.name,
                source: deck.source,
            })
            .sorted_by(|a, b| (&a.name, a.source).cmp(&(&b.name, b.source)))
            .collect())
    }

    fn load_custom(&self, name: &str) -> Result<Deck> {
        let text = fs::read_to_string(self.custom_path(name))?;
        Ok(Deck {
            name: name.to_string(),
            source: DeckSource::Custom,
            words: parse_words(&text),
        })
    }

    /// Looks a deck up by name, custom decks first.
    pub fn load(&self, name: &str) -> Result<Deck> {
        let name = sanitize_name(name).ok_or(DeckError::NameRequired)?;
        if self.custom_path(&name).is_file() {
            return self.load_custom(&name);
        }
        builtin(&name).ok_or(DeckError::NotFound(name))
    }

    /// Saves a new custom deck and returns its sanitised name.
    pub fn create(&self, name: &str, words: &[String]) -> Result<String> {
        let name = sanitize_name(name).ok_or(DeckError::NameRequired)?;
        let words: Vec<&str> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return Err(DeckError::NoWords);
        }
        if builtin(&name).is_some() || self.custom_path(&name).exists() {
            return Err(DeckError::AlreadyExists(name));
        }

        fs::create_dir_all(&self.dir)?;
        fs::write(self.custom_path(&name), words.join("\n"))?;
        info!(deck = %name, size = words.len(), "custom deck created");
        Ok(name)
    }

    /// Same as [`DeckStore::create`] with the words given as deck text.
    pub fn create_from_text(&self, name: &str, text: &str) -> Result<String> {
        self.create(name, &parse_words(text))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let name = sanitize_name(name).ok_or(DeckError::NameRequired)?;
        let path = self.custom_path(&name);
        if path.is_file() {
            fs::remove_file(&path)?;
            info!(deck = %name, "custom deck deleted");
            return Ok(());
        }
        if builtin(&name).is_some() {
            return Err(DeckError::Builtin(name));
        }
        debug!(deck = %name, "delete of unknown deck");
        Err(DeckError::NotFound(name))
    }
}

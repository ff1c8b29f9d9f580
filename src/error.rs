use std::io;

use crate::deck::DeckError;
use crate::history::HistoryError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("logging init failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 60;
pub const DEFAULT_COUNTDOWN_SECS: u32 = 3;
pub const DEFAULT_CONFIRM_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    time_limit_secs: u32,
    pub countdown_secs: u32,
    pub confirm_delay: Duration,
}

impl SessionConfig {
    /// The time limit is clamped to at least one second.
    pub fn new(time_limit_secs: u32, countdown_secs: u32, confirm_delay: Duration) -> Self {
        Self {
            time_limit_secs: time_limit_secs.max(1),
            countdown_secs,
            confirm_delay,
        }
    }

    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_TIME_LIMIT_SECS,
            DEFAULT_COUNTDOWN_SECS,
            Duration::from_millis(DEFAULT_CONFIRM_DELAY_MS),
        )
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self::new(
            cfg.time_limit_secs,
            cfg.countdown_secs,
            Duration::from_millis(cfg.confirm_delay_ms),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum GameState {
    Idle,
    Ready,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub skipped: u32,
}

impl Score {
    pub fn total(&self) -> u32 {
        self.correct + self.skipped
    }
}

/// Read model handed to the presentation layer and the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionView<'a> {
    pub state: GameState,
    pub time_left: u32,
    pub time_limit: u32,
    pub current_item: Option<&'a str>,
    pub current_index: usize,
    pub item_count: usize,
    pub score: Score,
    pub action_in_progress: bool,
    pub countdown: u32,
}

impl SessionView<'_> {
    /// Fraction of the time budget still left, for progress bars.
    pub fn time_ratio(&self) -> f64 {
        if self.time_limit == 0 {
            return 0.0;
        }
        (self.time_left as f64 / self.time_limit as f64).clamp(0.0, 1.0)
    }

    pub fn accepts_advance(&self) -> bool {
        self.state == GameState::Playing && !self.action_in_progress
    }
}

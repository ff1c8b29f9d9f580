//! The terminal application: one deck, one session controller and the inputs
//! that drive it.

use std::fmt;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::deck::Deck;
use crate::game::Game;
use crate::history::{HistoryLog, HistoryRecord};
use crate::input::{classify_key, Direction, KeyboardInput, MotionSource};
use crate::permission::{Permission, PermissionGate};
use crate::reconciler::Reconciler;
use crate::session::{GameState, Score, SessionConfig, SessionView};

/// Which screen the app is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Mode {
    Permission,
    Countdown,
    Playing,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppControl {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOptions {
    pub shuffle: bool,
    pub max_items: Option<usize>,
}

impl From<&Config> for DrawOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            shuffle: cfg.shuffle,
            max_items: cfg.max_items,
        }
    }
}

pub struct App {
    game: Game,
    reconciler: Reconciler,
    keyboard: KeyboardInput,
    motion: Box<dyn MotionSource>,
    gate: PermissionGate,
    deck: Deck,
    draw: DrawOptions,
    finished: Receiver<Score>,
    history: Option<HistoryLog>,
    last_result: Option<Score>,
    games_played: u32,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("mode", &self.mode())
            .field("deck", &self.deck.name)
            .field("game", &self.game)
            .field("gate", &self.gate)
            .field("games_played", &self.games_played)
            .finish()
    }
}

impl App {
    /// Builds the app and starts the first game unless motion access still
    /// has to be asked for.
    pub fn new(
        deck: Deck,
        session: SessionConfig,
        draw: DrawOptions,
        motion: Box<dyn MotionSource>,
    ) -> Self {
        let (tx, finished) = mpsc::channel();
        let mut game = Game::new(session);
        game.on_finish(move |score| {
            let _ = tx.send(score);
        });

        let gate = PermissionGate::for_source(motion.as_ref());
        let mut app = Self {
            game,
            reconciler: Reconciler::new(),
            keyboard: KeyboardInput::new(),
            motion,
            gate,
            deck,
            draw,
            finished,
            history: None,
            last_result: None,
            games_played: 0,
        };
        if app.gate.is_open() {
            app.start_session();
        }
        app
    }

    /// Records every finished game to `history`.
    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self.collect_results();
        self
    }

    pub fn mode(&self) -> Mode {
        if !self.gate.is_open() {
            return Mode::Permission;
        }
        match self.game.state() {
            GameState::Idle | GameState::Ready => Mode::Countdown,
            GameState::Playing => Mode::Playing,
            GameState::Finished => Mode::Results,
        }
    }

    pub fn view(&self) -> SessionView<'_> {
        self.game.view()
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Whether motion directions reach the game: the source needs no
    /// approval, or the user granted it.
    pub fn motion_enabled(&self) -> bool {
        match self.gate {
            PermissionGate::NotRequired => self.motion.is_supported(),
            PermissionGate::Resolved(Permission::Granted) => true,
            PermissionGate::Prompt
            | PermissionGate::Pending(_)
            | PermissionGate::Resolved(Permission::Declined) => false,
        }
    }

    /// Tally of the most recently finished game.
    pub fn last_result(&self) -> Option<Score> {
        self.last_result
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    fn start_session(&mut self) {
        let items = self.deck.draw(self.draw.shuffle, self.draw.max_items);
        info!(deck = %self.deck.name, items = items.len(), "new game");
        self.reconciler = Reconciler::new();
        self.keyboard = KeyboardInput::new();
        self.game.start(items);
        self.collect_results();
    }

    /// Advances game time, settles the permission gate and samples the inputs.
    ///
    /// Inputs are sampled against the state they arrived in before time moves
    /// on, so a key pressed during the countdown is spent there even when the
    /// countdown ends within this step.
    pub fn update(&mut self, elapsed: Duration) {
        self.sample_inputs();
        self.game.tick(elapsed);

        if self.gate.poll().is_some() {
            self.start_session();
        }

        self.sample_inputs();
        self.collect_results();
    }

    fn sample_inputs(&mut self) {
        if !self.gate.is_open() {
            return;
        }
        let motion = if self.motion_enabled() {
            self.motion.direction()
        } else {
            Direction::Neutral
        };
        self.reconciler
            .pump(motion, self.keyboard.sample(), &mut self.game);
    }

    pub fn on_key(&mut self, key: KeyEvent) -> AppControl {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return AppControl::Quit;
        }

        if classify_key(key.code).is_some() {
            if matches!(self.mode(), Mode::Countdown | Mode::Playing) {
                self.keyboard.on_key(&key);
            }
            return AppControl::Continue;
        }

        if key.kind != KeyEventKind::Press {
            return AppControl::Continue;
        }

        match (self.mode(), key.code) {
            (Mode::Permission, KeyCode::Char('g')) => {
                self.gate.request(self.motion.as_mut());
            }
            (Mode::Permission, KeyCode::Char('c')) => {
                if self.gate.decline().is_some() {
                    self.start_session();
                }
            }
            (Mode::Playing, KeyCode::Char('e')) => self.game.reset_game(),
            (Mode::Results, KeyCode::Char('r')) => self.start_session(),
            (mode, code) => debug!(%mode, ?code, "key ignored"),
        }
        self.collect_results();
        AppControl::Continue
    }

    fn collect_results(&mut self) {
        while let Ok(score) = self.finished.try_recv() {
            self.last_result = Some(score);
            self.games_played += 1;

            let Some(history) = &self.history else {
                continue;
            };
            let record = HistoryRecord::new(
                &self.deck.name,
                self.game.config().time_limit_secs(),
                score,
            );
            if let Err(e) = history.append(&record) {
                warn!(error = %e, path = %history.path().display(), "could not record game");
            }
        }
    }
}

//! Merges the motion and keyboard directions into one advance intent.

use tracing::debug;

use crate::game::Game;
use crate::input::{Direction, KeySample};
use crate::session::{GameState, SessionView};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Intent {
    AdvanceCorrect,
    AdvanceSkip,
}

/// Everything a sample depends on. A sample only acts when this changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Observation {
    motion: Direction,
    key_seq: u64,
    state: GameState,
    action_in_progress: bool,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    /// Index at which a correct was last signaled; blocks re-signaling the
    /// same item while its confirmation is pending.
    correct_latch: Option<usize>,
    last_key_seq: u64,
    last_seen: Option<Observation>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correct_latched(&self) -> bool {
        self.correct_latch.is_some()
    }

    /// Decides the intent for this instant without touching the session.
    ///
    /// Motion wins when it is not neutral. A key press counts once, however
    /// many samples it stays visible for.
    pub fn sample(
        &mut self,
        motion: Direction,
        keyboard: KeySample,
        view: &SessionView<'_>,
    ) -> Option<Intent> {
        if self
            .correct_latch
            .is_some_and(|idx| idx != view.current_index || view.state != GameState::Playing)
        {
            self.correct_latch = None;
        }

        let observation = Observation {
            motion,
            key_seq: keyboard.seq,
            state: view.state,
            action_in_progress: view.action_in_progress,
        };
        if self.last_seen == Some(observation) {
            return None;
        }
        self.last_seen = Some(observation);

        let fresh_key = keyboard.seq != self.last_key_seq;
        self.last_key_seq = keyboard.seq;

        if !view.accepts_advance() {
            return None;
        }

        let key_direction = if fresh_key {
            keyboard.direction
        } else {
            Direction::Neutral
        };
        let direction = if motion != Direction::Neutral {
            motion
        } else {
            key_direction
        };

        match direction {
            Direction::Up if self.correct_latch.is_none() => {
                self.correct_latch = Some(view.current_index);
                Some(Intent::AdvanceCorrect)
            }
            Direction::Up => None,
            Direction::Down => Some(Intent::AdvanceSkip),
            Direction::Neutral => None,
        }
    }

    /// Samples and forwards the intent to the session's commands.
    pub fn pump(
        &mut self,
        motion: Direction,
        keyboard: KeySample,
        game: &mut Game,
    ) -> Option<Intent> {
        let intent = self.sample(motion, keyboard, &game.view())?;
        debug!(%intent, %motion, key = %keyboard.direction, "gesture");
        match intent {
            Intent::AdvanceCorrect => game.mark_correct(),
            Intent::AdvanceSkip => game.mark_skipped(),
        }
        Some(intent)
    }
}

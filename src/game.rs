use std::fmt;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::session::{GameState, Score, SessionConfig, SessionView};
use crate::timer::{Fired, TimerId, TimerKind, TimerQueue};

const SECOND: Duration = Duration::from_secs(1);

/// Receives the final tally once per session.
pub type FinishListener = Box<dyn FnMut(Score)>;

/// A correct answer accepted but not yet committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingConfirm {
    timer: TimerId,
}

/// One game of heads-up: the item sequence, countdown, clock and tally.
///
/// All mutation goes through the command methods and [`Game::tick`]; the
/// caller owns the instance and feeds it elapsed time from its event loop.
pub struct Game {
    config: SessionConfig,
    items: Vec<String>,
    current_index: usize,
    state: GameState,
    time_remaining: u32,
    countdown: u32,
    score: Score,
    pending: Option<PendingConfirm>,
    countdown_timer: Option<TimerId>,
    clock_timer: Option<TimerId>,
    timers: TimerQueue,
    finish_reported: bool,
    on_finish: Option<FinishListener>,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("state", &self.state)
            .field("current_index", &self.current_index)
            .field("items", &self.items.len())
            .field("time_remaining", &self.time_remaining)
            .field("countdown", &self.countdown)
            .field("score", &self.score)
            .field("pending", &self.pending)
            .finish()
    }
}

impl Game {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            items: vec![],
            current_index: 0,
            state: GameState::Idle,
            time_remaining: config.time_limit_secs(),
            countdown: config.countdown_secs,
            score: Score::default(),
            pending: None,
            countdown_timer: None,
            clock_timer: None,
            timers: TimerQueue::new(),
            finish_reported: false,
            on_finish: None,
        }
    }

    /// Registers the listener that receives the final score of every session.
    pub fn on_finish(&mut self, listener: impl FnMut(Score) + 'static) {
        self.on_finish = Some(Box::new(listener));
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn action_in_progress(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clock_running(&self) -> bool {
        self.clock_timer.is_some_and(|id| self.timers.is_scheduled(id))
    }

    pub fn current_item(&self) -> Option<&str> {
        match self.state {
            GameState::Playing => self.items.get(self.current_index).map(String::as_str),
            _ => None,
        }
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            state: self.state,
            time_left: self.time_remaining,
            time_limit: self.config.time_limit_secs(),
            current_item: self.current_item(),
            current_index: self.current_index,
            item_count: self.items.len(),
            score: self.score,
            action_in_progress: self.action_in_progress(),
            countdown: self.countdown,
        }
    }

    /// Loads `items` and starts a fresh session from any state.
    ///
    /// Every timer of the previous session is cancelled. An empty item list
    /// finishes immediately with a zero tally.
    pub fn start(&mut self, items: Vec<String>) {
        self.timers.cancel_all();
        self.items = items;
        self.current_index = 0;
        self.score = Score::default();
        self.pending = None;
        self.countdown_timer = None;
        self.clock_timer = None;
        self.time_remaining = self.config.time_limit_secs();
        self.countdown = self.config.countdown_secs;
        self.finish_reported = false;

        if self.items.is_empty() {
            info!("start with no items, finishing immediately");
            self.finish();
            return;
        }

        info!(
            items = self.items.len(),
            time_limit = self.config.time_limit_secs(),
            "session ready"
        );
        self.state = GameState::Ready;

        if self.countdown == 0 {
            self.begin_play();
        } else {
            let id = self.timers.schedule_repeating(TimerKind::Countdown, SECOND);
            self.countdown_timer = Some(id);
        }
    }

    /// Ends the countdown and starts the clock. Only valid while `Ready`.
    pub fn begin_play(&mut self) {
        if self.state != GameState::Ready {
            debug!(state = %self.state, "begin_play ignored");
            return;
        }

        if let Some(id) = self.countdown_timer.take() {
            self.timers.cancel(id);
        }
        self.countdown = 0;
        self.state = GameState::Playing;
        self.clock_timer = Some(self.timers.schedule_repeating(TimerKind::Clock, SECOND));
        debug!(first = ?self.current_item(), "playing");
    }

    /// Accepts a correct answer. The tally and index only move once the
    /// confirmation delay has elapsed.
    pub fn mark_correct(&mut self) {
        if !self.accepts_advance() {
            debug!(state = %self.state, pending = self.pending.is_some(), "mark_correct ignored");
            return;
        }

        let timer = self
            .timers
            .schedule_once(TimerKind::Confirm, self.config.confirm_delay);
        self.pending = Some(PendingConfirm { timer });
        debug!(index = self.current_index, "correct pending confirmation");
    }

    pub fn mark_skipped(&mut self) {
        if !self.accepts_advance() {
            debug!(state = %self.state, pending = self.pending.is_some(), "mark_skipped ignored");
            return;
        }

        self.score.skipped += 1;
        debug!(index = self.current_index, "skipped");
        self.advance();
    }

    /// Ends a running game early, keeping the tally as it stands.
    pub fn reset_game(&mut self) {
        if self.state != GameState::Playing {
            debug!(state = %self.state, "reset_game ignored");
            return;
        }
        info!("game ended early");
        self.finish();
    }

    /// Advances virtual time by `elapsed`, firing every timer that falls due.
    pub fn tick(&mut self, elapsed: Duration) {
        let until = self.timers.now() + elapsed;
        while let Some(fired) = self.timers.next_due(until) {
            self.on_timer(fired);
        }
        self.timers.settle(until);
    }

    fn accepts_advance(&self) -> bool {
        self.state == GameState::Playing && self.pending.is_none()
    }

    fn on_timer(&mut self, fired: Fired) {
        if fired.id.generation != self.timers.generation() {
            trace!(kind = %fired.kind, "stale timer from a previous session");
            return;
        }

        match (self.state, fired.kind) {
            (GameState::Ready, TimerKind::Countdown) => {
                self.countdown = self.countdown.saturating_sub(1);
                trace!(countdown = self.countdown, "countdown");
                if self.countdown == 0 {
                    self.begin_play();
                }
            }
            (GameState::Playing, TimerKind::Clock) => {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                trace!(time_remaining = self.time_remaining, "clock");
                if self.time_remaining == 0 {
                    info!("time is up");
                    self.finish();
                }
            }
            (GameState::Playing, TimerKind::Confirm)
                if self.pending.map(|p| p.timer) == Some(fired.id) =>
            {
                self.pending = None;
                self.score.correct += 1;
                debug!(index = self.current_index, "correct committed");
                self.advance();
            }
            (state, kind) => {
                trace!(%state, %kind, "timer ignored in current state");
            }
        }
    }

    fn advance(&mut self) {
        self.current_index = (self.current_index + 1).min(self.items.len());
        if self.current_index == self.items.len() {
            info!("all items played");
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.timers.cancel_all();
        self.pending = None;
        self.countdown_timer = None;
        self.clock_timer = None;
        self.state = GameState::Finished;

        if self.finish_reported {
            return;
        }
        self.finish_reported = true;
        info!(
            correct = self.score.correct,
            skipped = self.score.skipped,
            "session finished"
        );
        if let Some(listener) = self.on_finish.as_mut() {
            listener(self.score);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const CONFIRM: Duration = Duration::from_millis(500);

    fn items(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn game_with_log(time_limit: u32) -> (Game, Rc<RefCell<Vec<Score>>>) {
        let mut game = Game::new(SessionConfig::new(time_limit, 3, CONFIRM));
        let log = Rc::new(RefCell::new(vec![]));
        let sink = Rc::clone(&log);
        game.on_finish(move |score| sink.borrow_mut().push(score));
        (game, log)
    }

    fn playing(words: &[&str], time_limit: u32) -> (Game, Rc<RefCell<Vec<Score>>>) {
        let (mut game, log) = game_with_log(time_limit);
        game.start(items(words));
        game.tick(Duration::from_secs(3));
        assert_eq!(game.state(), GameState::Playing);
        (game, log)
    }

    fn assert_tally_invariant(game: &Game) {
        assert!(game.score().total() as usize <= game.current_index());
        assert!(game.current_index() <= game.items().len());
        if !game.action_in_progress() {
            assert_eq!(game.score().total() as usize, game.current_index());
        }
    }

    #[test]
    fn new_game_is_idle() {
        let game = Game::new(SessionConfig::default());
        assert_eq!(game.state(), GameState::Idle);
        assert_eq!(game.current_item(), None);
        assert_eq!(game.score(), Score::default());
    }

    #[test]
    fn full_scenario_cat_dog_fish() {
        let (mut game, log) = game_with_log(30);
        game.start(items(&["cat", "dog", "fish"]));
        assert_eq!(game.state(), GameState::Ready);
        assert_eq!(game.countdown(), 3);

        game.tick(Duration::from_secs(3));
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.current_item(), Some("cat"));

        game.mark_skipped();
        assert_eq!(game.current_item(), Some("dog"));
        assert_eq!(game.score(), Score { correct: 0, skipped: 1 });

        game.mark_correct();
        assert_eq!(game.current_item(), Some("dog"));
        game.tick(CONFIRM);
        assert_eq!(game.current_item(), Some("fish"));
        assert_eq!(game.score(), Score { correct: 1, skipped: 1 });

        game.mark_correct();
        game.tick(CONFIRM);
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), Score { correct: 2, skipped: 1 });
        assert_eq!(*log.borrow(), vec![Score { correct: 2, skipped: 1 }]);
    }

    #[test]
    fn countdown_decrements_once_per_second_not_per_tick() {
        let (mut game, _) = game_with_log(30);
        game.start(items(&["a"]));

        for _ in 0..9 {
            game.tick(Duration::from_millis(100));
        }
        assert_eq!(game.countdown(), 3);
        game.tick(Duration::from_millis(100));
        assert_eq!(game.countdown(), 2);
        assert_eq!(game.state(), GameState::Ready);
    }

    #[test]
    fn clock_is_monotonic_and_reaches_exactly_zero() {
        let (mut game, log) = playing(&["a", "b", "c"], 5);
        let mut last = game.time_remaining();
        assert_eq!(last, 5);

        for _ in 0..70 {
            game.tick(Duration::from_millis(100));
            let now = game.time_remaining();
            assert!(now <= last);
            last = now;
        }
        assert_eq!(game.time_remaining(), 0);
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn double_correct_within_delay_counts_once() {
        let (mut game, _) = playing(&["a", "b", "c"], 30);
        game.mark_correct();
        game.tick(Duration::from_millis(200));
        game.mark_correct();
        game.tick(Duration::from_millis(300));

        assert_eq!(game.score().correct, 1);
        assert_eq!(game.current_index(), 1);
        assert!(!game.action_in_progress());
        assert_tally_invariant(&game);
    }

    #[test]
    fn skip_while_confirming_is_ignored() {
        let (mut game, _) = playing(&["a", "b", "c"], 30);
        game.mark_correct();
        assert!(game.action_in_progress());

        game.mark_skipped();
        assert_eq!(game.score(), Score::default());
        assert_eq!(game.current_index(), 0);

        game.tick(CONFIRM);
        assert_eq!(game.score(), Score { correct: 1, skipped: 0 });
    }

    #[test]
    fn time_out_with_item_left_freezes_tally() {
        let (mut game, log) = playing(&["a", "b"], 2);
        game.mark_skipped();
        game.tick(Duration::from_secs(2));

        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), Score { correct: 0, skipped: 1 });

        game.mark_skipped();
        game.mark_correct();
        game.tick(Duration::from_secs(5));
        assert_eq!(game.score(), Score { correct: 0, skipped: 1 });
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn clock_expiry_wins_over_confirmation_at_same_instant() {
        let (mut game, log) = playing(&["a", "b"], 1);
        game.tick(Duration::from_millis(500));
        game.mark_correct();
        // Clock hits zero and the confirmation falls due at t = 1s.
        game.tick(Duration::from_millis(500));

        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), Score::default());
        assert_eq!(*log.borrow(), vec![Score::default()]);
    }

    #[test]
    fn reset_game_freezes_and_is_idempotent() {
        let (mut game, log) = playing(&["a", "b", "c"], 30);
        game.mark_skipped();
        game.mark_correct();
        game.reset_game();

        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), Score { correct: 0, skipped: 1 });
        assert!(!game.action_in_progress());
        assert!(!game.clock_running());

        game.reset_game();
        game.tick(Duration::from_secs(10));
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), Score { correct: 0, skipped: 1 });
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn reset_game_outside_playing_is_ignored() {
        let (mut game, log) = game_with_log(30);
        game.reset_game();
        assert_eq!(game.state(), GameState::Idle);

        game.start(items(&["a"]));
        game.reset_game();
        assert_eq!(game.state(), GameState::Ready);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn empty_start_finishes_with_zero_score() {
        let (mut game, log) = game_with_log(30);
        game.start(vec![]);

        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.score(), Score::default());
        assert_eq!(*log.borrow(), vec![Score::default()]);
    }

    #[test]
    fn commands_outside_playing_are_noops() {
        let (mut game, _) = game_with_log(30);
        game.mark_correct();
        game.mark_skipped();
        game.begin_play();
        assert_eq!(game.state(), GameState::Idle);

        game.start(items(&["a", "b"]));
        game.mark_correct();
        game.mark_skipped();
        assert_eq!(game.score(), Score::default());
        assert!(!game.action_in_progress());
    }

    #[test]
    fn begin_play_skips_remaining_countdown() {
        let (mut game, _) = game_with_log(30);
        game.start(items(&["a", "b"]));
        game.begin_play();

        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.countdown(), 0);
        assert!(game.clock_running());
        // The countdown timer must not tick the clock or re-enter play.
        game.tick(Duration::from_secs(1));
        assert_eq!(game.time_remaining(), 29);
    }

    #[test]
    fn zero_countdown_starts_playing_immediately() {
        let mut game = Game::new(SessionConfig::new(10, 0, CONFIRM));
        game.start(items(&["a"]));
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.current_item(), Some("a"));
    }

    #[test]
    fn restart_cancels_previous_timers() {
        let (mut game, log) = playing(&["a", "b", "c"], 30);
        game.mark_correct();
        game.tick(Duration::from_millis(2500));
        assert_eq!(game.time_remaining(), 28);

        game.start(items(&["x", "y"]));
        assert_eq!(game.state(), GameState::Ready);
        assert_eq!(game.score(), Score::default());
        assert_eq!(game.time_remaining(), 30);

        game.tick(Duration::from_secs(3));
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.current_item(), Some("x"));
        assert_eq!(game.time_remaining(), 30);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn finish_reported_once_per_session() {
        let (mut game, log) = playing(&["a"], 30);
        game.mark_skipped();
        assert_eq!(game.state(), GameState::Finished);

        game.start(items(&["b"]));
        game.tick(Duration::from_secs(3));
        game.reset_game();

        assert_eq!(
            *log.borrow(),
            vec![
                Score { correct: 0, skipped: 1 },
                Score { correct: 0, skipped: 0 }
            ]
        );
    }

    #[test]
    fn invariants_hold_through_mixed_play() {
        let words: Vec<String> = (0..20).map(|i| format!("w{i}")).collect();
        let (mut game, _) = game_with_log(60);
        game.start(words);
        game.tick(Duration::from_secs(3));

        for step in 0..200u32 {
            match step % 5 {
                0 | 3 => game.mark_correct(),
                1 => game.mark_skipped(),
                _ => {}
            }
            game.tick(Duration::from_millis(120));
            assert_tally_invariant(&game);
            if game.state() == GameState::Finished {
                break;
            }
        }
        assert_eq!(game.state(), GameState::Finished);
        assert_eq!(game.current_index(), 20);
    }
}

//! Virtual-time timer queue driven by the event loop.
//!
//! The queue never reads the wall clock. The owner feeds it elapsed time and
//! pulls due timers one at a time, so a long gap between loop steps still
//! fires a repeating timer once per period, in order.

use std::time::Duration;

/// What a timer drives. Declaration order is the firing precedence for
/// timers that fall due at the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display)]
pub enum TimerKind {
    Clock,
    Countdown,
    Confirm,
}

/// Handle for a scheduled timer. The generation ties it to one run of the
/// owner; anything scheduled before the last `cancel_all` is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub generation: u64,
    seq: u64,
}

/// A timer that fell due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub kind: TimerKind,
    pub at: Duration,
}

#[derive(Clone, Debug)]
struct Scheduled {
    id: TimerId,
    kind: TimerKind,
    due: Duration,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    generation: u64,
    next_seq: u64,
    scheduled: Vec<Scheduled>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.scheduled.iter().any(|s| s.id == id)
    }

    pub fn schedule_once(&mut self, kind: TimerKind, delay: Duration) -> TimerId {
        self.push(kind, delay, None)
    }

    /// Schedules a timer that first fires after `period` and then every
    /// `period` until cancelled. A zero period is treated as one millisecond.
    pub fn schedule_repeating(&mut self, kind: TimerKind, period: Duration) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.push(kind, period, Some(period))
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.scheduled.retain(|s| s.id != id);
    }

    /// Drops every timer and starts a new generation.
    pub fn cancel_all(&mut self) {
        self.scheduled.clear();
        self.generation += 1;
    }

    /// Pops the earliest timer due at or before `until`, moving virtual time
    /// to its due instant. Repeating timers are rescheduled one period later.
    pub fn next_due(&mut self, until: Duration) -> Option<Fired> {
        let pos = self
            .scheduled
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due <= until)
            .min_by_key(|(_, s)| (s.due, s.kind, s.id.seq))
            .map(|(pos, _)| pos)?;

        let timer = self.scheduled.swap_remove(pos);
        self.now = self.now.max(timer.due);

        if let Some(period) = timer.period {
            self.scheduled.push(Scheduled {
                due: timer.due + period,
                ..timer.clone()
            });
        }

        Some(Fired {
            id: timer.id,
            kind: timer.kind,
            at: timer.due,
        })
    }

    /// Moves virtual time forward to `until` once every due timer is drained.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    fn push(&mut self, kind: TimerKind, delay: Duration, period: Option<Duration>) -> TimerId {
        let id = TimerId {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.scheduled.push(Scheduled {
            id,
            kind,
            due: self.now + delay,
            period,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut TimerQueue, until: Duration) -> Vec<Fired> {
        let mut fired = vec![];
        while let Some(f) = queue.next_due(until) {
            fired.push(f);
        }
        queue.settle(until);
        fired
    }

    #[test]
    fn once_timer_fires_after_delay() {
        let mut q = TimerQueue::new();
        let id = q.schedule_once(TimerKind::Confirm, Duration::from_millis(500));

        assert!(drain(&mut q, Duration::from_millis(499)).is_empty());
        let fired = drain(&mut q, Duration::from_millis(500));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);
        assert_eq!(fired[0].kind, TimerKind::Confirm);
        assert!(q.is_empty());
    }

    #[test]
    fn repeating_timer_fires_once_per_period_across_a_gap() {
        let mut q = TimerQueue::new();
        q.schedule_repeating(TimerKind::Clock, Duration::from_secs(1));

        let fired = drain(&mut q, Duration::from_millis(3500));
        assert_eq!(fired.len(), 3);
        assert_eq!(
            fired.iter().map(|f| f.at.as_secs()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(q.now(), Duration::from_millis(3500));
    }

    #[test]
    fn same_instant_fires_in_kind_order() {
        let mut q = TimerQueue::new();
        q.schedule_once(TimerKind::Confirm, Duration::from_secs(1));
        q.schedule_repeating(TimerKind::Clock, Duration::from_secs(1));

        let fired = drain(&mut q, Duration::from_secs(1));
        assert_eq!(fired[0].kind, TimerKind::Clock);
        assert_eq!(fired[1].kind, TimerKind::Confirm);
    }

    #[test]
    fn cancel_all_bumps_generation() {
        let mut q = TimerQueue::new();
        let id = q.schedule_repeating(TimerKind::Countdown, Duration::from_secs(1));
        q.cancel_all();

        assert!(!q.is_scheduled(id));
        assert_ne!(id.generation, q.generation());
        assert!(drain(&mut q, Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn cancel_single_timer() {
        let mut q = TimerQueue::new();
        let a = q.schedule_once(TimerKind::Confirm, Duration::from_millis(10));
        let b = q.schedule_repeating(TimerKind::Clock, Duration::from_millis(10));
        q.cancel(a);

        assert!(!q.is_scheduled(a));
        assert!(q.is_scheduled(b));
    }
}

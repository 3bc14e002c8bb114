use tokio::time::Instant;

/// The named timers a session ever owns. Keeping the set closed makes every
/// pending callback auditable from the loop state alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Debounced scroll-to-bottom after content mutations.
    ScrollFlush,
    /// Releases the programmatic-scroll re-entrancy guard.
    ScrollGuardRelease,
    /// Next aligned beat of the wall clock.
    ClockTick,
}

const TIMER_KINDS: [TimerKind; 3] = [
    TimerKind::ScrollFlush,
    TimerKind::ScrollGuardRelease,
    TimerKind::ClockTick,
];

/// Owned set of scoped timer deadlines. Setting a slot supersedes its
/// previous deadline; clearing it cancels the pending callback outright.
#[derive(Debug, Default)]
pub struct TimerSet {
    scroll_flush: Option<Instant>,
    guard_release: Option<Instant>,
    clock_tick: Option<Instant>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: TimerKind, at: Instant) {
        *self.slot_mut(kind) = Some(at);
    }

    pub fn clear(&mut self, kind: TimerKind) {
        *self.slot_mut(kind) = None;
    }

    pub fn clear_all(&mut self) {
        for kind in TIMER_KINDS {
            self.clear(kind);
        }
    }

    pub fn get(&self, kind: TimerKind) -> Option<Instant> {
        self.slot(kind)
    }

    /// The earliest pending deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        TIMER_KINDS
            .into_iter()
            .filter_map(|kind| self.slot(kind))
            .min()
    }

    /// Removes and returns every timer due at `now`, in declaration order.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due = Vec::new();
        for kind in TIMER_KINDS {
            if matches!(self.slot(kind), Some(at) if at <= now) {
                self.clear(kind);
                due.push(kind);
            }
        }
        due
    }

    fn slot(&self, kind: TimerKind) -> Option<Instant> {
        match kind {
            TimerKind::ScrollFlush => self.scroll_flush,
            TimerKind::ScrollGuardRelease => self.guard_release,
            TimerKind::ClockTick => self.clock_tick,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<Instant> {
        match kind {
            TimerKind::ScrollFlush => &mut self.scroll_flush,
            TimerKind::ScrollGuardRelease => &mut self.guard_release,
            TimerKind::ClockTick => &mut self.clock_tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_set_supersedes_and_clear_cancels() {
        let mut timers = TimerSet::new();
        let base = Instant::now();
        assert_eq!(timers.next_deadline(), None);

        timers.set(TimerKind::ScrollFlush, base + Duration::from_millis(100));
        timers.set(TimerKind::ScrollFlush, base + Duration::from_millis(200));
        assert_eq!(
            timers.get(TimerKind::ScrollFlush),
            Some(base + Duration::from_millis(200))
        );

        timers.clear(TimerKind::ScrollFlush);
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn test_next_deadline_is_the_minimum_across_slots() {
        let mut timers = TimerSet::new();
        let base = Instant::now();
        timers.set(TimerKind::ClockTick, base + Duration::from_millis(500));
        timers.set(TimerKind::ScrollFlush, base + Duration::from_millis(100));
        assert_eq!(timers.next_deadline(), Some(base + Duration::from_millis(100)));
    }

    #[test]
    fn test_take_due_drains_only_elapsed_slots() {
        let mut timers = TimerSet::new();
        let base = Instant::now();
        timers.set(TimerKind::ScrollFlush, base);
        timers.set(TimerKind::ClockTick, base + Duration::from_secs(10));

        let due = timers.take_due(base + Duration::from_millis(1));
        assert_eq!(due, vec![TimerKind::ScrollFlush]);
        assert_eq!(timers.get(TimerKind::ScrollFlush), None);
        assert!(timers.get(TimerKind::ClockTick).is_some());
    }
}

//! Time abstraction and timing helpers.

/// Trait for abstracting millisecond clock sources.
///
/// The clock must be monotonic but is allowed to wrap around at `u32::MAX`
/// (as Arduino-style `millis()` counters do). All elapsed-time math in this
/// crate tolerates a single wraparound.
pub trait Clock {
    /// Returns the current time in milliseconds.
    fn now_millis(&self) -> u32;
}

/// Milliseconds elapsed between `last` and `current`, tolerating one clock
/// rollover (`current < last`).
pub(crate) fn elapsed_millis(current: u32, last: u32) -> u32 {
    if current < last {
        (u32::MAX - last) + current
    } else {
        current - last
    }
}

/// State of an [`ElapseTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerState {
    /// Not armed. `has_elapsed` is always false.
    Stopped,
    /// Counting down toward the armed duration.
    Running,
    /// Halted with the remaining time retained for [`ElapseTimer::resume`].
    Paused,
}

/// A one-shot countdown timer over a borrowed [`Clock`].
///
/// Used by the sequence player to measure the delay before each step. The
/// timer never blocks; callers poll [`ElapseTimer::has_elapsed`].
#[derive(Debug)]
pub struct ElapseTimer<'t, C: Clock> {
    clock: &'t C,
    state: TimerState,
    duration_ms: u32,
    start_time: u32,
}

impl<'t, C: Clock> ElapseTimer<'t, C> {
    /// Creates a stopped timer.
    pub fn new(clock: &'t C) -> Self {
        Self {
            clock,
            state: TimerState::Stopped,
            duration_ms: 0,
            start_time: 0,
        }
    }

    /// Arms the timer for `duration_ms` from now.
    pub fn start(&mut self, duration_ms: u32) {
        self.duration_ms = duration_ms;
        self.start_time = self.clock.now_millis();
        self.state = TimerState::Running;
    }

    /// Stops the timer, discarding any remaining time.
    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
    }

    /// Pauses a running timer, retaining the remaining time.
    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            let elapsed = elapsed_millis(self.clock.now_millis(), self.start_time);
            self.duration_ms = self.duration_ms.saturating_sub(elapsed);
            self.state = TimerState::Paused;
        }
    }

    /// Resumes a paused timer with its remaining time. Returns false if the
    /// timer was not paused.
    pub fn resume(&mut self) -> bool {
        if self.state != TimerState::Paused {
            return false;
        }
        self.start_time = self.clock.now_millis();
        self.state = TimerState::Running;
        true
    }

    /// Returns true if the timer is counting down.
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Returns true if the timer is paused.
    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    /// Returns true if the timer is running and its duration has elapsed.
    pub fn has_elapsed(&self) -> bool {
        self.state == TimerState::Running
            && elapsed_millis(self.clock.now_millis(), self.start_time) >= self.duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct TestClock {
        now: Cell<u32>,
    }

    impl TestClock {
        fn new(start: u32) -> Self {
            Self { now: Cell::new(start) }
        }

        fn advance(&self, ms: u32) {
            self.now.set(self.now.get().wrapping_add(ms));
        }
    }

    impl Clock for TestClock {
        fn now_millis(&self) -> u32 {
            self.now.get()
        }
    }

    #[test]
    fn elapsed_is_simple_difference_without_rollover() {
        assert_eq!(elapsed_millis(1500, 1000), 500);
        assert_eq!(elapsed_millis(1000, 1000), 0);
    }

    #[test]
    fn elapsed_tolerates_clock_rollover() {
        // Clock wrapped: 10 ms to the wrap point plus 40 ms past it.
        assert_eq!(elapsed_millis(40, u32::MAX - 10), 50);
    }

    #[test]
    fn timer_elapses_after_duration() {
        let clock = TestClock::new(0);
        let mut timer = ElapseTimer::new(&clock);

        timer.start(100);
        assert!(timer.is_running());
        assert!(!timer.has_elapsed());

        clock.advance(99);
        assert!(!timer.has_elapsed());

        clock.advance(1);
        assert!(timer.has_elapsed());
    }

    #[test]
    fn stopped_timer_never_elapses() {
        let clock = TestClock::new(0);
        let mut timer = ElapseTimer::new(&clock);

        timer.start(50);
        timer.stop();
        clock.advance(1000);
        assert!(!timer.has_elapsed());
        assert!(!timer.is_running());
    }

    #[test]
    fn pause_retains_remaining_time() {
        let clock = TestClock::new(0);
        let mut timer = ElapseTimer::new(&clock);

        timer.start(100);
        clock.advance(60);
        timer.pause();
        assert!(timer.is_paused());

        // Time spent paused must not count.
        clock.advance(500);
        assert!(timer.resume());
        assert!(!timer.has_elapsed());

        clock.advance(40);
        assert!(timer.has_elapsed());
    }

    #[test]
    fn resume_fails_unless_paused() {
        let clock = TestClock::new(0);
        let mut timer = ElapseTimer::new(&clock);

        assert!(!timer.resume());
        timer.start(10);
        assert!(!timer.resume());
    }

    #[test]
    fn timer_elapses_across_rollover() {
        let clock = TestClock::new(u32::MAX - 20);
        let mut timer = ElapseTimer::new(&clock);

        timer.start(50);
        clock.advance(30); // wraps past u32::MAX
        assert!(!timer.has_elapsed());
        clock.advance(25);
        assert!(timer.has_elapsed());
    }
}

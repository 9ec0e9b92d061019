//! Sequence playback bookkeeping.
//!
//! The player is a controller-internal helper: it tracks a cursor into an
//! attached [`LedSequence`], arms a countdown timer for each step's delay,
//! and handles the nested repeat accounting (player repeats x sequence
//! repeats). The controller polls it from `update_now` and applies the mode
//! of the current step whenever its delay has elapsed.

use crate::sequence::LedSequence;
use crate::time::{Clock, ElapseTimer};
use crate::LedMode;

pub(crate) struct SequencePlayer<'a, C: Clock, const N: usize> {
    sequence: Option<&'a LedSequence<N>>,
    cursor: usize,
    delay_timer: ElapseTimer<'a, C>,
    repeat_count: u8,
    current_iteration: u16,
}

impl<'a, C: Clock, const N: usize> SequencePlayer<'a, C, N> {
    pub(crate) fn new(clock: &'a C) -> Self {
        Self {
            sequence: None,
            cursor: 0,
            delay_timer: ElapseTimer::new(clock),
            repeat_count: 1,
            current_iteration: 0,
        }
    }

    /// Attaches a sequence, replacing and detaching any previous one.
    /// The cursor moves to the first step; no timer is started yet.
    pub(crate) fn attach_sequence(&mut self, sequence: &'a LedSequence<N>) {
        self.detach_sequence();
        sequence.attach_player();
        self.sequence = Some(sequence);
        self.cursor = 0;
    }

    /// Releases the attached sequence, if any, and stops playback.
    pub(crate) fn detach_sequence(&mut self) {
        if let Some(sequence) = self.sequence.take() {
            sequence.detach_player();
        }
        self.delay_timer.stop();
        self.cursor = 0;
        self.current_iteration = 0;
    }

    /// Player-level repeat count; 0 means play forever.
    pub(crate) fn set_repeat_count(&mut self, repeat_count: u8) {
        self.repeat_count = repeat_count;
    }

    pub(crate) fn repeat_count(&self) -> u8 {
        self.repeat_count
    }

    /// Arms the timer for the first step's delay. Fails on an empty or
    /// missing sequence.
    pub(crate) fn start_first_step(&mut self) -> bool {
        let Some(step) = self.sequence.and_then(|s| s.get_step(0)) else {
            return false;
        };
        self.cursor = 0;
        self.current_iteration = 1;
        self.delay_timer.start(step.delay_ms);
        true
    }

    /// Moves the cursor to the next step and re-arms the timer, wrapping to
    /// the first step while iterations remain. Returns false once the
    /// iteration budget is exhausted (player stopped).
    pub(crate) fn advance_one_step(&mut self) -> bool {
        let Some(sequence) = self.sequence else {
            return false;
        };

        if self.cursor + 1 < sequence.step_count() {
            self.cursor += 1;
            // Cursor stays in bounds, so the step exists.
            if let Some(step) = sequence.get_step(self.cursor) {
                self.delay_timer.start(step.delay_ms);
                return true;
            }
            return false;
        }

        if self.has_more_iterations() {
            if let Some(step) = sequence.get_step(0) {
                self.cursor = 0;
                self.current_iteration += 1;
                self.delay_timer.start(step.delay_ms);
                return true;
            }
        }

        self.delay_timer.stop();
        false
    }

    /// Pauses the step timer so playback can resume later.
    pub(crate) fn pause(&mut self) {
        self.delay_timer.pause();
    }

    /// Resumes a paused step timer.
    pub(crate) fn resume(&mut self) -> bool {
        self.delay_timer.resume()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.delay_timer.is_running()
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.delay_timer.is_paused()
    }

    /// True if the current step's delay has elapsed while the timer runs.
    /// At the final step of the final iteration the timer is also stopped,
    /// so a caller that never advances cannot observe a stale countdown.
    pub(crate) fn step_delay_is_done(&mut self) -> bool {
        if !self.delay_timer.has_elapsed() {
            return false;
        }
        if self.at_end_of_sequence() && !self.has_more_iterations() {
            self.delay_timer.stop();
        }
        true
    }

    /// Mode recorded at the cursor's current step.
    pub(crate) fn current_step_mode(&self) -> Option<LedMode> {
        self.sequence
            .and_then(|s| s.get_step(self.cursor))
            .map(|step| step.mode)
    }

    fn at_end_of_sequence(&self) -> bool {
        match self.sequence {
            Some(sequence) => self.cursor + 1 >= sequence.step_count(),
            None => true,
        }
    }

    /// Iterations remaining under `player_repeat x sequence_repeat`, where a
    /// product of 0 means repeat forever.
    fn has_more_iterations(&self) -> bool {
        let sequence_repeat = self.sequence.map_or(0, LedSequence::repeat_count);
        let effective = u16::from(self.repeat_count) * u16::from(sequence_repeat);
        effective == 0 || self.current_iteration < effective
    }
}

impl<C: Clock, const N: usize> Drop for SequencePlayer<'_, C, N> {
    fn drop(&mut self) {
        self.detach_sequence();
    }
}

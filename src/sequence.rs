//! Predefined timed sequences of LED mode changes.

use crate::mode::LedMode;
use core::cell::Cell;
use heapless::Vec;

/// A single step in an LED sequence: wait, then apply a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequenceStep {
    /// Delay before this step's mode is applied.
    pub delay_ms: u32,

    /// Mode to apply when the delay elapses.
    pub mode: LedMode,
}

/// Sequence mutation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceError {
    /// Sequence capacity exceeded.
    CapacityExceeded,

    /// Sequence is attached to a player and the discard was not forced.
    StillAttached,
}

impl core::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SequenceError::CapacityExceeded => {
                write!(f, "sequence capacity exceeded")
            }
            SequenceError::StillAttached => {
                write!(f, "sequence is attached to a player; discard requires force")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequenceError {}

/// An ordered, repeatable list of timed mode steps.
///
/// Steps play in insertion order. A repeat count of 0 means repeat forever.
/// While a sequence is attached to a controller's player its step list is
/// guarded against discard; a forced discard overrides the guard, leaving any
/// attached player to notice the empty sequence on its next advance.
///
/// # Type Parameters
/// * `N` - Maximum number of steps this sequence can hold
#[derive(Debug)]
pub struct LedSequence<const N: usize> {
    steps: Vec<SequenceStep, N>,
    repeat_count: u8,
    attach_count: Cell<u8>,
}

impl<const N: usize> LedSequence<N> {
    /// Creates an empty sequence that plays once.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            repeat_count: 1,
            attach_count: Cell::new(0),
        }
    }

    /// Appends a step to the end of the sequence.
    ///
    /// # Errors
    /// * `CapacityExceeded` - The sequence already holds `N` steps.
    pub fn add_step(&mut self, delay_ms: u32, mode: LedMode) -> Result<(), SequenceError> {
        self.steps
            .push(SequenceStep { delay_ms, mode })
            .map_err(|_| SequenceError::CapacityExceeded)
    }

    /// Clears all steps.
    ///
    /// # Errors
    /// * `StillAttached` - The sequence is attached to a player and `force`
    ///   was not set.
    pub fn discard_all(&mut self, force: bool) -> Result<(), SequenceError> {
        if self.attach_count.get() > 0 && !force {
            return Err(SequenceError::StillAttached);
        }
        self.steps.clear();
        Ok(())
    }

    /// Sets how many times the sequence repeats per play-through.
    /// 0 means repeat forever.
    pub fn set_repeat_count(&mut self, repeat_count: u8) {
        self.repeat_count = repeat_count;
    }

    /// The sequence-level repeat count (0 = forever).
    pub fn repeat_count(&self) -> u8 {
        self.repeat_count
    }

    /// Number of players currently attached.
    pub fn attach_count(&self) -> u8 {
        self.attach_count.get()
    }

    /// Number of steps in the sequence.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the sequence has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the step at `index`, if any.
    pub fn get_step(&self, index: usize) -> Option<&SequenceStep> {
        self.steps.get(index)
    }

    pub(crate) fn attach_player(&self) {
        self.attach_count.set(self.attach_count.get().saturating_add(1));
    }

    pub(crate) fn detach_player(&self) {
        self.attach_count.set(self.attach_count.get().saturating_sub(1));
    }
}

impl<const N: usize> Default for LedSequence<N> {
    fn default() -> Self {
        Self::new()
    }
}

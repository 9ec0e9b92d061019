//! Shared test infrastructure for led-controller integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use core::cell::Cell;
use led_controller::{Clock, LedOutput};

// ============================================================================
// Mock Clock
// ============================================================================

/// Mock millisecond clock with controllable time advancement.
pub struct MockClock {
    now: Cell<u32>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(start: u32) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Advance time by the given number of milliseconds, wrapping at
    /// `u32::MAX` like an embedded millis counter.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u32 {
        self.now.get()
    }
}

// ============================================================================
// Mock Outputs
// ============================================================================

/// What the controller last wrote to the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDrive {
    Low,
    High,
    Intensity(u8),
}

/// Mock output that records pin drives into caller-owned cells, so tests can
/// observe writes while the controller owns the output.
pub struct RecordingLed<'p> {
    last_drive: &'p Cell<Option<PinDrive>>,
    write_count: &'p Cell<u32>,
}

impl<'p> RecordingLed<'p> {
    pub fn new(last_drive: &'p Cell<Option<PinDrive>>, write_count: &'p Cell<u32>) -> Self {
        Self {
            last_drive,
            write_count,
        }
    }
}

impl LedOutput for RecordingLed<'_> {
    fn write_digital(&mut self, high: bool) {
        self.last_drive.set(Some(if high {
            PinDrive::High
        } else {
            PinDrive::Low
        }));
        self.write_count.set(self.write_count.get() + 1);
    }

    fn write_intensity(&mut self, level: u8) {
        self.last_drive.set(Some(PinDrive::Intensity(level)));
        self.write_count.set(self.write_count.get() + 1);
    }
}

/// Output for tests that only observe the controller's own state.
pub struct NullLed;

impl LedOutput for NullLed {
    fn write_digital(&mut self, _high: bool) {}
    fn write_intensity(&mut self, _level: u8) {}
}

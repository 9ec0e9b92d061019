//! Integration tests for sequence playback through LedController

mod common;
use common::*;

use led_controller::{ControllerConfig, LedController, LedMode, LedSequence};

type TestController<'a> = LedController<'a, MockClock, NullLed, 8>;

// Sequences are declared before the controller throughout: the controller's
// player keeps a borrow of the installed sequence until the controller is
// dropped.
fn make_controller(clock: &MockClock) -> TestController<'_> {
    LedController::new(NullLed, clock, ControllerConfig::default())
}

#[test]
fn start_fails_without_a_sequence() {
    let clock = MockClock::new();
    let sequence = LedSequence::new();
    let mut controller = make_controller(&clock);

    assert!(!controller.start_sequence());

    controller.install_sequence(&sequence);
    assert!(!controller.start_sequence());
    assert!(!controller.is_playing_sequence());
}

#[test]
fn sequence_steps_apply_their_modes_after_each_delay() {
    let clock = MockClock::new();
    let mut sequence = LedSequence::new();
    sequence.add_step(0, LedMode::On).unwrap();
    sequence.add_step(100, LedMode::Off).unwrap();

    let mut controller = make_controller(&clock);
    controller.install_sequence(&sequence);

    assert!(!controller.is_playing_sequence());
    assert!(controller.start_sequence());
    assert!(controller.is_playing_sequence());

    // First step has no delay: the first poll applies it.
    assert!(controller.update_now());
    assert_eq!(controller.current_mode(), LedMode::On);

    // Second step is gated by its delay.
    assert!(!controller.update_now());
    assert_eq!(controller.current_mode(), LedMode::On);

    clock.advance(100);
    assert!(controller.update_now());
    assert_eq!(controller.current_mode(), LedMode::Off);

    // Single play-through: playback has stopped.
    assert!(!controller.is_playing_sequence());
    clock.advance(1000);
    assert!(!controller.update_now());
}

#[test]
fn nested_repeat_counts_multiply() {
    let clock = MockClock::new();
    let mut sequence = LedSequence::new();
    sequence.add_step(0, LedMode::On).unwrap();
    sequence.add_step(50, LedMode::Off).unwrap();
    sequence.set_repeat_count(2);

    let mut controller = make_controller(&clock);
    controller.install_sequence(&sequence);
    controller.set_sequence_repeat_count(3);
    assert_eq!(controller.sequence_repeat_count(), 3);
    assert!(controller.start_sequence());

    // 3 player repeats x 2 sequence repeats = 6 iterations of 2 steps. The
    // applied modes are steady, so every successful poll is a step
    // application.
    let mut applications = 0;
    for _ in 0..40 {
        if controller.update_now() {
            applications += 1;
        }
        clock.advance(50);
    }

    assert_eq!(applications, 12);
    assert!(!controller.is_playing_sequence());
}

#[test]
fn stop_and_restart_resume_the_pending_step() {
    let clock = MockClock::new();
    let mut sequence = LedSequence::new();
    sequence.add_step(100, LedMode::On).unwrap();
    sequence.add_step(100, LedMode::Off).unwrap();

    let mut controller = make_controller(&clock);
    controller.install_sequence(&sequence);
    assert!(controller.start_sequence());

    clock.advance(60);
    controller.stop_sequence();
    assert!(!controller.is_playing_sequence());

    // Time spent stopped must not count against the step delay.
    clock.advance(10_000);
    assert!(!controller.update_now());

    assert!(controller.start_sequence());
    assert!(controller.is_playing_sequence());
    assert!(!controller.update_now());

    clock.advance(40);
    assert!(controller.update_now());
    assert_eq!(controller.current_mode(), LedMode::On);
}

#[test]
fn playing_sequence_overrides_a_running_behavior() {
    let clock = MockClock::new();
    let mut sequence = LedSequence::new();
    sequence.add_step(0, LedMode::Off).unwrap();

    let mut controller = make_controller(&clock);
    controller.blink_max(0);
    controller.install_sequence(&sequence);
    assert!(controller.start_sequence());

    // The pending step wins over the due blink tick.
    clock.advance(501);
    assert!(controller.update_now());
    assert_eq!(controller.current_mode(), LedMode::Off);
    assert!(controller.is_steady());
}

#[test]
fn remove_sequence_releases_the_attachment() {
    let clock = MockClock::new();
    let mut sequence = LedSequence::new();
    sequence.add_step(100, LedMode::On).unwrap();

    let mut controller = make_controller(&clock);
    controller.install_sequence(&sequence);
    assert_eq!(sequence.attach_count(), 1);

    controller.remove_sequence();
    drop(controller);

    assert_eq!(sequence.attach_count(), 0);
    sequence.discard_all(false).unwrap();
    assert!(sequence.is_empty());
}

#[test]
fn dropping_controller_detaches_its_sequence() {
    let clock = MockClock::new();
    let mut sequence = LedSequence::new();
    sequence.add_step(100, LedMode::On).unwrap();

    {
        let mut controller = make_controller(&clock);
        controller.install_sequence(&sequence);
        assert_eq!(sequence.attach_count(), 1);
    }

    assert_eq!(sequence.attach_count(), 0);
}

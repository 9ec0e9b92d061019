//! LED behavior controller with mode resolution and timing control.
//!
//! Provides [`LedController`] which drives a single LED (or buzzer) through
//! the mode vocabulary of [`LedMode`], handling level arithmetic, phase
//! counting, timing coordination, and output updates. Also defines the
//! [`LedOutput`] trait for hardware abstraction.

use crate::level::{LEVEL_FP_BITS, Level, LevelRange};
use crate::mode::LedMode;
use crate::player::SequencePlayer;
use crate::sequence::LedSequence;
use crate::sync::{SyncHandshake, SyncWord};
use crate::time::{Clock, elapsed_millis};

/// Trait for abstracting the physical output.
///
/// Implement this for your LED hardware (GPIO, PWM timer channel, etc.).
/// Pin setup (direction, initial state) belongs in the implementor's
/// constructor. Handle any hardware errors internally - these methods
/// cannot fail.
pub trait LedOutput {
    /// Drives the output fully low or high.
    fn write_digital(&mut self, high: bool);

    /// Drives the output at a quantized intensity (0-255). Only called when
    /// the controller is configured as PWM-capable.
    fn write_intensity(&mut self, level: u8);
}

/// Errors reported by the fallible configuration setters.
///
/// Every setter leaves the controller in a valid configuration: a rejected
/// input is replaced by the nearest safe value and the substitution is
/// reported through the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Period below the 2 ms minimum; the minimum was substituted.
    PeriodTooShort,

    /// Refresh interval of zero; 1 ms was substituted.
    IntervalTooShort,

    /// Degenerate range request (`min >= max`); a minimal valid range was
    /// substituted.
    InvalidRange,

    /// Requested level outside the working range; clamped to the nearest
    /// bound.
    LevelOutOfRange,

    /// Intermediate level requested on a non-PWM output.
    PwmRequired,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::PeriodTooShort => {
                write!(f, "period below 2 ms; minimum substituted")
            }
            ConfigError::IntervalTooShort => {
                write!(f, "refresh interval of zero; 1 ms substituted")
            }
            ConfigError::InvalidRange => {
                write!(f, "degenerate level range; minimal valid range substituted")
            }
            ConfigError::LevelOutOfRange => {
                write!(f, "level outside working range; clamped")
            }
            ConfigError::PwmRequired => {
                write!(f, "intermediate levels need a PWM-capable output")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Construction-time configuration for a [`LedController`].
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// True if the output can be driven with quantized intensity.
    pub use_pwm: bool,

    /// True for active-low outputs (e.g. driving an LED cathode).
    pub invert: bool,

    /// Blink period in ms; one period is two phases.
    pub blink_period_ms: u32,

    /// Oscillation period in ms; one period is two phases.
    pub oscillate_period_ms: u32,

    /// Interval in ms between level updates during fades and oscillation.
    pub refresh_interval_ms: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            use_pwm: false,
            invert: false,
            blink_period_ms: 1000,
            oscillate_period_ms: 1000,
            refresh_interval_ms: 20,
        }
    }
}

/// Controls a single LED through high-level behavior intents.
///
/// The controller owns one output's full state: active and requested mode,
/// fixed-point brightness, fade direction, working range, derived step size,
/// and timing. Callers issue intents (`turn_on`, `blink`, `oscillate`, ...)
/// and then poll [`LedController::update_now`] on a cadence of their
/// choosing; the controller never sleeps or spins.
///
/// # Type Parameters
/// * `'a` - Lifetime of the borrowed clock, sync word, and installed sequence
/// * `C` - Clock implementation type
/// * `O` - Output implementation type
/// * `N` - Maximum number of steps in installed sequences
pub struct LedController<'a, C: Clock, O: LedOutput, const N: usize> {
    output: O,
    clock: &'a C,
    use_pwm: bool,
    invert: bool,

    mode_active: LedMode,
    mode_setting: LedMode,
    level: Level,
    dir_is_up: bool,

    range: LevelRange,
    level_step: u16,

    refresh_interval: u16,
    blink_period: u32,
    oscillate_period: u32,
    remaining_phases: u16,

    update_interval: u32,
    last_drive_time: u32,

    player: Option<SequencePlayer<'a, C, N>>,
    sync: SyncHandshake<'a>,
}

impl<'a, C: Clock, O: LedOutput, const N: usize> LedController<'a, C, O, N> {
    /// Creates a controller, forcing the LED off and driving the output once.
    pub fn new(output: O, clock: &'a C, config: ControllerConfig) -> Self {
        let mut controller = Self {
            output,
            clock,
            use_pwm: config.use_pwm,
            invert: config.invert,
            mode_active: LedMode::Off,
            mode_setting: LedMode::Off,
            level: Level::ABS_MIN,
            dir_is_up: false,
            range: LevelRange::full(),
            level_step: 1,
            refresh_interval: 1,
            blink_period: 2,
            oscillate_period: 2,
            remaining_phases: 0,
            update_interval: 0,
            last_drive_time: clock.now_millis(),
            player: None,
            sync: SyncHandshake::detached(),
        };

        let _ = controller.set_refresh_interval(config.refresh_interval_ms);
        let _ = controller.set_blink_period(config.blink_period_ms);
        let _ = controller.set_oscillate_period(config.oscillate_period_ms);
        controller.set_mode_internal(LedMode::Off, 0, None, true);

        controller
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Turns the LED completely off.
    pub fn turn_off(&mut self) {
        self.set_mode(LedMode::Off, 0, None);
    }

    /// Turns the LED fully on.
    pub fn turn_on(&mut self) {
        self.set_mode(LedMode::On, 0, None);
    }

    /// Sets the LED to the working-range minimum.
    pub fn turn_low(&mut self) {
        self.set_mode(LedMode::Low, 0, None);
    }

    /// Sets the LED to the working-range maximum.
    pub fn turn_high(&mut self) {
        self.set_mode(LedMode::High, 0, None);
    }

    /// Toggles the LED, with the off/on versus low/high swing inferred from
    /// the current mode.
    pub fn toggle(&mut self) {
        self.set_mode(LedMode::Toggle, 0, None);
    }

    /// Toggles the LED between fully off and fully on.
    pub fn toggle_max(&mut self) {
        self.set_mode(LedMode::ToggleMax, 0, None);
    }

    /// Toggles the LED between the working-range endpoints.
    pub fn toggle_level(&mut self) {
        self.set_mode(LedMode::ToggleLevel, 0, None);
    }

    /// Starts blinking, with the swing inferred from the current mode.
    /// A `phase_count` of 0 blinks forever.
    pub fn blink(&mut self, phase_count: u16) {
        self.set_mode(LedMode::Blink, phase_count, None);
    }

    /// Starts blinking between fully off and fully on.
    pub fn blink_max(&mut self, phase_count: u16) {
        self.set_mode(LedMode::BlinkMax, phase_count, None);
    }

    /// Starts blinking between the working-range endpoints.
    pub fn blink_level(&mut self, phase_count: u16) {
        self.set_mode(LedMode::BlinkLevel, phase_count, None);
    }

    /// Steps the brightness down by the derived default step.
    ///
    /// Steps are one-shot, not running behaviors, so repeated calls are
    /// always applied rather than suppressed as identical re-requests.
    pub fn step_down(&mut self) {
        self.set_mode_internal(LedMode::StepDown, 0, None, true);
    }

    /// Steps the brightness down by `step_amount` (user scale).
    pub fn step_down_by(&mut self, step_amount: u8) {
        self.set_mode_internal(LedMode::StepDown, 0, Some(step_amount), true);
    }

    /// Steps the brightness up by the derived default step.
    pub fn step_up(&mut self) {
        self.set_mode_internal(LedMode::StepUp, 0, None, true);
    }

    /// Steps the brightness up by `step_amount` (user scale).
    pub fn step_up_by(&mut self, step_amount: u8) {
        self.set_mode_internal(LedMode::StepUp, 0, Some(step_amount), true);
    }

    /// Starts fading toward the working-range minimum.
    pub fn fade_down(&mut self) {
        self.set_mode(LedMode::FadeDown, 0, None);
    }

    /// Starts fading toward the working-range maximum.
    pub fn fade_up(&mut self) {
        self.set_mode(LedMode::FadeUp, 0, None);
    }

    /// Reverses the direction of the last fade.
    pub fn fade_reverse(&mut self) {
        self.set_mode(LedMode::FadeReverse, 0, None);
    }

    /// Oscillates the LED, repeatedly fading up and down.
    /// A `phase_count` of 0 oscillates forever.
    pub fn oscillate(&mut self, phase_count: u16) {
        self.set_mode(LedMode::Oscillate, phase_count, None);
    }

    /// Freezes the LED at its current level.
    pub fn hold(&mut self) {
        self.set_mode(LedMode::HoldLevel, 0, None);
    }

    /// Requests a mode change.
    ///
    /// The request is resolved against the current mode and output capability
    /// first; the change is applied only if the resolved mode differs from
    /// the recorded setting mode, so repeating an identical request does not
    /// restart an already-running behavior. A positive `phase_count` reloads
    /// the remaining-phase counter of blink/oscillate modes; `step_amount`
    /// overrides the derived step for the step modes (user scale).
    pub fn set_mode(&mut self, mode: LedMode, phase_count: u16, step_amount: Option<u8>) {
        self.set_mode_internal(mode, phase_count, step_amount, false);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// True if the LED is not completely off.
    pub fn is_on(&self) -> bool {
        self.level > Level::ABS_MIN
    }

    /// True if the LED sits at the working-range minimum.
    pub fn is_low(&self) -> bool {
        self.level == self.range.min()
    }

    /// True if the LED sits at the working-range maximum.
    pub fn is_high(&self) -> bool {
        self.level == self.range.max()
    }

    /// True if the LED is in motion and brightness is decreasing.
    pub fn is_falling(&self) -> bool {
        self.update_interval > 0 && !self.dir_is_up
    }

    /// True if the LED is in motion and brightness is increasing.
    pub fn is_rising(&self) -> bool {
        self.update_interval > 0 && self.dir_is_up
    }

    /// True if the LED is in a stable state with no pending updates.
    pub fn is_steady(&self) -> bool {
        self.update_interval == 0
    }

    /// Current brightness on the user scale (0-255).
    pub fn current_level(&self) -> u8 {
        self.level.to_user()
    }

    /// The concrete mode currently driving updates.
    pub fn current_mode(&self) -> LedMode {
        self.mode_active
    }

    // ------------------------------------------------------------------
    // Level control
    // ------------------------------------------------------------------

    /// Forces the LED to `level` (user scale).
    ///
    /// Levels matching the absolute or working-range bounds snap to the
    /// corresponding mode. Intermediate levels require PWM and are clamped
    /// into the working range, leaving the LED holding.
    ///
    /// # Errors
    /// * `LevelOutOfRange` - Level was clamped to a working-range bound.
    /// * `PwmRequired` - Intermediate level on a non-PWM output.
    pub fn set_level(&mut self, level: u8) -> Result<(), ConfigError> {
        let requested = Level::from_user(level);

        if requested == Level::ABS_MIN {
            self.set_mode(LedMode::Off, 0, None);
        } else if requested == Level::ABS_MAX {
            self.set_mode(LedMode::On, 0, None);
        } else if requested == self.range.min() {
            self.set_mode(LedMode::Low, 0, None);
        } else if requested == self.range.max() {
            self.set_mode(LedMode::High, 0, None);
        } else if self.use_pwm {
            let in_range = self.range.contains(requested);
            self.level = if requested < self.range.min() {
                self.range.min()
            } else if requested > self.range.max() {
                self.range.max()
            } else {
                requested
            };
            self.mode_setting = LedMode::HoldLevel;
            self.mode_active = LedMode::HoldLevel;
            self.update_interval = 0;
            self.drive_output(true);
            if !in_range {
                return Err(ConfigError::LevelOutOfRange);
            }
        } else {
            return Err(ConfigError::PwmRequired);
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Tunables
    // ------------------------------------------------------------------

    /// Sets the blink period in ms (one period is two phases).
    ///
    /// # Errors
    /// * `PeriodTooShort` - Below 2 ms; the 2 ms minimum was substituted.
    pub fn set_blink_period(&mut self, period_ms: u32) -> Result<(), ConfigError> {
        let clean = period_ms >= 2;
        self.blink_period = if clean { period_ms } else { 2 };
        clean.then_some(()).ok_or(ConfigError::PeriodTooShort)
    }

    /// Sets the oscillation period in ms and re-derives the level step.
    ///
    /// # Errors
    /// * `PeriodTooShort` - Below 2 ms; the 2 ms minimum was substituted.
    pub fn set_oscillate_period(&mut self, period_ms: u32) -> Result<(), ConfigError> {
        let clean = period_ms >= 2;
        self.oscillate_period = if clean { period_ms } else { 2 };
        self.calc_level_step();
        clean.then_some(()).ok_or(ConfigError::PeriodTooShort)
    }

    /// Sets the refresh interval in ms and re-derives the level step.
    ///
    /// # Errors
    /// * `IntervalTooShort` - Zero interval; 1 ms was substituted.
    pub fn set_refresh_interval(&mut self, interval_ms: u16) -> Result<(), ConfigError> {
        let clean = interval_ms > 0;
        self.refresh_interval = if clean { interval_ms } else { 1 };
        self.calc_level_step();
        clean.then_some(()).ok_or(ConfigError::IntervalTooShort)
    }

    /// The blink period in ms.
    pub fn blink_period(&self) -> u32 {
        self.blink_period
    }

    /// The oscillation period in ms.
    pub fn oscillate_period(&self) -> u32 {
        self.oscillate_period
    }

    /// The refresh interval in ms.
    pub fn refresh_interval(&self) -> u16 {
        self.refresh_interval
    }

    /// Sets the working-range minimum (user scale, 0-254), re-scaling the
    /// current level to preserve its relative position within the range.
    ///
    /// # Errors
    /// * `InvalidRange` - `level_min_new >= level_max`; a range one unit
    ///   below the maximum was substituted.
    pub fn set_level_min(&mut self, level_min_new: u8) -> Result<(), ConfigError> {
        let requested = Level::from_user(level_min_new);
        if requested == self.range.min() {
            return Ok(());
        }

        let position = self
            .range
            .contains(self.level)
            .then(|| self.range.position_of(self.level));

        let clean = requested < self.range.max();
        let new_min = if clean {
            requested
        } else {
            Level::from_raw(self.range.max().raw() - (1 << LEVEL_FP_BITS))
        };
        self.range = LevelRange::new(new_min, self.range.max());

        self.rescale_level(position);
        self.calc_level_step();
        clean.then_some(()).ok_or(ConfigError::InvalidRange)
    }

    /// Sets the working-range maximum (user scale, 1-255), re-scaling the
    /// current level to preserve its relative position within the range.
    ///
    /// # Errors
    /// * `InvalidRange` - `level_max_new <= level_min`; a range one unit
    ///   above the minimum was substituted.
    pub fn set_level_max(&mut self, level_max_new: u8) -> Result<(), ConfigError> {
        let requested = Level::from_user(level_max_new);
        if requested == self.range.max() {
            return Ok(());
        }

        let position = self
            .range
            .contains(self.level)
            .then(|| self.range.position_of(self.level));

        let clean = requested > self.range.min();
        let new_max = if clean {
            requested
        } else {
            Level::from_raw(self.range.min().raw() + (1 << LEVEL_FP_BITS))
        };
        self.range = LevelRange::new(self.range.min(), new_max);

        self.rescale_level(position);
        self.calc_level_step();
        clean.then_some(()).ok_or(ConfigError::InvalidRange)
    }

    /// Sets both working-range bounds at once.
    ///
    /// A degenerate request is repaired: swapped bounds are accepted in the
    /// plausible order, and an empty range is widened to one unit adjacent
    /// to the requested bound.
    ///
    /// # Errors
    /// * `InvalidRange` - The request needed repair.
    pub fn set_level_range(
        &mut self,
        level_min_new: u8,
        level_max_new: u8,
    ) -> Result<(), ConfigError> {
        let position = self
            .range
            .contains(self.level)
            .then(|| self.range.position_of(self.level));

        let clean = level_min_new < level_max_new;
        let (min_user, max_user) = if clean {
            (level_min_new, level_max_new)
        } else if level_min_new > level_max_new {
            (level_max_new, level_min_new)
        } else if level_min_new == 0 {
            (0, 1)
        } else {
            (level_max_new - 1, level_max_new)
        };
        self.range = LevelRange::new(Level::from_user(min_user), Level::from_user(max_user));

        self.rescale_level(position);
        self.calc_level_step();
        clean.then_some(()).ok_or(ConfigError::InvalidRange)
    }

    /// The working-range minimum on the user scale.
    pub fn level_min(&self) -> u8 {
        self.range.min().to_user()
    }

    /// The working-range maximum on the user scale.
    pub fn level_max(&self) -> u8 {
        self.range.max().to_user()
    }

    /// The derived default step on the user scale. May read as 0 when the
    /// step is below one user unit; the internal step is never zero.
    pub fn level_step(&self) -> u8 {
        (self.level_step >> LEVEL_FP_BITS) as u8
    }

    /// Enables or disables intensity-quantized output.
    pub fn set_pwm(&mut self, use_pwm: bool) {
        self.use_pwm = use_pwm;
    }

    /// True if the output is driven with quantized intensity.
    pub fn is_pwm(&self) -> bool {
        self.use_pwm
    }

    /// Sets output polarity inversion and re-drives the output without
    /// marking a new drive time.
    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
        self.drive_output(false);
    }

    /// True if the output polarity is inverted.
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    // ------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------

    /// True if enough time has passed that [`LedController::update_now`]
    /// would advance the state. Cheap and non-mutating; tolerant of clock
    /// rollover.
    pub fn update_is_due(&self) -> bool {
        if self.update_interval == 0 {
            return false;
        }
        let elapsed = elapsed_millis(self.clock.now_millis(), self.last_drive_time);
        elapsed > self.update_interval
    }

    /// Advances one tick of fade/blink/oscillate/sequence motion if due.
    ///
    /// A running sequence player is checked first: when its step delay has
    /// elapsed, the mode recorded at the current step is applied (with the
    /// controller's own derived step amount) and the player advances.
    /// Otherwise an ordinary elapsed-time tick re-runs the state computer
    /// for the active mode. Returns true if anything was updated.
    pub fn update_now(&mut self) -> bool {
        let step_mode = match self.player.as_mut() {
            Some(player) => {
                if player.step_delay_is_done() {
                    let mode = player.current_step_mode();
                    player.advance_one_step();
                    mode
                } else {
                    None
                }
            }
            None => None,
        };
        if let Some(mode) = step_mode {
            self.set_mode_internal(mode, 0, None, false);
            return true;
        }

        if self.update_is_due() {
            self.compute_state(self.mode_active, 0, None);
            self.drive_output(true);
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------

    /// Installs a sequence, replacing any previously installed one.
    /// Playback does not start until [`LedController::start_sequence`].
    pub fn install_sequence(&mut self, sequence: &'a LedSequence<N>) {
        let player = self
            .player
            .get_or_insert_with(|| SequencePlayer::new(self.clock));
        player.attach_sequence(sequence);
    }

    /// Removes the installed sequence, detaching the player from it.
    pub fn remove_sequence(&mut self) {
        self.player = None;
    }

    /// Sets how many times the installed sequence plays per start; 0 plays
    /// forever. Multiplies with the sequence's own repeat count. No effect
    /// while no sequence is installed.
    pub fn set_sequence_repeat_count(&mut self, repeat_count: u8) {
        if let Some(player) = self.player.as_mut() {
            player.set_repeat_count(repeat_count);
        }
    }

    /// The player-level repeat count (1 if no sequence is installed).
    pub fn sequence_repeat_count(&self) -> u8 {
        self.player.as_ref().map_or(1, SequencePlayer::repeat_count)
    }

    /// Starts the installed sequence from its first step, or resumes it if
    /// stopped mid-sequence. Returns false if no non-empty sequence is
    /// installed.
    pub fn start_sequence(&mut self) -> bool {
        match self.player.as_mut() {
            Some(player) if player.is_paused() => player.resume(),
            Some(player) => player.start_first_step(),
            None => false,
        }
    }

    /// Stops sequence playback, retaining the position so
    /// [`LedController::start_sequence`] can resume it.
    pub fn stop_sequence(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
    }

    /// True while a sequence step delay is counting down.
    pub fn is_playing_sequence(&self) -> bool {
        self.player.as_ref().is_some_and(SequencePlayer::is_running)
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// Joins a shared synchronization word, claiming a participant bit.
    /// Pass `is_first` from exactly one controller of the group to reset the
    /// word. Returns the claim bit (0 if the word was full).
    pub fn attach_sync_handshake(&mut self, word: &'a SyncWord, is_first: bool) -> usize {
        self.sync.attach(word, is_first)
    }

    /// Leaves the synchronization group. The claim bit stays in the barrier
    /// as a standing arrival so the remaining participants keep passing.
    pub fn detach_sync_handshake(&mut self) {
        self.sync.detach();
    }

    /// Arms the barrier with the currently attached participants. Call once
    /// on each participant after all have attached, before ticking begins.
    pub fn init_sync_handshake(&mut self) {
        self.sync.init();
    }

    // ------------------------------------------------------------------
    // State computer
    // ------------------------------------------------------------------

    fn set_mode_internal(
        &mut self,
        mode: LedMode,
        phase_count: u16,
        step_amount: Option<u8>,
        force: bool,
    ) {
        let resolved = mode.resolve(self.mode_active, self.use_pwm);
        if resolved != self.mode_setting || force {
            self.compute_state(resolved, phase_count, step_amount);
            self.drive_output(true);
        }
    }

    /// The state-transition function: advances level, direction, active
    /// mode, and the next-update interval for one invocation of `mode`.
    fn compute_state(&mut self, mode: LedMode, phase_count: u16, step_amount: Option<u8>) {
        let step = step_amount.map_or(self.level_step, |amount| {
            u16::from(amount) << LEVEL_FP_BITS
        });

        self.mode_setting = mode;

        match mode {
            LedMode::Off => {
                self.dir_is_up = false;
                self.level = Level::ABS_MIN;
                self.mode_active = LedMode::Off;
                self.update_interval = 0;
            }

            LedMode::Low => {
                self.dir_is_up = false;
                self.level = self.range.min();
                self.mode_active = LedMode::Low;
                self.update_interval = 0;
            }

            LedMode::On => {
                self.dir_is_up = true;
                self.level = Level::ABS_MAX;
                self.mode_active = LedMode::On;
                self.update_interval = 0;
            }

            LedMode::High => {
                self.dir_is_up = true;
                self.level = self.range.max();
                self.mode_active = LedMode::High;
                self.update_interval = 0;
            }

            LedMode::ToggleMax => {
                self.dir_is_up = !self.level.is_near_abs_max();
                if self.dir_is_up {
                    self.level = Level::ABS_MAX;
                    self.mode_active = LedMode::On;
                } else {
                    self.level = Level::ABS_MIN;
                    self.mode_active = LedMode::Off;
                }
                self.update_interval = 0;
            }

            LedMode::ToggleLevel => {
                self.dir_is_up = !self.range.is_near_max(self.level);
                if self.dir_is_up {
                    self.level = self.range.max();
                    self.mode_active = LedMode::High;
                } else {
                    self.level = self.range.min();
                    self.mode_active = LedMode::Low;
                }
                self.update_interval = 0;
            }

            LedMode::BlinkMax | LedMode::BlinkLevel => {
                self.compute_blink(mode, phase_count);
            }

            LedMode::StepDown => {
                self.dir_is_up = false;
                self.level = self.range.clamped_sub(self.level, step);
                self.mode_active = if self.level == self.range.min() {
                    LedMode::Low
                } else {
                    LedMode::HoldLevel
                };
                self.update_interval = 0;
            }

            LedMode::StepUp => {
                self.dir_is_up = true;
                self.level = self.range.clamped_add(self.level, step);
                self.mode_active = if self.level == self.range.max() {
                    LedMode::High
                } else {
                    LedMode::HoldLevel
                };
                self.update_interval = 0;
            }

            LedMode::FadeDown | LedMode::FadeUp | LedMode::FadeReverse => {
                self.dir_is_up = match mode {
                    LedMode::FadeDown => false,
                    LedMode::FadeUp => true,
                    _ => !self.dir_is_up,
                };
                if self.dir_is_up {
                    self.level = self.range.clamped_add(self.level, self.level_step);
                    if self.level == self.range.max() {
                        self.mode_active = LedMode::High;
                        self.update_interval = 0;
                    } else {
                        self.mode_active = LedMode::FadeUp;
                        self.update_interval = u32::from(self.refresh_interval);
                    }
                } else {
                    self.level = self.range.clamped_sub(self.level, self.level_step);
                    if self.level == self.range.min() {
                        self.mode_active = LedMode::Low;
                        self.update_interval = 0;
                    } else {
                        self.mode_active = LedMode::FadeDown;
                        self.update_interval = u32::from(self.refresh_interval);
                    }
                }
            }

            LedMode::Oscillate => {
                self.compute_oscillate(phase_count);
            }

            LedMode::HoldLevel => {
                self.mode_active = LedMode::HoldLevel;
                self.update_interval = 0;
            }

            // Generic requests are resolved before reaching the state
            // computer; a stray one freezes in place.
            LedMode::Toggle | LedMode::Blink => {
                self.mode_active = LedMode::HoldLevel;
                self.update_interval = 0;
            }
        }
    }

    /// One blink tick. Every invocation is a phase boundary: the swing
    /// direction flips (gated on the sync barrier) and the phase budget
    /// counts down toward the settled endpoint mode.
    fn compute_blink(&mut self, mode: LedMode, phase_count: u16) {
        let sync_ok = self.sync.sync_achieved();

        let near_top = match mode {
            LedMode::BlinkMax => self.level.is_near_abs_max(),
            _ => self.range.is_near_max(self.level),
        };
        if sync_ok {
            self.dir_is_up = !near_top;
        }

        let (top, bottom, settle_top, settle_bottom) = match mode {
            LedMode::BlinkMax => (Level::ABS_MAX, Level::ABS_MIN, LedMode::On, LedMode::Off),
            _ => (
                self.range.max(),
                self.range.min(),
                LedMode::High,
                LedMode::Low,
            ),
        };
        self.level = if self.dir_is_up { top } else { bottom };

        if phase_count > 0 {
            self.remaining_phases = phase_count;
        }

        if self.remaining_phases > 0 && sync_ok {
            self.remaining_phases -= 1;
            if self.remaining_phases > 0 {
                self.mode_active = mode;
                self.update_interval = self.blink_period / 2;
            } else {
                self.mode_active = if self.dir_is_up { settle_top } else { settle_bottom };
                self.update_interval = 0;
            }
        } else {
            self.mode_active = mode;
            self.update_interval = self.blink_period / 2;
        }
    }

    /// One oscillation tick. Direction flips at the range boundaries (gated
    /// on the sync barrier, which holds the level at the boundary until all
    /// participants arrive); the phase budget counts down when a step lands
    /// on a boundary.
    fn compute_oscillate(&mut self, phase_count: u16) {
        let at_boundary = self.level == self.range.min() || self.level == self.range.max();

        // Single barrier probe per tick, taken only at a transition point.
        let mut sync_ok = None;
        if at_boundary {
            let ok = self.sync.sync_achieved();
            sync_ok = Some(ok);
            if ok {
                self.dir_is_up = !self.dir_is_up;
            }
        }

        if self.dir_is_up {
            self.level = self.range.clamped_add(self.level, self.level_step);
        } else {
            self.level = self.range.clamped_sub(self.level, self.level_step);
        }

        if phase_count > 0 {
            self.remaining_phases = phase_count;
        }

        let landed = self.level == self.range.min() || self.level == self.range.max();
        if self.remaining_phases > 0
            && landed
            && *sync_ok.get_or_insert_with(|| self.sync.sync_achieved())
        {
            self.remaining_phases -= 1;
            if self.remaining_phases > 0 {
                self.mode_active = LedMode::Oscillate;
                self.update_interval = u32::from(self.refresh_interval);
            } else {
                self.mode_active = if self.dir_is_up {
                    LedMode::High
                } else {
                    LedMode::Low
                };
                self.update_interval = 0;
            }
        } else {
            self.mode_active = LedMode::Oscillate;
            self.update_interval = u32::from(self.refresh_interval);
        }
    }

    /// Derives the default level step from the range width, oscillation
    /// period, and refresh interval so one full traversal of the range takes
    /// one oscillation phase. Returns false when rounding degraded the
    /// derivation to the floor (fade timing will be approximate).
    fn calc_level_step(&mut self) -> bool {
        let range = u32::from(self.range.span());
        let oscillate_phase = self.oscillate_period / 2;

        let mut steps_per_phase = oscillate_phase / u32::from(self.refresh_interval);
        if oscillate_phase % u32::from(self.refresh_interval) > 0 {
            steps_per_phase += 1;
        }
        let mut clean = steps_per_phase > 0;
        if !clean {
            steps_per_phase = 1;
        }

        let mut step = range / steps_per_phase;
        clean = clean && step > 0;
        if step == 0 {
            step = 1;
        }
        self.level_step = step as u16;

        clean
    }

    /// Moves the level to `position` (a 15-bit fraction of the range) after
    /// a range change, then re-drives the output without marking a new
    /// drive time. `None` leaves an out-of-range level untouched.
    fn rescale_level(&mut self, position: Option<u16>) {
        if let Some(position) = position {
            self.level = self.range.level_at(position);
            self.drive_output(false);
        }
    }

    /// Writes the effective (post-invert) level to the output: digital low
    /// at exactly zero, quantized intensity when PWM-capable, else digital
    /// high.
    fn drive_output(&mut self, mark_drive_time: bool) {
        let effective = if self.invert {
            Level::from_raw(Level::ABS_MAX.raw() - self.level.raw())
        } else {
            self.level
        };
        let user_level = effective.to_user();

        if user_level == 0 {
            self.output.write_digital(false);
        } else if self.use_pwm {
            self.output.write_intensity(user_level);
        } else {
            self.output.write_digital(true);
        }

        if mark_drive_time {
            self.last_drive_time = self.clock.now_millis();
        }
    }
}

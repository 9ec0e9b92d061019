//! LED behavior modes and request resolution.

/// Behavior modes for a controlled LED.
///
/// `Toggle` and `Blink` are generic requests; [`LedMode::resolve`] translates
/// them to a concrete variant using the controller's history. The `Level`
/// variants and the step/fade/oscillate modes need an intensity-capable (PWM)
/// output; on a purely digital output they degrade to their nearest digital
/// equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedMode {
    /// Turn the LED completely off.
    Off,
    /// Turn the LED fully on.
    On,
    /// Set the LED to the working-range minimum.
    Low,
    /// Set the LED to the working-range maximum.
    High,
    /// Generic toggle; resolves to `ToggleMax` or `ToggleLevel` from context.
    Toggle,
    /// Toggle between fully off and fully on.
    ToggleMax,
    /// Toggle between the working-range low and high endpoints.
    ToggleLevel,
    /// Generic blink; resolves to `BlinkMax` or `BlinkLevel` from context.
    Blink,
    /// Blink between fully off and fully on.
    BlinkMax,
    /// Blink between the working-range low and high endpoints.
    BlinkLevel,
    /// Decrement the level by one step.
    StepDown,
    /// Increment the level by one step.
    StepUp,
    /// Fade down until the working-range minimum is reached.
    FadeDown,
    /// Fade up until the working-range maximum is reached.
    FadeUp,
    /// Reverse the direction of the last fade.
    FadeReverse,
    /// Repeatedly fade up and down between the working-range endpoints.
    Oscillate,
    /// Freeze the LED at its current level.
    HoldLevel,
}

impl LedMode {
    /// Resolves a requested mode to a concrete, capability-adjusted mode.
    ///
    /// Pure function of the request, the currently active mode, and whether
    /// the output can be driven with quantized intensity. Called before every
    /// mode change so the state computer only ever sees concrete modes.
    pub fn resolve(self, active: LedMode, pwm_capable: bool) -> LedMode {
        let mut resolved = self;

        // Without PWM, translate level-oriented modes to their nearest pure
        // digital equivalents.
        if !pwm_capable {
            resolved = match self {
                LedMode::High | LedMode::StepUp | LedMode::FadeUp => LedMode::On,
                LedMode::Low | LedMode::StepDown | LedMode::FadeDown => LedMode::Off,
                LedMode::FadeReverse => LedMode::ToggleMax,
                LedMode::BlinkLevel | LedMode::Oscillate => LedMode::BlinkMax,
                LedMode::HoldLevel => active,
                other => other,
            };
        }

        // Generic toggle: full-swing unless history says the LED is sitting
        // at (or blinking between) working-range endpoints.
        if self == LedMode::Toggle {
            resolved = match active {
                LedMode::Off | LedMode::On | LedMode::BlinkMax => LedMode::ToggleMax,
                _ => LedMode::ToggleLevel,
            };
        }

        // Generic blink: keep an established blink style, otherwise infer
        // the swing from the current resting state.
        if self == LedMode::Blink {
            resolved = match active {
                LedMode::BlinkMax | LedMode::BlinkLevel => active,
                LedMode::Off | LedMode::On => LedMode::BlinkMax,
                _ => LedMode::BlinkLevel,
            };
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_modes_pass_through_with_pwm() {
        for mode in [
            LedMode::Off,
            LedMode::On,
            LedMode::Low,
            LedMode::High,
            LedMode::FadeUp,
            LedMode::Oscillate,
            LedMode::HoldLevel,
        ] {
            assert_eq!(mode.resolve(LedMode::Off, true), mode);
        }
    }

    #[test]
    fn non_pwm_requests_degrade_to_digital() {
        assert_eq!(LedMode::High.resolve(LedMode::Off, false), LedMode::On);
        assert_eq!(LedMode::StepUp.resolve(LedMode::Off, false), LedMode::On);
        assert_eq!(LedMode::FadeUp.resolve(LedMode::Off, false), LedMode::On);
        assert_eq!(LedMode::Low.resolve(LedMode::On, false), LedMode::Off);
        assert_eq!(LedMode::StepDown.resolve(LedMode::On, false), LedMode::Off);
        assert_eq!(LedMode::FadeDown.resolve(LedMode::On, false), LedMode::Off);
        assert_eq!(
            LedMode::FadeReverse.resolve(LedMode::On, false),
            LedMode::ToggleMax
        );
        assert_eq!(
            LedMode::BlinkLevel.resolve(LedMode::Off, false),
            LedMode::BlinkMax
        );
        assert_eq!(
            LedMode::Oscillate.resolve(LedMode::Off, false),
            LedMode::BlinkMax
        );
    }

    #[test]
    fn non_pwm_hold_freezes_active_mode() {
        assert_eq!(
            LedMode::HoldLevel.resolve(LedMode::FadeUp, false),
            LedMode::FadeUp
        );
    }

    #[test]
    fn generic_toggle_follows_history() {
        assert_eq!(LedMode::Toggle.resolve(LedMode::Off, true), LedMode::ToggleMax);
        assert_eq!(LedMode::Toggle.resolve(LedMode::On, true), LedMode::ToggleMax);
        assert_eq!(
            LedMode::Toggle.resolve(LedMode::BlinkMax, true),
            LedMode::ToggleMax
        );
        assert_eq!(LedMode::Toggle.resolve(LedMode::Low, true), LedMode::ToggleLevel);
        assert_eq!(
            LedMode::Toggle.resolve(LedMode::FadeUp, true),
            LedMode::ToggleLevel
        );
    }

    #[test]
    fn generic_blink_keeps_established_style() {
        assert_eq!(
            LedMode::Blink.resolve(LedMode::BlinkMax, true),
            LedMode::BlinkMax
        );
        assert_eq!(
            LedMode::Blink.resolve(LedMode::BlinkLevel, true),
            LedMode::BlinkLevel
        );
        assert_eq!(LedMode::Blink.resolve(LedMode::Off, true), LedMode::BlinkMax);
        assert_eq!(LedMode::Blink.resolve(LedMode::On, true), LedMode::BlinkMax);
        assert_eq!(LedMode::Blink.resolve(LedMode::High, true), LedMode::BlinkLevel);
    }
}

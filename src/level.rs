//! Fixed-point brightness arithmetic.
//!
//! Levels are stored as unsigned fixed-point values with 8 fractional bits on
//! a conceptual 0-255 scale, so a full fade can advance in sub-unit steps
//! without losing precision. The working range ([`LevelRange`]) is a sub-range
//! of the absolute bounds and defines the low/high endpoints used by the
//! level-oriented modes, distinct from fully off/on.

/// Fractional bits in the fixed-point level representation.
pub const LEVEL_FP_BITS: u32 = 8;

/// A fixed-point brightness value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Level(u16);

impl Level {
    /// Fully off.
    pub const ABS_MIN: Level = Level(0);

    /// Fully on.
    pub const ABS_MAX: Level = Level(255 << LEVEL_FP_BITS);

    /// Midpoint of the absolute scale, used for on/off toggle inference.
    pub const ABS_MID: Level = Level(255 << (LEVEL_FP_BITS - 1));

    /// Creates a level from a user-scale (0-255) value.
    pub fn from_user(value: u8) -> Self {
        Level(u16::from(value) << LEVEL_FP_BITS)
    }

    /// Converts to the user scale (0-255), truncating fractional bits.
    pub fn to_user(self) -> u8 {
        (self.0 >> LEVEL_FP_BITS) as u8
    }

    /// Raw fixed-point value.
    pub(crate) fn raw(self) -> u16 {
        self.0
    }

    pub(crate) fn from_raw(raw: u16) -> Self {
        Level(raw)
    }

    /// True if the level sits in the upper half of the absolute scale.
    pub(crate) fn is_near_abs_max(self) -> bool {
        self.0 > Self::ABS_MID.0
    }
}

/// The configured working range `[min, max]` with its cached midpoint.
///
/// Invariant: `min < max`. Construction repairs violations; see
/// [`LevelRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LevelRange {
    min: Level,
    max: Level,
    mid: Level,
}

impl LevelRange {
    /// Creates a range, requiring `min < max`.
    pub(crate) fn new(min: Level, max: Level) -> Self {
        debug_assert!(min < max);
        let mid = Level(min.0 + (max.0 - min.0) / 2);
        Self { min, max, mid }
    }

    /// The full absolute range.
    pub(crate) fn full() -> Self {
        Self::new(Level::ABS_MIN, Level::ABS_MAX)
    }

    pub(crate) fn min(&self) -> Level {
        self.min
    }

    pub(crate) fn max(&self) -> Level {
        self.max
    }

    /// Raw width of the range.
    pub(crate) fn span(&self) -> u16 {
        self.max.0 - self.min.0
    }

    pub(crate) fn contains(&self, level: Level) -> bool {
        level >= self.min && level <= self.max
    }

    /// True if the level sits in the upper half of the working range.
    pub(crate) fn is_near_max(&self, level: Level) -> bool {
        level.0 > self.mid.0
    }

    /// Adds `delta` to `level`, clamping to the range maximum.
    ///
    /// The sum is computed in i32 so a delta larger than the remaining
    /// headroom cannot wrap the u16 representation.
    pub(crate) fn clamped_add(&self, level: Level, delta: u16) -> Level {
        let new = i32::from(level.0) + i32::from(delta);
        if new > i32::from(self.max.0) {
            self.max
        } else {
            Level(new as u16)
        }
    }

    /// Subtracts `delta` from `level`, clamping to the range minimum.
    pub(crate) fn clamped_sub(&self, level: Level, delta: u16) -> Level {
        let new = i32::from(level.0) - i32::from(delta);
        if new < i32::from(self.min.0) {
            self.min
        } else {
            Level(new as u16)
        }
    }

    /// Position of `level` within the range as a fixed-point fraction with
    /// 15 fractional bits. Caller must ensure the level is in range.
    pub(crate) fn position_of(&self, level: Level) -> u16 {
        let offset = u32::from(level.0 - self.min.0);
        ((offset << 15) / u32::from(self.span())) as u16
    }

    /// Level at a 15-bit fractional position within the range. Inverse of
    /// [`LevelRange::position_of`] up to fixed-point rounding.
    pub(crate) fn level_at(&self, position: u16) -> Level {
        let offset = (u32::from(self.span()) * u32::from(position)) >> 15;
        Level(self.min.0 + offset as u16)
    }
}

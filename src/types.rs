//! Core types for spark-layers.
//!
//! Time, text shaping hints and the flag sets that flow between the handle
//! pools, the animation scheduler and the text layer.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Time
// =============================================================================

/// Signed time value in nanoseconds.
///
/// The scheduler never reads a clock. Callers pass monotonic time into every
/// update, so the origin of the timeline is up to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Nanoseconds(pub i64);

impl Nanoseconds {
    pub const ZERO: Self = Self(0);
    pub const MIN: Self = Self(i64::MIN);
    pub const MAX: Self = Self(i64::MAX);

    /// Create from a raw nanosecond count.
    pub const fn new(ns: i64) -> Self {
        Self(ns)
    }

    /// Create from milliseconds.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms * 1_000_000)
    }

    /// Create from seconds.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1_000_000_000)
    }

    /// Raw nanosecond count.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Addition clamped at the representable range.
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplication clamped at the representable range.
    pub const fn saturating_mul(self, factor: i64) -> Self {
        Self(self.0.saturating_mul(factor))
    }
}

impl Add for Nanoseconds {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Nanoseconds {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Nanoseconds {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Nanoseconds {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl fmt::Display for Nanoseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

// =============================================================================
// Shaping hints
// =============================================================================

/// Direction text is shaped in.
///
/// `Unspecified` asks the shaper to detect it from the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeDirection {
    #[default]
    Unspecified,
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl ShapeDirection {
    /// Whether logical order runs against the optical left-to-right order.
    ///
    /// Cursor movement reverses its byte-stream direction for these.
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::RightToLeft | Self::BottomToTop)
    }
}

/// ISO 15924 script tag packed as a big-endian four-character code.
///
/// `Script::UNSPECIFIED` lets the shaper detect the script.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Script(pub u32);

impl Script {
    pub const UNSPECIFIED: Self = Self(0);
    pub const LATIN: Self = Self::from_tag(*b"Latn");
    pub const ARABIC: Self = Self::from_tag(*b"Arab");
    pub const HEBREW: Self = Self::from_tag(*b"Hebr");

    /// Create from a four-character tag such as `*b"Latn"`.
    pub const fn from_tag(tag: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(tag))
    }

    /// The four-character tag.
    pub const fn tag(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::UNSPECIFIED {
            return f.write_str("Script::Unspecified");
        }
        let tag = self.tag();
        write!(f, "Script({})", String::from_utf8_lossy(&tag))
    }
}

/// Shaping hints attached to a text data item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextProperties {
    /// BCP 47 language tag, empty for "detect".
    pub language: String,
    pub script: Script,
    pub direction: ShapeDirection,
}

impl TextProperties {
    /// Properties with an explicit direction and everything else detected.
    pub fn with_direction(direction: ShapeDirection) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }
}

// =============================================================================
// Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-animation behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnimationFlags: u8 {
        /// Keep the animation in `Stopped` state instead of removing it once played.
        const KEEP_ONCE_PLAYED = 1 << 0;
    }
}

bitflags::bitflags! {
    /// What the caller has to do after `AnimationScheduler::update()`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnimatorUpdates: u8 {
        /// At least one active bit is set, `advance()` has work to do.
        const ADVANCE = 1 << 0;
        /// At least one remove bit is set, `clean()` has work to do.
        const CLEAN = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Per-data flags of a text layer item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextDataFlags: u8 {
        /// Keep the source bytes and a cursor/selection for editing.
        const EDITABLE = 1 << 0;
    }
}

bitflags::bitflags! {
    /// Pending work on a whole layer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LayerStates: u8 {
        /// Some data was reshaped or had its cursor moved, redraw is needed.
        const NEEDS_DATA_UPDATE = 1 << 0;
        /// Unused runs are occupying payload space.
        const NEEDS_COMPACT = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Pending work on a single text data item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextChanges: u8 {
        /// Contents were reshaped.
        const SHAPE = 1 << 0;
        /// Cursor or selection moved.
        const CURSOR = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanoseconds_arithmetic() {
        let a = Nanoseconds::from_millis(2);
        let b = Nanoseconds::new(500_000);
        assert_eq!((a + b).get(), 2_500_000);
        assert_eq!((a - b).get(), 1_500_000);
        assert_eq!(Nanoseconds::MAX.saturating_add(a), Nanoseconds::MAX);
        assert_eq!(Nanoseconds::from_secs(1).saturating_mul(i64::MAX), Nanoseconds::MAX);
        assert_eq!(a.to_string(), "2000000ns");
    }

    #[test]
    fn test_script_tag() {
        assert_eq!(Script::LATIN.tag(), *b"Latn");
        assert_eq!(format!("{:?}", Script::HEBREW), "Script(Hebr)");
        assert_eq!(format!("{:?}", Script::UNSPECIFIED), "Script::Unspecified");
    }

    #[test]
    fn test_direction_reversed() {
        assert!(ShapeDirection::RightToLeft.is_reversed());
        assert!(!ShapeDirection::LeftToRight.is_reversed());
        assert!(!ShapeDirection::Unspecified.is_reversed());
    }

    #[test]
    fn test_flags() {
        let states = LayerStates::NEEDS_DATA_UPDATE | LayerStates::NEEDS_COMPACT;
        assert!(states.contains(LayerStates::NEEDS_COMPACT));
        assert_eq!(TextChanges::default(), TextChanges::empty());
    }
}

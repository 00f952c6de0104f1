//! Motion classification and its legacy bit encoding.
//!
//! Downstream program emitters read an integer bitmask per waypoint:
//!
//! | bit | value | meaning |
//! |-----|-------|---------|
//! | 0   | 1     | RAPID, overrides every other classification |
//! | 1   | 2     | PLUNGE (1) / FEED (0), meaningful only when bit0 = 0 |
//! | 2   | 4     | ARC (circular interpolation) |
//! | 3   | 8     | arc direction: set = counter-clockwise |
//!
//! `ARC_CW` is 4 and `ARC_CCW` is 12. Internally planners work with
//! [`MotionType`] and convert once at the boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw motion bitmask as exchanged with program emitters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotionBits(pub u8);

impl MotionBits {
    pub const FEED: u8 = 0;
    pub const RAPID: u8 = 1;
    pub const PLUNGE: u8 = 2;
    pub const ARC: u8 = 4;
    pub const CCW: u8 = 8;
    pub const ARC_CW: u8 = Self::ARC;
    pub const ARC_CCW: u8 = Self::ARC | Self::CCW;

    pub fn is_rapid(self) -> bool {
        self.0 & Self::RAPID != 0
    }

    /// True when neither the rapid nor the plunge bit is set.
    pub fn is_feed(self) -> bool {
        self.0 & (Self::RAPID | Self::PLUNGE) == 0
    }

    pub fn is_plunge(self) -> bool {
        self.0 & Self::PLUNGE != 0
    }

    pub fn is_arc(self) -> bool {
        self.0 & Self::ARC != 0
    }
}

/// Tagged motion classification used inside the planners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    Rapid,
    Feed,
    Plunge,
    Arc { clockwise: bool },
}

impl MotionType {
    /// Encodes to the legacy bitmask.
    pub fn to_bits(self) -> MotionBits {
        MotionBits(match self {
            MotionType::Rapid => MotionBits::RAPID,
            MotionType::Feed => MotionBits::FEED,
            MotionType::Plunge => MotionBits::PLUNGE,
            MotionType::Arc { clockwise: true } => MotionBits::ARC_CW,
            MotionType::Arc { clockwise: false } => MotionBits::ARC_CCW,
        })
    }

    /// Decodes a legacy bitmask with precedence Rapid > Arc > Plunge > Feed.
    pub fn from_bits(bits: MotionBits) -> Self {
        if bits.is_rapid() {
            MotionType::Rapid
        } else if bits.is_arc() {
            MotionType::Arc {
                clockwise: bits.0 & MotionBits::CCW == 0,
            }
        } else if bits.is_plunge() {
            MotionType::Plunge
        } else {
            MotionType::Feed
        }
    }

    /// Moves executed at cutting speed (feed, plunge or arc).
    pub fn is_cutting(self) -> bool {
        !matches!(self, MotionType::Rapid)
    }
}

impl From<MotionBits> for MotionType {
    fn from(bits: MotionBits) -> Self {
        MotionType::from_bits(bits)
    }
}

impl From<MotionType> for MotionBits {
    fn from(motion: MotionType) -> Self {
        motion.to_bits()
    }
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rapid => write!(f, "Rapid"),
            Self::Feed => write!(f, "Feed"),
            Self::Plunge => write!(f, "Plunge"),
            Self::Arc { clockwise: true } => write!(f, "Arc CW"),
            Self::Arc { clockwise: false } => write!(f, "Arc CCW"),
        }
    }
}

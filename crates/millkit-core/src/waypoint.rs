//! A single oriented tool sample tagged with its motion type.

use crate::frame::OrientedFrame;
use crate::motion::{MotionBits, MotionType};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// The raw emitter bits are stored as given, so combinations such as
/// rapid+arc keep every flag; [`Waypoint::motion`] gives the decoded view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub frame: OrientedFrame,
    #[serde(rename = "type")]
    pub bits: MotionBits,
    /// Radius for arc moves; `None` for linear motion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc_radius: Option<f64>,
}

impl Waypoint {
    pub fn new(frame: OrientedFrame, motion: MotionType) -> Self {
        Self {
            frame,
            bits: motion.to_bits(),
            arc_radius: None,
        }
    }

    /// Builds an arc waypoint ending at `frame`.
    pub fn arc(frame: OrientedFrame, radius: f64, clockwise: bool) -> Self {
        Self {
            frame,
            bits: MotionType::Arc { clockwise }.to_bits(),
            arc_radius: Some(radius),
        }
    }

    pub fn rapid(frame: OrientedFrame) -> Self {
        Self::new(frame, MotionType::Rapid)
    }

    pub fn feed(frame: OrientedFrame) -> Self {
        Self::new(frame, MotionType::Feed)
    }

    pub fn plunge(frame: OrientedFrame) -> Self {
        Self::new(frame, MotionType::Plunge)
    }

    /// Decodes a waypoint from the legacy integer encoding.
    pub fn from_type_bits(frame: OrientedFrame, bits: u8, arc_radius: Option<f64>) -> Self {
        Self {
            frame,
            bits: MotionBits(bits),
            arc_radius,
        }
    }

    /// Legacy integer encoding of the motion type.
    pub fn type_bits(&self) -> u8 {
        self.bits.0
    }

    /// Decoded motion, with precedence Rapid > Arc > Plunge > Feed.
    pub fn motion(&self) -> MotionType {
        MotionType::from_bits(self.bits)
    }

    pub fn set_motion(&mut self, motion: MotionType) {
        self.bits = motion.to_bits();
    }

    pub fn is_rapid(&self) -> bool {
        self.bits.is_rapid()
    }

    pub fn is_feed(&self) -> bool {
        self.bits.is_feed()
    }

    pub fn is_plunge(&self) -> bool {
        self.bits.is_plunge()
    }

    pub fn is_arc(&self) -> bool {
        self.bits.is_arc()
    }

    pub fn position(&self) -> Point3<f64> {
        self.frame.origin
    }

    /// Copy with a different motion tag.
    pub fn with_motion(&self, motion: MotionType) -> Self {
        Self {
            bits: motion.to_bits(),
            ..*self
        }
    }

    /// Copy with a different frame.
    pub fn with_frame(&self, frame: OrientedFrame) -> Self {
        Self { frame, ..*self }
    }
}

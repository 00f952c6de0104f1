//! Cumulative drive-geometry footprint across layers.

use millkit_geometry::{region_area, BooleanEngine, Region};

/// Running union of the drive cross-sections seen so far.
///
/// Threaded through the layer loop by value: each step consumes the
/// accumulator and returns the next one. Its area never decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowAccumulator {
    region: Region,
    area: f64,
}

impl Default for ShadowAccumulator {
    fn default() -> Self {
        Self::new(Region::new(vec![]))
    }
}

impl ShadowAccumulator {
    pub fn new(seed: Region) -> Self {
        let area = region_area(&seed);
        Self { region: seed, area }
    }

    /// Folds one more drive slice in. The candidate union replaces the
    /// current shadow only when it is strictly larger.
    pub fn accumulate(self, engine: &BooleanEngine, slice: &Region) -> Self {
        if slice.0.is_empty() {
            return self;
        }
        let candidate = engine.union(&self.region, slice);
        let area = region_area(&candidate);
        if area > self.area {
            Self {
                region: candidate,
                area,
            }
        } else {
            self
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn is_empty(&self) -> bool {
        self.region.0.is_empty()
    }
}

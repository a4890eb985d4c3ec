use std::ops::RangeInclusive;

use crate::csg::Scene;
use crate::error::Result;
use crate::math::Point3;

use super::LineTrack;

/// Finds where a line first enters one of a range of cells.
pub struct CellDistance {
    start: Point3,
    end: Point3,
}

impl CellDistance {
    /// Creates a new `CellDistance` query along `start -> end`.
    #[must_use]
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Returns the entry point of the first cell whose name lies in `names`.
    ///
    /// If the start point is already inside such a cell, the start point is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying line track fails.
    pub fn first_entry(&self, scene: &Scene, names: RangeInclusive<i32>) -> Result<Option<Point3>> {
        let track = LineTrack::new(self.start, self.end).execute(scene)?;
        Ok(track
            .segments()
            .iter()
            .find(|s| names.contains(&s.name))
            .map(|s| s.entry))
    }

    /// Distance from the start point to [`CellDistance::first_entry`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying line track fails.
    pub fn distance(&self, scene: &Scene, names: RangeInclusive<i32>) -> Result<Option<f64>> {
        Ok(self
            .first_entry(scene, names)?
            .map(|entry| (entry - self.start).norm()))
    }
}

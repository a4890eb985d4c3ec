use crate::csg::{CellId, Scene};
use crate::error::{Result, SceneError};
use crate::math::{Point3, TOLERANCE};

/// Parameters controlling a line track.
#[derive(Debug, Clone, Copy)]
pub struct TrackParams {
    /// Crossing parameters (in `[0, 1]` along the segment) closer than this
    /// are merged into one.
    pub epsilon: f64,
    /// Treat a sub-interval covered by no cell as an error instead of
    /// dropping it.
    pub require_coverage: bool,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            epsilon: 1e-8,
            require_coverage: false,
        }
    }
}

/// One run of the track inside a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSegment {
    /// Name of the cell.
    pub name: i32,
    /// Arena id of the cell.
    pub cell: CellId,
    /// Point where the track enters the cell.
    pub entry: Point3,
    /// Path length inside the cell.
    pub length: f64,
}

/// Ordered cells crossed by a line segment.
///
/// Touching runs through the same cell are merged, so two consecutive
/// segments share a cell only when a void lies between them.
#[derive(Debug, Clone, Default)]
pub struct TrackResult {
    segments: Vec<TrackSegment>,
    void_length: f64,
}

impl TrackResult {
    /// Segments ordered by distance from the start point.
    #[must_use]
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// Cell names in track order.
    #[must_use]
    pub fn names(&self) -> Vec<i32> {
        self.segments.iter().map(|s| s.name).collect()
    }

    /// Sum of path lengths inside cells.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    /// Length of the track that lay in no cell.
    #[must_use]
    pub fn void_length(&self) -> f64 {
        self.void_length
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the track crossed no cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends a run; `touching` runs into the same cell extend the last one.
    fn push(&mut self, name: i32, cell: CellId, entry: Point3, length: f64, touching: bool) {
        match self.segments.last_mut() {
            Some(last) if touching && last.name == name => last.length += length,
            _ => self.segments.push(TrackSegment {
                name,
                cell,
                entry,
                length,
            }),
        }
    }
}

/// Walks the straight segment between two points through the cells of a scene.
///
/// The segment is cut at every crossing with a surface referenced by some
/// cell; the midpoint of each piece decides which cell owns it. There is
/// no spatial index, so every cell is tested for every piece.
pub struct LineTrack {
    start: Point3,
    end: Point3,
    params: TrackParams,
}

impl LineTrack {
    /// Creates a new `LineTrack` query from `start` to `end`.
    #[must_use]
    pub fn new(start: Point3, end: Point3) -> Self {
        Self {
            start,
            end,
            params: TrackParams::default(),
        }
    }

    /// Replaces the tracking parameters.
    #[must_use]
    pub fn with_params(mut self, params: TrackParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the track against `scene`.
    ///
    /// A zero-length segment yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if a cell references a surface missing from the
    /// scene, or if coverage is required and part of the segment lies in
    /// no cell.
    pub fn execute(&self, scene: &Scene) -> Result<TrackResult> {
        let dir = self.end - self.start;
        let total = dir.norm();
        let mut result = TrackResult::default();
        if total < TOLERANCE {
            return Ok(result);
        }

        let params = self.crossings(scene, &dir)?;

        let mut after_void = false;
        for pair in params.windows(2) {
            let (t0, t1) = (pair[0], pair[1]);
            let length = (t1 - t0) * total;
            let mid = self.start + dir * (0.5 * (t0 + t1));

            match Self::owner(scene, &mid)? {
                Some((id, name)) => {
                    result.push(name, id, self.start + dir * t0, length, !after_void);
                    after_void = false;
                }
                None => {
                    result.void_length += length;
                    after_void = true;
                }
            }
        }

        if self.params.require_coverage && result.void_length > self.params.epsilon * total {
            tracing::warn!(
                void_length = result.void_length,
                "line track left modelled space"
            );
            return Err(SceneError::IncompleteModel {
                start: self.start.coords.into(),
                end: self.end.coords.into(),
                void_length: result.void_length,
            }
            .into());
        }

        tracing::debug!(
            cells = result.len(),
            length = total,
            void_length = result.void_length,
            "line track"
        );
        Ok(result)
    }

    /// Sorted, de-duplicated crossing parameters including both ends.
    fn crossings(&self, scene: &Scene, dir: &crate::math::Vector3) -> Result<Vec<f64>> {
        let eps = self.params.epsilon;
        let mut params = vec![0.0, 1.0];
        for handle in scene.referenced_surfaces() {
            let surface = scene.surfaces().get(handle)?;
            params.extend(
                surface
                    .line_crossings(&self.start, dir)
                    .into_iter()
                    .filter(|&t| t > eps && t < 1.0 - eps),
            );
        }
        params.sort_by(f64::total_cmp);
        params.dedup_by(|t, kept| *t - *kept < eps);
        Ok(params)
    }

    /// First cell, in scene order, containing `point`.
    fn owner(scene: &Scene, point: &Point3) -> Result<Option<(CellId, i32)>> {
        let mut found = None;
        for (id, cell) in scene.cells() {
            if !cell.is_inside(point, scene.surfaces())? {
                continue;
            }
            match found {
                None => found = Some((id, cell.name())),
                Some((_, first)) => {
                    tracing::warn!(
                        first,
                        second = cell.name(),
                        ?point,
                        "cells overlap on line track"
                    );
                    break;
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::csg::Rule;
    use crate::geometry::{Cylinder, Plane};
    use crate::math::Vector3;
    use crate::PipenetError;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn rule(text: &str) -> Rule {
        text.parse().unwrap()
    }

    /// Box [-10, 10]^3 split at x = 0, with a rod of radius 1 along y
    /// through the right half.
    ///
    /// Surfaces: 1..6 box faces, 7 plane x = 0, 8 cylinder about the line
    /// x = 5, z = 0. Cells: 1 left half, 2 right half minus rod, 3 rod.
    fn split_box() -> Scene {
        let mut scene = Scene::new();
        let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
        for (i, axis) in axes.iter().enumerate() {
            let h = i32::try_from(2 * i).unwrap();
            scene
                .add_surface(h + 1, Plane::from_normal(Point3::origin() - axis * 10.0, *axis).unwrap())
                .unwrap();
            scene
                .add_surface(h + 2, Plane::from_normal(Point3::origin() + axis * 10.0, *axis).unwrap())
                .unwrap();
        }
        scene
            .add_surface(7, Plane::from_normal(Point3::origin(), Vector3::x()).unwrap())
            .unwrap();
        scene
            .add_surface(8, Cylinder::new(p(5.0, 0.0, 0.0), Vector3::y(), 1.0).unwrap())
            .unwrap();

        scene.add_cell(1, rule("1 -7 3 -4 5 -6"), 1, 0.0).unwrap();
        scene.add_cell(2, rule("7 -2 3 -4 5 -6 8"), 1, 0.0).unwrap();
        scene.add_cell(3, rule("-8 3 -4"), 2, 0.0).unwrap();
        scene
    }

    #[test]
    fn crosses_cells_in_order() {
        let scene = split_box();
        let result = LineTrack::new(p(-8.0, 0.0, 0.0), p(8.0, 0.0, 0.0))
            .execute(&scene)
            .unwrap();
        assert_eq!(result.names(), vec![1, 2, 3, 2]);

        let lengths: Vec<f64> = result.segments().iter().map(|s| s.length).collect();
        assert_relative_eq!(lengths[0], 8.0, epsilon = 1e-9);
        assert_relative_eq!(lengths[1], 4.0, epsilon = 1e-9);
        assert_relative_eq!(lengths[2], 2.0, epsilon = 1e-9);
        assert_relative_eq!(lengths[3], 2.0, epsilon = 1e-9);
        assert_relative_eq!(result.segments()[2].entry.x, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn lengths_sum_to_distance() {
        let scene = split_box();
        let start = p(-9.0, -3.0, 0.5);
        let end = p(9.5, 7.0, -0.25);
        let result = LineTrack::new(start, end).execute(&scene).unwrap();
        assert_relative_eq!(result.total_length(), (end - start).norm(), epsilon = 1e-9);
        assert_relative_eq!(result.void_length(), 0.0);
    }

    #[test]
    fn no_consecutive_duplicates() {
        let mut scene = split_box();
        // Plane y = 0 bounds only a cell outside the box, so it splits the
        // track inside cell 1 without changing the owner.
        scene
            .add_surface(9, Plane::from_normal(Point3::origin(), Vector3::y()).unwrap())
            .unwrap();
        scene.add_cell(4, rule("-1 9"), 0, 0.0).unwrap();

        let result = LineTrack::new(p(-5.0, -5.0, 0.0), p(-5.0, 5.0, 0.0))
            .execute(&scene)
            .unwrap();
        assert_eq!(result.names(), vec![1]);
        assert_relative_eq!(result.segments()[0].length, 10.0, epsilon = 1e-9);

        let result = LineTrack::new(p(-8.0, -5.0, 0.2), p(8.0, 5.0, -0.2))
            .execute(&scene)
            .unwrap();
        for pair in result.segments().windows(2) {
            assert_ne!(pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn void_separates_runs_through_one_cell() {
        let mut scene = Scene::new();
        scene
            .add_surface(1, Plane::from_normal(p(2.0, 0.0, 0.0), Vector3::x()).unwrap())
            .unwrap();
        scene
            .add_surface(2, Plane::from_normal(p(4.0, 0.0, 0.0), Vector3::x()).unwrap())
            .unwrap();
        scene.add_cell(1, rule("-1 : 2"), 0, 0.0).unwrap();

        let result = LineTrack::new(p(0.0, 0.0, 0.0), p(6.0, 0.0, 0.0))
            .execute(&scene)
            .unwrap();
        assert_eq!(result.names(), vec![1, 1]);
        let [first, second] = result.segments() else {
            panic!("expected two runs, got {:?}", result.segments());
        };
        assert_relative_eq!(first.entry.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(first.length, 2.0, epsilon = 1e-9);
        assert_relative_eq!(second.entry.x, 4.0, epsilon = 1e-9);
        assert_relative_eq!(second.length, 2.0, epsilon = 1e-9);
        assert_relative_eq!(result.void_length(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_query_is_empty() {
        let scene = split_box();
        let result = LineTrack::new(p(1.0, 2.0, 3.0), p(1.0, 2.0, 3.0))
            .execute(&scene)
            .unwrap();
        assert!(result.is_empty());
        assert_relative_eq!(result.total_length(), 0.0);
    }

    #[test]
    fn voids_are_dropped_or_reported() {
        let scene = split_box();
        let start = p(-15.0, 0.0, 0.0);
        let end = p(-5.0, 0.0, 0.0);

        let result = LineTrack::new(start, end).execute(&scene).unwrap();
        assert_eq!(result.names(), vec![1]);
        assert_relative_eq!(result.total_length(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(result.void_length(), 5.0, epsilon = 1e-9);

        let strict = TrackParams {
            require_coverage: true,
            ..TrackParams::default()
        };
        let err = LineTrack::new(start, end).with_params(strict).execute(&scene);
        assert!(matches!(
            err,
            Err(PipenetError::Scene(SceneError::IncompleteModel { .. }))
        ));
    }

    #[test]
    fn coincident_crossings_merge() {
        let mut scene = split_box();
        // A second plane at x = 0 produces a crossing identical to surface 7.
        scene
            .add_surface(9, Plane::from_normal(Point3::origin(), -Vector3::x()).unwrap())
            .unwrap();
        scene.add_cell(4, rule("-9 1 -7 3 -4 -5"), 0, 0.0).unwrap();

        let result = LineTrack::new(p(-8.0, 0.0, 0.0), p(4.0, 0.0, 0.0))
            .execute(&scene)
            .unwrap();
        assert_eq!(result.names(), vec![1, 2]);
        assert!(result.segments().iter().all(|s| s.length > 1e-6));
    }
}

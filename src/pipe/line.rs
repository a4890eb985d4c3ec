use slotmap::SlotMap;

use crate::csg::Scene;
use crate::error::{ConfigError, GeometryError, PipeError, PipenetError, Result};
use crate::math::{Point3, TOLERANCE};

use super::layer::{layer_active, CylinderLayer};
use super::unit::{check_block, InsertParams, PipeUnit, UnitId};

/// A pipe following a polyline, built as one [`PipeUnit`] per gap.
///
/// All segments share one layer schedule; each gap carries its own
/// active-layer mask. Neighbouring segments meet on a shared mitre plane.
#[derive(Debug)]
pub struct PipeLine {
    key: String,
    points: Vec<Point3>,
    layers: Vec<CylinderLayer>,
    active: Vec<u32>,
    units: SlotMap<UnitId, PipeUnit>,
    order: Vec<UnitId>,
    params: InsertParams,
}

impl PipeLine {
    /// Creates an empty pipe line registered under `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            points: Vec::new(),
            layers: Vec::new(),
            active: Vec::new(),
            units: SlotMap::with_key(),
            order: Vec::new(),
            params: InsertParams::default(),
        }
    }

    /// Replaces the intrusion-detection parameters.
    #[must_use]
    pub fn with_params(mut self, params: InsertParams) -> Self {
        self.params = params;
        self
    }

    /// Name the segments are registered under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replaces the polyline, discarding any built segments and resetting
    /// every gap mask to "all layers".
    pub fn set_points(&mut self, points: &[Point3]) {
        self.points = points.to_vec();
        self.active = vec![0; points.len().saturating_sub(1)];
        self.units.clear();
        self.order.clear();
    }

    /// Appends a point; the new gap realizes all layers.
    pub fn add_point(&mut self, point: Point3) {
        if !self.points.is_empty() {
            self.active.push(0);
        }
        self.points.push(point);
    }

    /// Appends a layer outside the existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive or does not exceed
    /// the previous one.
    pub fn add_radius(&mut self, layer: CylinderLayer) -> Result<()> {
        if layer.radius <= 0.0 || !layer.radius.is_finite() {
            return Err(ConfigError::NonPositiveRadius(layer.radius).into());
        }
        if let Some(previous) = self.layers.last() {
            if layer.radius <= previous.radius + TOLERANCE {
                return Err(ConfigError::RadiusOrder {
                    previous: previous.radius,
                    radius: layer.radius,
                }
                .into());
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    /// Sets the active-layer mask of gap `gap` (`0` realizes every layer).
    ///
    /// # Errors
    ///
    /// Returns an error if `gap` is not a gap between two points.
    pub fn set_active(&mut self, gap: usize, mask: u32) -> Result<()> {
        let len = self.active.len();
        let slot = self
            .active
            .get_mut(gap)
            .ok_or(ConfigError::GapIndex { index: gap, len })?;
        *slot = mask;
        Ok(())
    }

    /// Polyline points.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Layer schedule, innermost first.
    #[must_use]
    pub fn layers(&self) -> &[CylinderLayer] {
        &self.layers
    }

    /// Active-layer mask per gap.
    #[must_use]
    pub fn active(&self) -> &[u32] {
        &self.active
    }

    /// Built segments in polyline order.
    pub fn units(&self) -> impl Iterator<Item = &PipeUnit> {
        self.order.iter().filter_map(|&id| self.units.get(id))
    }

    /// Segment `index`, if built.
    #[must_use]
    pub fn unit(&self, index: usize) -> Option<&PipeUnit> {
        self.order.get(index).and_then(|&id| self.units.get(id))
    }

    /// Number of built segments.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.order.len()
    }

    /// Builds every segment and inserts it into `scene`.
    ///
    /// The polyline and layer schedule are checked before the scene is
    /// touched. Segments are then linked to their neighbours and driven
    /// through their construction steps in order. A failing segment aborts
    /// the build; segments committed before it stay in the scene.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any mutation, or
    /// [`PipeError::Segment`] naming the first segment that failed.
    pub fn create_all(&mut self, scene: &mut Scene) -> Result<()> {
        self.check(scene)?;
        scene.populate_cells();
        scene.validate()?;

        self.units.clear();
        self.order.clear();
        for (index, pair) in self.points.windows(2).enumerate() {
            let unit = PipeUnit::new(&self.key, index, pair[0], pair[1], scene)
                .map_err(|e| segment_error(index, e))?;
            self.order.push(self.units.insert(unit));
        }

        for pair in self.order.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if let Some(unit) = self.units.get_mut(from) {
                unit.connect_to(to);
            }
            if let Some(unit) = self.units.get_mut(to) {
                unit.connect_from(from);
            }
        }

        for (index, &id) in self.order.iter().enumerate() {
            let neighbour_axis = |link: Option<UnitId>| {
                link.and_then(|other| self.units.get(other)).map(|u| *u.axis())
            };
            let Some(unit) = self.units.get(id) else {
                continue;
            };
            let prev_axis = neighbour_axis(unit.prev());
            let next_axis = neighbour_axis(unit.next());

            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            unit.create_all(
                scene,
                self.active[index],
                &self.layers,
                prev_axis,
                next_axis,
                &self.params,
            )
            .map_err(|e| segment_error(index, e))?;
        }

        tracing::info!(
            key = %self.key,
            segments = self.order.len(),
            cells = scene.cell_count(),
            "pipe line built"
        );
        Ok(())
    }

    /// Checks the polyline and layer schedule against `scene`.
    fn check(&self, scene: &Scene) -> Result<()> {
        if self.points.len() < 2 {
            return Err(ConfigError::TooFewPoints(self.points.len()).into());
        }
        if self.layers.is_empty() {
            return Err(ConfigError::NoRadii.into());
        }
        check_block(scene.block_size(), self.layers.len())?;
        for (index, pair) in self.points.windows(2).enumerate() {
            if (pair[1] - pair[0]).norm() < TOLERANCE {
                let e = GeometryError::Degenerate("pipe segment has zero length".into());
                return Err(segment_error(index, e.into()));
            }
        }
        for (gap, &mask) in self.active.iter().enumerate() {
            if !(0..self.layers.len()).any(|i| layer_active(mask, i)) {
                return Err(ConfigError::EmptyMask {
                    gap,
                    mask,
                    layers: self.layers.len(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn segment_error(index: usize, source: PipenetError) -> PipenetError {
    PipeError::Segment {
        index,
        source: Box::new(source),
    }
    .into()
}

use std::collections::BTreeSet;
use std::f64::consts::TAU;

use crate::csg::{composite, Rule, Scene, SurfaceMap};
use crate::error::{ConfigError, GeometryError, PipeError, Result, SceneError};
use crate::geometry::{Cylinder, Plane};
use crate::math::{perpendicular_dir, Point3, Vector3, TOLERANCE};
use crate::track::LineTrack;

use super::layer::{layer_active, CylinderLayer};

slotmap::new_key_type! {
    /// Unique identifier for a pipe segment within its pipe line.
    pub struct UnitId;
}

/// Construction progress of a [`PipeUnit`]. Steps must run in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitState {
    Unpopulated,
    GeometryComputed,
    SurfacesBuilt,
    OuterRegionComputed,
    Inserted,
    ObjectsCommitted,
}

/// Sampling density for intrusion detection.
#[derive(Debug, Clone, Copy)]
pub struct InsertParams {
    /// Rays spaced evenly around the outer radius.
    pub ray_count: u32,
    /// Also trace the segment axis itself.
    pub include_axis: bool,
}

impl Default for InsertParams {
    fn default() -> Self {
        Self {
            ray_count: 6,
            include_axis: true,
        }
    }
}

/// Region of one layer: inside its cylinder, between both end caps.
/// The cylinder uses the layer base, the caps the segment base (`M`).
const LAYER_REGION: &str = "-7 5M -6M";

/// One straight run of a pipe between two polyline points.
///
/// Surface handles come from the index block registered for the segment:
/// caps at `+5` (start) and `+6` (end), layer `i` at `+7 + 10 i`. Both cap
/// normals point along the flow, so the region is `5 -6`. Cell names are
/// drawn from `+1` upwards.
#[derive(Debug, Clone)]
pub struct PipeUnit {
    key_name: String,
    index: usize,
    surf_index: i32,
    block_size: i32,
    next_cell: i32,
    state: UnitState,
    prev: Option<UnitId>,
    next: Option<UnitId>,
    a_pt: Point3,
    b_pt: Point3,
    axis: Vector3,
    a_norm: Vector3,
    b_norm: Vector3,
    active: u32,
    layers: Vec<CylinderLayer>,
    surfaces: SurfaceMap,
    outer: Option<Rule>,
    cells: Vec<i32>,
}

impl PipeUnit {
    /// Creates segment `index` of the pipe `key` running from `a` to `b`,
    /// reserving its index block in `scene`.
    ///
    /// # Errors
    ///
    /// Returns an error if `a` and `b` coincide or the scene's register
    /// has no block left.
    pub fn new(key: &str, index: usize, a: Point3, b: Point3, scene: &mut Scene) -> Result<Self> {
        let run = b - a;
        let len = run.norm();
        if len < TOLERANCE {
            return Err(GeometryError::Degenerate("pipe segment has zero length".into()).into());
        }
        let axis = run / len;

        let key_name = format!("{key}:{index}");
        let surf_index = scene.register(&key_name)?;
        Ok(Self {
            key_name,
            index,
            surf_index,
            block_size: scene.block_size(),
            next_cell: surf_index + 1,
            state: UnitState::Unpopulated,
            prev: None,
            next: None,
            a_pt: a,
            b_pt: b,
            axis,
            a_norm: axis,
            b_norm: axis,
            active: 0,
            layers: Vec::new(),
            surfaces: SurfaceMap::new(),
            outer: None,
            cells: Vec::new(),
        })
    }

    // --- Accessors ---

    /// Registered name of the segment.
    #[must_use]
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Position of the segment in its pipe line.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Base of the segment's index block.
    #[must_use]
    pub fn surf_index(&self) -> i32 {
        self.surf_index
    }

    /// Current construction step.
    #[must_use]
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Start (`side == 0`) or end point.
    #[must_use]
    pub fn pt(&self, side: usize) -> &Point3 {
        if side == 0 {
            &self.a_pt
        } else {
            &self.b_pt
        }
    }

    /// Unit axis from start to end.
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Unit normal of the start cap.
    #[must_use]
    pub fn a_norm(&self) -> &Vector3 {
        &self.a_norm
    }

    /// Unit normal of the end cap.
    #[must_use]
    pub fn b_norm(&self) -> &Vector3 {
        &self.b_norm
    }

    /// Active-layer mask.
    #[must_use]
    pub fn active(&self) -> u32 {
        self.active
    }

    /// Layer schedule, innermost first.
    #[must_use]
    pub fn layers(&self) -> &[CylinderLayer] {
        &self.layers
    }

    /// Surfaces built by [`PipeUnit::create_surfaces`].
    #[must_use]
    pub fn surfaces(&self) -> &SurfaceMap {
        &self.surfaces
    }

    /// Outer solid, once computed.
    #[must_use]
    pub fn outer_rule(&self) -> Option<&Rule> {
        self.outer.as_ref()
    }

    /// Names of the cells committed by [`PipeUnit::create_objects`].
    #[must_use]
    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// Previous segment, if any.
    #[must_use]
    pub fn prev(&self) -> Option<UnitId> {
        self.prev
    }

    /// Next segment, if any.
    #[must_use]
    pub fn next(&self) -> Option<UnitId> {
        self.next
    }

    /// Links the segment feeding into this one.
    pub fn connect_from(&mut self, id: UnitId) {
        self.prev = Some(id);
    }

    /// Links the segment this one feeds into.
    pub fn connect_to(&mut self, id: UnitId) {
        self.next = Some(id);
    }

    // --- Construction steps ---

    /// Stores the layer data and computes the mitred cap normals.
    ///
    /// `prev_axis` and `next_axis` are the axes of the neighbouring
    /// segments. A cap shared with a neighbour is normal to the bisector
    /// of the two axes; a free end is normal to this segment's axis.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is out of order, the schedule is empty
    /// or does not fit the index block, the mask selects no layer, or a
    /// neighbour runs straight back.
    pub fn populate(
        &mut self,
        active: u32,
        layers: &[CylinderLayer],
        prev_axis: Option<Vector3>,
        next_axis: Option<Vector3>,
    ) -> Result<()> {
        self.expect_state(UnitState::Unpopulated)?;

        self.active = active;
        self.layers = layers.to_vec();
        self.outer_index()?;
        check_block(self.block_size, self.layers.len())?;

        self.a_norm = mitre(&self.axis, prev_axis)?;
        self.b_norm = mitre(&self.axis, next_axis)?;

        self.state = UnitState::GeometryComputed;
        tracing::debug!(unit = %self.key_name, "geometry computed");
        Ok(())
    }

    /// Builds both end caps and one cylinder per active layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is out of order or a surface is degenerate.
    pub fn create_surfaces(&mut self) -> Result<()> {
        self.expect_state(UnitState::GeometryComputed)?;

        self.surfaces
            .insert(self.surf_index + 5, Plane::from_normal(self.a_pt, self.a_norm)?)?;
        self.surfaces
            .insert(self.surf_index + 6, Plane::from_normal(self.b_pt, self.b_norm)?)?;

        let active: Vec<(usize, i32)> = self.active_layers().collect();
        for (i, si) in active {
            let cylinder = Cylinder::new(self.a_pt, self.axis, self.layers[i].radius)?;
            self.surfaces.insert(si + 7, cylinder)?;
        }

        self.state = UnitState::SurfacesBuilt;
        tracing::debug!(unit = %self.key_name, surfaces = self.surfaces.len(), "surfaces built");
        Ok(())
    }

    /// Index of the outermost active layer.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no layers or the mask selects none.
    pub fn outer_index(&self) -> Result<usize> {
        if self.layers.is_empty() {
            return Err(ConfigError::NoRadii.into());
        }
        (0..self.layers.len())
            .rev()
            .find(|&i| layer_active(self.active, i))
            .ok_or_else(|| {
                ConfigError::EmptyMask {
                    gap: self.index,
                    mask: self.active,
                    layers: self.layers.len(),
                }
                .into()
            })
    }

    /// Radius of the outermost active layer.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no layers or the mask selects none.
    pub fn outer_radius(&self) -> Result<f64> {
        Ok(self.layers[self.outer_index()?].radius)
    }

    /// Builds the solid the pipe occupies as seen from outside:
    /// the outer active cylinder between both caps.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is out of order.
    pub fn create_outer_object(&mut self) -> Result<()> {
        self.expect_state(UnitState::SurfacesBuilt)?;

        let outer = self.outer_index()?;
        let si = self.layer_base(outer);
        self.outer = Some(composite(
            &self.surfaces,
            &[si, self.surf_index],
            LAYER_REGION,
        )?);

        self.state = UnitState::OuterRegionComputed;
        Ok(())
    }

    /// Clause that removes the outer solid from a region.
    ///
    /// # Errors
    ///
    /// Returns an error if the outer solid has not been computed.
    pub fn exclude(&self) -> Result<Rule> {
        self.outer.as_ref().map(Rule::complement).ok_or_else(|| {
            PipeError::OutOfOrder {
                expected: UnitState::OuterRegionComputed,
                found: self.state,
            }
            .into()
        })
    }

    /// Names of the existing cells the outer solid intrudes into.
    ///
    /// Traces rays parallel to the axis on the outer radius, evenly spaced
    /// in angle, plus the axis itself, and collects every cell they cross.
    /// Cells touched only between sampled angles are missed.
    ///
    /// # Errors
    ///
    /// Returns an error if the outer solid has not been computed or a line
    /// track fails.
    pub fn find_intruded(&self, scene: &Scene, params: &InsertParams) -> Result<BTreeSet<i32>> {
        if self.outer.is_none() {
            return Err(PipeError::OutOfOrder {
                expected: UnitState::OuterRegionComputed,
                found: self.state,
            }
            .into());
        }

        let radius = self.outer_radius()?;
        let ax = perpendicular_dir(&self.axis);
        let ay = ax.cross(&self.axis);

        let mut offsets: Vec<Vector3> = (0..params.ray_count)
            .map(|i| {
                let angle = TAU * f64::from(i) / f64::from(params.ray_count);
                (ax * angle.cos() + ay * angle.sin()) * radius
            })
            .collect();
        if params.include_axis {
            offsets.push(Vector3::zeros());
        }

        let mut names = BTreeSet::new();
        for offset in offsets {
            let track = LineTrack::new(self.a_pt + offset, self.b_pt + offset).execute(scene)?;
            names.extend(track.names());
        }
        Ok(names)
    }

    /// Carves the outer solid out of every existing cell it intrudes into.
    ///
    /// The segment's surfaces are merged into the scene and the exclusion
    /// clause is appended to each intruded cell. Must be called once per
    /// segment: a second call would subtract the solid twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is out of order, an intruded cell is
    /// missing from the scene, or a surface handle collides.
    pub fn insert_objects(&mut self, scene: &mut Scene, params: &InsertParams) -> Result<BTreeSet<i32>> {
        self.expect_state(UnitState::OuterRegionComputed)?;

        let intruded = self.find_intruded(scene, params)?;
        if let Some(&name) = intruded.iter().find(|&&name| scene.find_cell(name).is_none()) {
            return Err(SceneError::MissingCell(name).into());
        }

        scene.merge_surfaces(&self.surfaces)?;
        let exclude = self.exclude()?;
        for &name in &intruded {
            scene.exclude_from(name, &exclude)?;
        }
        scene.populate_cells();

        self.state = UnitState::Inserted;
        tracing::debug!(unit = %self.key_name, cells = ?intruded, "excluded from cells");
        Ok(intruded)
    }

    /// Adds one cell per active layer, innermost first.
    ///
    /// Each cell is bounded by both caps, inside its own cylinder and
    /// outside the previous active one.
    ///
    /// # Errors
    ///
    /// Returns an error if the step is out of order or a cell name is taken.
    pub fn create_objects(&mut self, scene: &mut Scene) -> Result<()> {
        self.expect_state(UnitState::Inserted)?;

        let active: Vec<(usize, i32)> = self.active_layers().collect();
        let mut prev_base: Option<i32> = None;
        for (i, si) in active {
            let mut rule = composite(scene.surfaces(), &[si, self.surf_index], LAYER_REGION)?;
            if let Some(pb) = prev_base {
                rule = Rule::intersection([rule, composite(scene.surfaces(), &[pb], "7")?]);
            }

            let layer = self.layers[i];
            let name = self.next_cell;
            scene.add_cell(name, rule, layer.material, layer.temperature)?;
            self.next_cell += 1;
            self.cells.push(name);
            prev_base = Some(si);
        }

        self.state = UnitState::ObjectsCommitted;
        tracing::debug!(unit = %self.key_name, cells = ?self.cells, "objects committed");
        Ok(())
    }

    /// Runs every construction step in order.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step.
    pub fn create_all(
        &mut self,
        scene: &mut Scene,
        active: u32,
        layers: &[CylinderLayer],
        prev_axis: Option<Vector3>,
        next_axis: Option<Vector3>,
        params: &InsertParams,
    ) -> Result<()> {
        self.populate(active, layers, prev_axis, next_axis)?;
        self.create_surfaces()?;
        self.create_outer_object()?;
        self.insert_objects(scene, params)?;
        self.create_objects(scene)
    }

    // --- Helpers ---

    fn expect_state(&self, expected: UnitState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PipeError::OutOfOrder {
                expected,
                found: self.state,
            }
            .into())
        }
    }

    /// `(layer index, layer base)` for every layer, active or not.
    fn layer_bases(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        let bases = (0..).map_while(move |k: i32| {
            k.checked_mul(10)
                .and_then(|step| self.surf_index.checked_add(step))
        });
        (0..self.layers.len()).zip(bases)
    }

    fn active_layers(&self) -> impl Iterator<Item = (usize, i32)> + '_ {
        self.layer_bases()
            .filter(move |&(i, _)| layer_active(self.active, i))
    }

    fn layer_base(&self, index: usize) -> i32 {
        self.layer_bases()
            .nth(index)
            .map_or(self.surf_index, |(_, si)| si)
    }
}

/// Handles a segment with `layers` layers needs from its block: cells from
/// `+1`, caps at `+5` and `+6`, and cylinders up to `+7 + 10 (layers - 1)`.
pub(crate) fn block_span(layers: usize) -> Option<i32> {
    i32::try_from(layers).ok()?.checked_mul(10)?.checked_sub(2)
}

/// Checks that the handles of `layers` layers stay inside one block.
pub(crate) fn check_block(block_size: i32, layers: usize) -> Result<()> {
    if block_span(layers).is_some_and(|span| span <= block_size) {
        Ok(())
    } else {
        Err(ConfigError::BlockTooSmall { block_size, layers }.into())
    }
}

/// Unit normal of the cap between `axis` and a neighbouring axis.
fn mitre(axis: &Vector3, neighbour: Option<Vector3>) -> Result<Vector3> {
    let sum = neighbour.map_or(*axis, |other| axis + other);
    let len = sum.norm();
    if len < TOLERANCE {
        return Err(GeometryError::Degenerate("pipe runs straight back at a joint".into()).into());
    }
    Ok(sum / len)
}

use std::collections::{BTreeMap, BTreeSet};

use slotmap::SlotMap;

use crate::error::{Result, SceneError};
use crate::geometry::Surface;

use super::{Cell, Rule, SurfaceMap};

slotmap::new_key_type! {
    /// Unique identifier for a cell in the scene arena.
    pub struct CellId;
}

/// Default size of the index block handed out per registered component.
pub const DEFAULT_BLOCK_SIZE: i32 = 10_000;

/// The model being built: primitive table, ordered cells, and index register.
///
/// Cells are never removed, so iteration follows insertion order. The first
/// index block `[0, block_size)` is left to hand-numbered cells and surfaces;
/// [`Scene::register`] hands out the blocks above it.
#[derive(Debug)]
pub struct Scene {
    surfaces: SurfaceMap,
    cells: SlotMap<CellId, Cell>,
    names: BTreeMap<i32, CellId>,
    register: BTreeMap<String, i32>,
    block_size: i32,
    next_block: i32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scene whose register hands out blocks of `block_size`.
    #[must_use]
    pub fn with_block_size(block_size: i32) -> Self {
        let block_size = block_size.max(1);
        Self {
            surfaces: SurfaceMap::new(),
            cells: SlotMap::with_key(),
            names: BTreeMap::new(),
            register: BTreeMap::new(),
            block_size,
            next_block: block_size,
        }
    }

    // --- Index register ---

    /// Returns the index block reserved for `key`, allocating it on first use.
    ///
    /// Blocks are allocated monotonically and never reused. Every handle
    /// `offset..offset + block_size` of a returned block fits in `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::RegisterExhausted`] if no whole block is left.
    pub fn register(&mut self, key: &str) -> Result<i32> {
        if let Some(&offset) = self.register.get(key) {
            return Ok(offset);
        }
        let offset = self.next_block;
        self.next_block = offset
            .checked_add(self.block_size)
            .ok_or_else(|| SceneError::RegisterExhausted(key.to_owned()))?;
        self.register.insert(key.to_owned(), offset);
        tracing::trace!(key, offset, "registered index block");
        Ok(offset)
    }

    /// Number of handles in each registered block.
    #[must_use]
    pub fn block_size(&self) -> i32 {
        self.block_size
    }

    /// Returns the block of a previously registered key.
    #[must_use]
    pub fn registered(&self, key: &str) -> Option<i32> {
        self.register.get(key).copied()
    }

    // --- Surface operations ---

    /// Returns the scene's primitive table.
    #[must_use]
    pub fn surfaces(&self) -> &SurfaceMap {
        &self.surfaces
    }

    /// Adds a single surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is invalid or taken.
    pub fn add_surface(&mut self, handle: i32, surface: impl Into<Surface>) -> Result<()> {
        self.surfaces.insert(handle, surface)
    }

    /// Merges a component's local primitive table into the scene.
    ///
    /// # Errors
    ///
    /// Returns an error if any handle collides; nothing is merged in that case.
    pub fn merge_surfaces(&mut self, local: &SurfaceMap) -> Result<()> {
        self.surfaces.merge(local)
    }

    // --- Cell operations ---

    /// Adds a cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the region references a
    /// surface not in the scene.
    pub fn add_cell(
        &mut self,
        name: i32,
        rule: Rule,
        material: i32,
        temperature: f64,
    ) -> Result<CellId> {
        if self.names.contains_key(&name) {
            return Err(SceneError::DuplicateCell(name).into());
        }
        rule.validate(&self.surfaces)?;
        let id = self.cells.insert(Cell::new(name, rule, material, temperature));
        self.names.insert(name, id);
        Ok(id)
    }

    /// Looks up a cell by name.
    #[must_use]
    pub fn find_cell(&self, name: i32) -> Option<&Cell> {
        self.names.get(&name).and_then(|&id| self.cells.get(id))
    }

    /// Looks up a cell's arena id by name.
    #[must_use]
    pub fn cell_id(&self, name: i32) -> Option<CellId> {
        self.names.get(&name).copied()
    }

    /// Returns the cell for an arena id.
    #[must_use]
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Returns a mutable reference to a cell by name.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::MissingCell`] if no cell has that name.
    pub fn cell_mut(&mut self, name: i32) -> Result<&mut Cell> {
        self.names
            .get(&name)
            .and_then(|&id| self.cells.get_mut(id))
            .ok_or_else(|| SceneError::MissingCell(name).into())
    }

    /// Iterates over `(id, cell)` in insertion order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter()
    }

    /// Number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Appends `exclude` to the region of the named cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell is missing or `exclude` references a
    /// surface not in the scene.
    pub fn exclude_from(&mut self, name: i32, exclude: &Rule) -> Result<()> {
        exclude.validate(&self.surfaces)?;
        self.cell_mut(name)?.add_exclude(exclude);
        Ok(())
    }

    /// Rebuilds the surface list of every cell whose region has changed.
    pub fn populate_cells(&mut self) {
        for cell in self.cells.values_mut().filter(|c| c.needs_rebuild()) {
            cell.populate();
        }
    }

    /// Checks that every cell region resolves against the primitive table.
    ///
    /// # Errors
    ///
    /// Returns the first dangling reference found.
    pub fn validate(&self) -> Result<()> {
        for cell in self.cells.values() {
            cell.rule().validate(&self.surfaces)?;
        }
        Ok(())
    }

    /// Surfaces referenced by at least one cell.
    #[must_use]
    pub fn referenced_surfaces(&self) -> BTreeSet<i32> {
        self.cells
            .values()
            .flat_map(|c| c.rule().references())
            .map(i32::abs)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ExpressionError;
    use crate::geometry::Plane;
    use crate::math::{Point3, Vector3};
    use crate::PipenetError;

    fn slab_scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .add_surface(1, Plane::from_normal(Point3::origin(), Vector3::x()).unwrap())
            .unwrap();
        scene
            .add_surface(2, Plane::from_normal(Point3::new(5.0, 0.0, 0.0), Vector3::x()).unwrap())
            .unwrap();
        scene
    }

    #[test]
    fn register_is_monotonic_and_stable() {
        let mut scene = Scene::with_block_size(100);
        let a = scene.register("pipe1").unwrap();
        let b = scene.register("pipe2").unwrap();
        assert_eq!(a, 100);
        assert_eq!(b, 200);
        assert_eq!(scene.register("pipe1").unwrap(), a);
        assert_eq!(scene.registered("pipe2"), Some(b));
        assert_eq!(scene.registered("pipe3"), None);
    }

    #[test]
    fn register_reports_exhaustion() {
        let mut scene = Scene::with_block_size(1 << 30);
        assert!(matches!(
            scene.register("a"),
            Err(PipenetError::Scene(SceneError::RegisterExhausted(_)))
        ));

        let mut scene = Scene::with_block_size(1 << 29);
        assert_eq!(scene.register("a").unwrap(), 1 << 29);
        assert_eq!(scene.register("b").unwrap(), 1 << 30);
        assert!(matches!(
            scene.register("c"),
            Err(PipenetError::Scene(SceneError::RegisterExhausted(key))) if key == "c"
        ));
        assert_eq!(scene.registered("c"), None);
        assert_eq!(scene.register("a").unwrap(), 1 << 29);
    }

    #[test]
    fn cells_keep_insertion_order() {
        let mut scene = slab_scene();
        scene.add_cell(20, "-1".parse().unwrap(), 0, 0.0).unwrap();
        scene.add_cell(10, "1 -2".parse().unwrap(), 3, 0.0).unwrap();
        scene.add_cell(30, "2".parse().unwrap(), 0, 0.0).unwrap();
        let names: Vec<i32> = scene.cells().map(|(_, c)| c.name()).collect();
        assert_eq!(names, vec![20, 10, 30]);
        assert_eq!(scene.find_cell(10).unwrap().material(), 3);
        let id = scene.cell_id(30).unwrap();
        assert_eq!(scene.cell(id).unwrap().name(), 30);
    }

    #[test]
    fn duplicate_and_dangling_cells_rejected() {
        let mut scene = slab_scene();
        scene.add_cell(1, "1 -2".parse().unwrap(), 0, 0.0).unwrap();
        assert!(matches!(
            scene.add_cell(1, "2".parse().unwrap(), 0, 0.0),
            Err(PipenetError::Scene(SceneError::DuplicateCell(1)))
        ));
        assert!(matches!(
            scene.add_cell(2, "1 -3".parse().unwrap(), 0, 0.0),
            Err(PipenetError::Expression(ExpressionError::UnknownSurface(3)))
        ));
        assert_eq!(scene.cell_count(), 1);
    }

    #[test]
    fn exclude_from_missing_cell() {
        let mut scene = slab_scene();
        assert!(matches!(
            scene.exclude_from(42, &Rule::Surface(1)),
            Err(PipenetError::Scene(SceneError::MissingCell(42)))
        ));
    }

    #[test]
    fn populate_clears_rebuild_flags() {
        let mut scene = slab_scene();
        scene.add_cell(1, "-1".parse().unwrap(), 0, 0.0).unwrap();
        scene.exclude_from(1, &Rule::Surface(-2)).unwrap();
        assert!(scene.find_cell(1).unwrap().needs_rebuild());
        scene.populate_cells();
        let cell = scene.find_cell(1).unwrap();
        assert!(!cell.needs_rebuild());
        assert_eq!(cell.surface_list().len(), 2);
        assert_eq!(scene.referenced_surfaces().len(), 2);
        scene.validate().unwrap();
    }
}

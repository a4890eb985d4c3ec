use std::collections::BTreeSet;

use crate::error::ExpressionError;
use crate::math::Point3;

use super::{Rule, SurfaceMap};

/// A scene object: a named region of space filled with one material.
#[derive(Debug, Clone)]
pub struct Cell {
    name: i32,
    rule: Rule,
    material: i32,
    temperature: f64,
    surface_list: BTreeSet<i32>,
    needs_rebuild: bool,
}

impl Cell {
    /// Creates a cell. Material `0` is void.
    #[must_use]
    pub fn new(name: i32, rule: Rule, material: i32, temperature: f64) -> Self {
        let surface_list = rule.surfaces();
        Self {
            name,
            rule,
            material,
            temperature,
            surface_list,
            needs_rebuild: false,
        }
    }

    /// Unique cell name.
    #[must_use]
    pub fn name(&self) -> i32 {
        self.name
    }

    /// Region expression of the cell.
    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Material number (`0` for void).
    #[must_use]
    pub fn material(&self) -> i32 {
        self.material
    }

    /// Temperature in kelvin (`0` for the default).
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Surfaces bounding the cell as of the last [`Cell::populate`].
    #[must_use]
    pub fn surface_list(&self) -> &BTreeSet<i32> {
        &self.surface_list
    }

    /// Returns `true` if the region changed since the surface list was built.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// Intersects the region with `exclude`, which is appended, not substituted.
    ///
    /// The caller is responsible for not appending the same clause twice.
    pub fn add_exclude(&mut self, exclude: &Rule) {
        let rule = std::mem::replace(&mut self.rule, Rule::Intersection(Vec::new()));
        self.rule = Rule::intersection([rule, exclude.clone()]);
        self.needs_rebuild = true;
    }

    /// Re-derives the surface list from the region.
    pub fn populate(&mut self) {
        self.surface_list = self.rule.surfaces();
        self.needs_rebuild = false;
    }

    /// Tests whether `point` lies in the cell.
    ///
    /// # Errors
    ///
    /// Returns an error if the region references a surface missing from `surfaces`.
    pub fn is_inside(&self, point: &Point3, surfaces: &SurfaceMap) -> Result<bool, ExpressionError> {
        self.rule.is_inside(point, surfaces)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn exclude_appends_clause() {
        let mut cell = Cell::new(1, "1 -2".parse().unwrap(), 5, 300.0);
        assert!(!cell.needs_rebuild());

        let exclude: Rule = "7 : -5 : 6".parse().unwrap();
        cell.add_exclude(&exclude);
        assert_eq!(cell.rule().to_string(), "1 -2 (7 : -5 : 6)");
        assert!(cell.needs_rebuild());
        assert_eq!(cell.surface_list().len(), 2);

        cell.populate();
        assert!(!cell.needs_rebuild());
        assert_eq!(
            cell.surface_list().iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 5, 6, 7]
        );
    }

    #[test]
    fn exclude_on_single_reference_cell() {
        let mut cell = Cell::new(3, Rule::Surface(-4), 0, 0.0);
        cell.add_exclude(&"8 : 9".parse().unwrap());
        assert_eq!(cell.rule().to_string(), "-4 (8 : 9)");
    }
}

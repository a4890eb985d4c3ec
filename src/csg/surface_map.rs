use std::collections::BTreeMap;

use crate::error::{ExpressionError, SceneError};
use crate::geometry::Surface;

/// Table of primitive surfaces keyed by positive integer handle.
///
/// References inside a [`Rule`](super::Rule) carry a sign selecting the side
/// of the surface; the handle stored here is always the absolute value.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMap {
    surfaces: BTreeMap<i32, Surface>,
}

impl SurfaceMap {
    /// Creates an empty surface table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `surface` under `handle`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not positive or is already taken.
    pub fn insert(&mut self, handle: i32, surface: impl Into<Surface>) -> crate::Result<()> {
        if handle <= 0 {
            return Err(ExpressionError::InvalidHandle(handle).into());
        }
        if self.surfaces.contains_key(&handle) {
            return Err(SceneError::DuplicateSurface(handle).into());
        }
        self.surfaces.insert(handle, surface.into());
        Ok(())
    }

    /// Looks up the surface for a signed reference.
    ///
    /// # Errors
    ///
    /// Returns an error if no surface is registered under `|reference|`.
    pub fn get(&self, reference: i32) -> Result<&Surface, ExpressionError> {
        self.surfaces
            .get(&reference.abs())
            .ok_or(ExpressionError::UnknownSurface(reference.abs()))
    }

    /// Returns `true` if a surface exists for the signed reference.
    #[must_use]
    pub fn contains(&self, reference: i32) -> bool {
        self.surfaces.contains_key(&reference.abs())
    }

    /// Number of surfaces in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Returns `true` if the table holds no surfaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Iterates over `(handle, surface)` in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Surface)> {
        self.surfaces.iter().map(|(&h, s)| (h, s))
    }

    /// Moves every surface of `other` into this table.
    ///
    /// Nothing is merged if any handle collides.
    ///
    /// # Errors
    ///
    /// Returns an error if a handle of `other` already exists here.
    pub fn merge(&mut self, other: &SurfaceMap) -> crate::Result<()> {
        if let Some(&handle) = other.surfaces.keys().find(|h| self.surfaces.contains_key(h)) {
            return Err(SceneError::DuplicateSurface(handle).into());
        }
        self.surfaces
            .extend(other.surfaces.iter().map(|(&h, s)| (h, s.clone())));
        Ok(())
    }
}

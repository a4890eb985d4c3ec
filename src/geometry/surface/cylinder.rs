use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

/// An infinite circular cylinder in 3D space.
///
/// Defined by a point on the axis, a unit axis direction and a radius.
/// The positive side is outside the cylinder.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    center: Point3,
    axis: Vector3,
    radius: f64,
}

impl Cylinder {
    /// Builds the cylinder of `radius` about the line through `center`
    /// along `axis`. The axis is stored normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive or the axis vanishes.
    pub fn new(center: Point3, axis: Vector3, radius: f64) -> Result<Self> {
        if radius.is_nan() || radius < TOLERANCE {
            return Err(GeometryError::NonPositiveRadius(radius).into());
        }
        let norm = axis.norm();
        if norm < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            center,
            axis: axis / norm,
            radius,
        })
    }

    /// A point on the axis.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Unit axis direction.
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Component of `v` perpendicular to the axis.
    #[must_use]
    pub fn radial(&self, v: &Vector3) -> Vector3 {
        v - self.axis * v.dot(&self.axis)
    }

    /// Signed radial distance from the surface: positive outside, negative inside.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.radial(&(point - self.center)).norm() - self.radius
    }
}

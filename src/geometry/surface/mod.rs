mod cylinder;
mod plane;

pub use cylinder::Cylinder;
pub use plane::Plane;

use crate::math::intersect_3d::{
    line_cylinder_intersect, line_plane_intersect, LineCylinderRelation, LinePlaneRelation,
};
use crate::math::{Point3, Vector3, TOLERANCE};

/// Which side of a surface a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSide {
    /// Along the plane normal, or outside the cylinder.
    Positive,
    /// Against the plane normal, or inside the cylinder.
    Negative,
    /// On the surface (within tolerance).
    On,
}

impl SurfaceSide {
    /// Returns `true` if a reference with the given sign accepts this side.
    ///
    /// Points on the surface are accepted by both senses, so halfspaces
    /// are closed.
    #[must_use]
    pub fn accepts(self, positive: bool) -> bool {
        match self {
            Self::On => true,
            Self::Positive => positive,
            Self::Negative => !positive,
        }
    }
}

/// A halfspace-bounding primitive surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// A planar surface.
    Plane(Plane),
    /// A cylindrical surface.
    Cylinder(Cylinder),
}

impl Surface {
    /// Signed value of the surface function at `point`.
    ///
    /// For both kinds this is a true signed distance, so the same tolerance
    /// applies everywhere.
    #[must_use]
    pub fn side_value(&self, point: &Point3) -> f64 {
        match self {
            Self::Plane(plane) => plane.signed_distance(point),
            Self::Cylinder(cylinder) => cylinder.signed_distance(point),
        }
    }

    /// Classifies `point` against the surface.
    #[must_use]
    pub fn side(&self, point: &Point3) -> SurfaceSide {
        let value = self.side_value(point);
        if value > TOLERANCE {
            SurfaceSide::Positive
        } else if value < -TOLERANCE {
            SurfaceSide::Negative
        } else {
            SurfaceSide::On
        }
    }

    /// Parameters `t` at which the line `origin + t * dir` crosses the surface.
    ///
    /// A line lying in the surface has no isolated crossings and yields an
    /// empty list. The result is unsorted.
    #[must_use]
    pub fn line_crossings(&self, origin: &Point3, dir: &Vector3) -> Vec<f64> {
        match self {
            Self::Plane(plane) => match line_plane_intersect(origin, dir, plane) {
                LinePlaneRelation::Crossing { t } => vec![t],
                LinePlaneRelation::Parallel | LinePlaneRelation::OnPlane => Vec::new(),
            },
            Self::Cylinder(cylinder) => match line_cylinder_intersect(origin, dir, cylinder) {
                LineCylinderRelation::Secant { t0, t1 } => vec![t0, t1],
                LineCylinderRelation::Tangent { t } => vec![t],
                LineCylinderRelation::Miss
                | LineCylinderRelation::Parallel
                | LineCylinderRelation::OnSurface => Vec::new(),
            },
        }
    }
}

impl From<Plane> for Surface {
    fn from(plane: Plane) -> Self {
        Self::Plane(plane)
    }
}

impl From<Cylinder> for Surface {
    fn from(cylinder: Cylinder) -> Self {
        Self::Cylinder(cylinder)
    }
}

use crate::geometry::surface::{Cylinder, Plane};

use super::{Point3, Vector3, TOLERANCE};

/// How a line `origin + t * dir` meets a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinePlaneRelation {
    /// The line crosses the plane once, at parameter `t`.
    Crossing { t: f64 },
    /// The line runs alongside the plane without touching it.
    Parallel,
    /// The line lies in the plane.
    OnPlane,
}

/// Crossing parameter of the line `origin + t * dir` with `plane`.
///
/// `dir` need not be a unit vector; `t` is measured in multiples of it.
#[must_use]
pub fn line_plane_intersect(origin: &Point3, dir: &Vector3, plane: &Plane) -> LinePlaneRelation {
    let normal = plane.plane_normal();
    let rate = normal.dot(dir);
    let offset = plane.signed_distance(origin);

    if rate.abs() >= TOLERANCE * dir.norm().max(1.0) {
        LinePlaneRelation::Crossing { t: -offset / rate }
    } else if offset.abs() < TOLERANCE {
        LinePlaneRelation::OnPlane
    } else {
        LinePlaneRelation::Parallel
    }
}

/// Relationship of a line with an infinite cylinder.
#[derive(Debug)]
pub enum LineCylinderRelation {
    /// Line enters and leaves the cylinder at `t0 < t1`.
    Secant { t0: f64, t1: f64 },
    /// Line touches the cylinder at a single parameter.
    Tangent { t: f64 },
    /// Line passes outside the cylinder.
    Miss,
    /// Line is parallel to the axis and off the surface.
    Parallel,
    /// Line is parallel to the axis and lies in the surface.
    OnSurface,
}

/// Computes the intersection of a line `origin + t * dir` with a cylinder.
///
/// Solves `|w + t u|^2 = r^2` where `w` and `u` are the components of
/// `origin - center` and `dir` perpendicular to the axis.
#[must_use]
pub fn line_cylinder_intersect(
    origin: &Point3,
    dir: &Vector3,
    cylinder: &Cylinder,
) -> LineCylinderRelation {
    let w = cylinder.radial(&(origin - cylinder.center()));
    let u = cylinder.radial(dir);
    let r = cylinder.radius();

    let a = u.dot(&u);
    let c = w.dot(&w) - r * r;

    if u.norm() < TOLERANCE * dir.norm().max(1.0) {
        return if (w.norm() - r).abs() < TOLERANCE {
            LineCylinderRelation::OnSurface
        } else {
            LineCylinderRelation::Parallel
        };
    }

    let b = 2.0 * w.dot(&u);
    let disc = b * b - 4.0 * a * c;
    let scale = (b * b).max((4.0 * a * c).abs()).max(TOLERANCE);

    if disc < -TOLERANCE * scale {
        LineCylinderRelation::Miss
    } else if disc <= TOLERANCE * scale {
        LineCylinderRelation::Tangent { t: -b / (2.0 * a) }
    } else {
        let root = disc.sqrt();
        let t0 = (-b - root) / (2.0 * a);
        let t1 = (-b + root) / (2.0 * a);
        LineCylinderRelation::Secant { t0, t1 }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    // ── line_plane_intersect ──

    #[test]
    fn segment_crosses_plane_midway() {
        let plane = Plane::from_normal(p(0.0, 4.0, 0.0), v(0.0, 1.0, 0.0)).unwrap();
        let relation = line_plane_intersect(&p(1.0, 0.0, 2.0), &v(0.0, 8.0, 0.0), &plane);
        assert_eq!(relation, LinePlaneRelation::Crossing { t: 0.5 });
    }

    #[test]
    fn crossing_behind_origin_is_negative() {
        let plane = Plane::from_normal(p(0.0, 0.0, 0.0), v(1.0, 1.0, 0.0)).unwrap();
        match line_plane_intersect(&p(2.0, 2.0, 0.0), &v(1.0, 0.0, 0.0), &plane) {
            LinePlaneRelation::Crossing { t } => assert!((t + 4.0).abs() < 1e-9),
            other => panic!("expected Crossing, got {other:?}"),
        }
    }

    #[test]
    fn lines_alongside_plane() {
        let plane = Plane::from_normal(p(0.0, 0.0, 1.0), v(0.0, 0.0, -1.0)).unwrap();
        assert_eq!(
            line_plane_intersect(&p(0.0, 0.0, 3.0), &v(2.0, -1.0, 0.0), &plane),
            LinePlaneRelation::Parallel
        );
        assert_eq!(
            line_plane_intersect(&p(5.0, 5.0, 1.0), &v(0.0, 3.0, 0.0), &plane),
            LinePlaneRelation::OnPlane
        );
    }

    // ── line_cylinder_intersect ──

    #[test]
    fn line_crosses_cylinder() {
        let cyl = Cylinder::new(p(0.0, 0.0, 0.0), v(0.0, 0.0, 1.0), 2.0).unwrap();
        match line_cylinder_intersect(&p(-5.0, 0.0, 3.0), &v(1.0, 0.0, 0.0), &cyl) {
            LineCylinderRelation::Secant { t0, t1 } => {
                assert!((t0 - 3.0).abs() < 1e-9);
                assert!((t1 - 7.0).abs() < 1e-9);
            }
            other => panic!("expected Secant, got {other:?}"),
        }
    }

    #[test]
    fn oblique_line_crosses_cylinder() {
        // Direction has an axial component that must not affect the radial solve.
        let cyl = Cylinder::new(p(0.0, 0.0, 0.0), v(0.0, 0.0, 1.0), 1.0).unwrap();
        match line_cylinder_intersect(&p(-2.0, 0.0, 0.0), &v(4.0, 0.0, 10.0), &cyl) {
            LineCylinderRelation::Secant { t0, t1 } => {
                assert!((t0 - 0.25).abs() < 1e-9);
                assert!((t1 - 0.75).abs() < 1e-9);
            }
            other => panic!("expected Secant, got {other:?}"),
        }
    }

    #[test]
    fn line_misses_cylinder() {
        let cyl = Cylinder::new(p(0.0, 0.0, 0.0), v(0.0, 0.0, 1.0), 1.0).unwrap();
        let result = line_cylinder_intersect(&p(-5.0, 3.0, 0.0), &v(1.0, 0.0, 0.0), &cyl);
        assert!(matches!(result, LineCylinderRelation::Miss));
    }

    #[test]
    fn line_tangent_to_cylinder() {
        let cyl = Cylinder::new(p(0.0, 0.0, 0.0), v(0.0, 0.0, 1.0), 1.0).unwrap();
        match line_cylinder_intersect(&p(-5.0, 1.0, 0.0), &v(1.0, 0.0, 0.0), &cyl) {
            LineCylinderRelation::Tangent { t } => assert!((t - 5.0).abs() < 1e-6),
            other => panic!("expected Tangent, got {other:?}"),
        }
    }

    #[test]
    fn axial_lines() {
        let cyl = Cylinder::new(p(0.0, 0.0, 0.0), v(0.0, 0.0, 1.0), 1.0).unwrap();
        assert!(matches!(
            line_cylinder_intersect(&p(0.5, 0.0, 0.0), &v(0.0, 0.0, 1.0), &cyl),
            LineCylinderRelation::Parallel
        ));
        assert!(matches!(
            line_cylinder_intersect(&p(0.0, 1.0, 0.0), &v(0.0, 0.0, 4.0), &cyl),
            LineCylinderRelation::OnSurface
        ));
    }
}

use crate::error::Result;

use super::parse::parse_rule;
use super::{Rule, SurfaceMap};

/// Builds a rule from a compact offset expression and binds it to `surfaces`.
///
/// Every reference in `expr` is shifted by one of `offsets`: plain numbers
/// by `offsets[0]`, numbers suffixed `M` by `offsets[1]` and `N` by
/// `offsets[2]`. With `offsets = [120, 100]`, `"-7 5M -6M"` becomes
/// `-127 105 -106`.
///
/// # Errors
///
/// Returns an error if `expr` does not parse or references a surface that
/// is not in `surfaces`.
pub fn composite(surfaces: &SurfaceMap, offsets: &[i32], expr: &str) -> Result<Rule> {
    let rule = parse_rule(expr, offsets)?;
    rule.validate(surfaces)?;
    Ok(rule)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ExpressionError;
    use crate::geometry::{Cylinder, Plane};
    use crate::math::{Point3, Vector3};
    use crate::PipenetError;

    fn pipe_surfaces(base: i32) -> SurfaceMap {
        let mut map = SurfaceMap::new();
        map.insert(base + 5, Plane::from_normal(Point3::origin(), Vector3::y()).unwrap())
            .unwrap();
        map.insert(
            base + 6,
            Plane::from_normal(Point3::new(0.0, 10.0, 0.0), Vector3::y()).unwrap(),
        )
        .unwrap();
        for i in 0..2 {
            map.insert(
                base + 7 + 10 * i,
                Cylinder::new(Point3::origin(), Vector3::y(), f64::from(i + 1)).unwrap(),
            )
            .unwrap();
        }
        map
    }

    #[test]
    fn layer_between_cylinders() {
        let surfaces = pipe_surfaces(100);
        let rule = composite(&surfaces, &[110, 100], "-7 5M -6M").unwrap();
        let rule = Rule::intersection([rule, composite(&surfaces, &[100], "7").unwrap()]);
        assert_eq!(rule.to_string(), "-117 105 -106 107");
    }

    #[test]
    fn exclusion_clause_is_union_of_negations() {
        let surfaces = pipe_surfaces(100);
        let outer = composite(&surfaces, &[110, 100], " -7 5M -6M ").unwrap();
        assert_eq!(outer.complement().to_string(), "117 : -105 : 106");
    }

    #[test]
    fn unbound_reference_is_fatal() {
        let surfaces = pipe_surfaces(100);
        let result = composite(&surfaces, &[120, 100], "-7 5M -6M");
        assert!(matches!(
            result,
            Err(PipenetError::Expression(ExpressionError::UnknownSurface(127)))
        ));
    }
}

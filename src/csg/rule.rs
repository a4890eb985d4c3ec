use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ExpressionError;
use crate::math::Point3;

use super::parse::parse_rule;
use super::SurfaceMap;

/// A boolean region expression over signed surface references.
///
/// `Surface(h)` with `h > 0` selects the positive side of surface `|h|`,
/// `h < 0` the negative side. Equality is structural: two rules that accept
/// the same point set but are written differently compare unequal.
///
/// The builders [`Rule::intersection`] and [`Rule::union`] flatten nested
/// operators of the same kind and collapse single-element groups, so a
/// non-empty rule built through them prints and re-parses to an equal value.
/// An empty intersection accepts every point and an empty union accepts
/// none; both print as an empty string, which does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A signed reference to a primitive surface.
    Surface(i32),
    /// All children must accept the point.
    Intersection(Vec<Rule>),
    /// At least one child must accept the point.
    Union(Vec<Rule>),
    /// The child must reject the point.
    Complement(Box<Rule>),
}

impl Rule {
    /// Builds the intersection of `rules`.
    #[must_use]
    pub fn intersection(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut flat = Vec::new();
        for rule in rules {
            match rule {
                Self::Intersection(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Self::Intersection(flat)
        }
    }

    /// Builds the union of `rules`.
    #[must_use]
    pub fn union(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut flat = Vec::new();
        for rule in rules {
            match rule {
                Self::Union(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Self::Union(flat)
        }
    }

    /// Returns the complement with negation pushed down to the references.
    ///
    /// `-7 5 -6` becomes `7 : -5 : 6`; the result contains no
    /// [`Rule::Complement`] node.
    #[must_use]
    pub fn complement(&self) -> Self {
        match self {
            Self::Surface(handle) => Self::Surface(-handle),
            Self::Intersection(children) => Self::union(children.iter().map(Self::complement)),
            Self::Union(children) => Self::intersection(children.iter().map(Self::complement)),
            Self::Complement(inner) => inner.normalized(),
        }
    }

    fn normalized(&self) -> Self {
        match self {
            Self::Surface(handle) => Self::Surface(*handle),
            Self::Intersection(children) => Self::intersection(children.iter().map(Self::normalized)),
            Self::Union(children) => Self::union(children.iter().map(Self::normalized)),
            Self::Complement(inner) => inner.complement(),
        }
    }

    /// Tests whether `point` lies in the region.
    ///
    /// Points on a surface satisfy both senses of that surface.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::UnknownSurface`] if an evaluated reference
    /// has no surface in `surfaces`.
    pub fn is_inside(&self, point: &Point3, surfaces: &SurfaceMap) -> Result<bool, ExpressionError> {
        match self {
            Self::Surface(handle) => Ok(surfaces.get(*handle)?.side(point).accepts(*handle > 0)),
            Self::Intersection(children) => {
                for child in children {
                    if !child.is_inside(point, surfaces)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Union(children) => {
                for child in children {
                    if child.is_inside(point, surfaces)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Complement(inner) => Ok(!inner.is_inside(point, surfaces)?),
        }
    }

    /// Signed references in order of appearance.
    #[must_use]
    pub fn references(&self) -> Vec<i32> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<i32>) {
        match self {
            Self::Surface(handle) => out.push(*handle),
            Self::Intersection(children) | Self::Union(children) => {
                for child in children {
                    child.collect_references(out);
                }
            }
            Self::Complement(inner) => inner.collect_references(out),
        }
    }

    /// Absolute surface handles used by the rule.
    #[must_use]
    pub fn surfaces(&self) -> BTreeSet<i32> {
        self.references().into_iter().map(i32::abs).collect()
    }

    /// Checks that every reference resolves in `surfaces`.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::UnknownSurface`] for the first dangling reference.
    pub fn validate(&self, surfaces: &SurfaceMap) -> Result<(), ExpressionError> {
        match self.references().into_iter().find(|&h| !surfaces.contains(h)) {
            Some(handle) => Err(ExpressionError::UnknownSurface(handle.abs())),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(handle) => write!(f, "{handle}"),
            Self::Intersection(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match child {
                        Self::Union(_) | Self::Intersection(_) => write!(f, "({child})")?,
                        _ => write!(f, "{child}")?,
                    }
                }
                Ok(())
            }
            Self::Union(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" : ")?;
                    }
                    match child {
                        Self::Union(_) => write!(f, "({child})")?,
                        _ => write!(f, "{child}")?,
                    }
                }
                Ok(())
            }
            Self::Complement(inner) => write!(f, "-({inner})"),
        }
    }
}

impl FromStr for Rule {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rule(s, &[0])
    }
}

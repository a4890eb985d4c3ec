//! Constructive-solid-geometry pipe networks.
//!
//! A [`csg::Scene`] holds a table of primitive surfaces and an ordered list
//! of cells, each a boolean region over signed surface references. A
//! [`pipe::PipeLine`] turns a polyline and a layer schedule into concentric
//! cylinder cells and carves them out of whatever cells they pass through,
//! using [`track::LineTrack`] as the only spatial query.

pub mod csg;
pub mod error;
pub mod geometry;
pub mod math;
pub mod pipe;
pub mod track;

pub use error::{PipenetError, Result};

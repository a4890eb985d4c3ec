//! Scene data model: primitive table, region expressions, and cells.

mod cell;
mod composite;
mod parse;
mod rule;
mod scene;
mod surface_map;

pub use cell::Cell;
pub use composite::composite;
pub use rule::Rule;
pub use scene::{CellId, Scene, DEFAULT_BLOCK_SIZE};
pub use surface_map::SurfaceMap;

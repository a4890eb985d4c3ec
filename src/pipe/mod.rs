pub mod layer;
pub mod line;
pub mod unit;

pub use layer::{layer_active, CylinderLayer};
pub use line::PipeLine;
pub use unit::{InsertParams, PipeUnit, UnitId, UnitState};

pub mod surface;

pub use surface::{Cylinder, Plane, Surface, SurfaceSide};

//! Spatial queries along straight lines through a scene.

mod cell_distance;
mod line_track;

pub use cell_distance::CellDistance;
pub use line_track::{LineTrack, TrackParams, TrackResult, TrackSegment};

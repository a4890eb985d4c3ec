//! Builds a small pipe network through a two-room model and prints the
//! resulting cells.
//!
//! Usage:
//! ```text
//! cargo run --example pipe_network
//! RUST_LOG=pipenet=debug cargo run --example pipe_network
//! ```

use pipenet::csg::Scene;
use pipenet::geometry::Plane;
use pipenet::math::{Point3, Vector3};
use pipenet::pipe::{CylinderLayer, PipeLine};
use pipenet::track::LineTrack;
use pipenet::PipenetError;

const WATER: i32 = 11;
const STEEL: i32 = 26;
const AIR: i32 = 5;

/// Box [-100, 100]^3 split at x = 0 into cells 1 (left) and 2 (right).
fn two_rooms() -> Result<Scene, PipenetError> {
    let mut scene = Scene::new();
    let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
    let mut handle = 1;
    for axis in axes {
        scene.add_surface(handle, Plane::from_normal(Point3::origin() - axis * 100.0, axis)?)?;
        scene.add_surface(handle + 1, Plane::from_normal(Point3::origin() + axis * 100.0, axis)?)?;
        handle += 2;
    }
    scene.add_surface(7, Plane::from_normal(Point3::origin(), Vector3::x())?)?;

    scene.add_cell(1, "1 -7 3 -4 5 -6".parse()?, AIR, 0.0)?;
    scene.add_cell(2, "7 -2 3 -4 5 -6".parse()?, AIR, 0.0)?;
    Ok(scene)
}

fn main() -> Result<(), PipenetError> {
    // Default: WARN for everything, INFO for pipenet.
    // Override with RUST_LOG env var (e.g. RUST_LOG=pipenet=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("pipenet=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut scene = two_rooms()?;

    let mut line = PipeLine::new("coolant");
    line.set_points(&[
        Point3::new(-60.0, -20.0, 0.0),
        Point3::new(-20.0, -20.0, 0.0),
        Point3::new(30.0, 20.0, 0.0),
        Point3::new(30.0, 20.0, 40.0),
    ]);
    line.add_radius(CylinderLayer::new(2.0, WATER, 300.0))?;
    line.add_radius(CylinderLayer::new(2.5, STEEL, 300.0))?;
    line.add_radius(CylinderLayer::new(4.0, 0, 0.0))?;
    // Last leg is bare pipe: no insulation gap.
    line.set_active(2, 0b011)?;
    line.create_all(&mut scene)?;

    for (_, cell) in scene.cells() {
        println!(
            "{:>6}  mat {:>3}  {}",
            cell.name(),
            cell.material(),
            cell.rule()
        );
    }

    let track = LineTrack::new(Point3::new(-40.0, -40.0, 0.0), Point3::new(-40.0, 0.0, 0.0))
        .execute(&scene)?;
    for segment in track.segments() {
        println!("cell {:>6}  length {:.3}", segment.name, segment.length);
    }
    Ok(())
}

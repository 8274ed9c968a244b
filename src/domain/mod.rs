mod coordinates;
mod waypoint;

pub use coordinates::Coordinates;
pub use waypoint::Waypoint;

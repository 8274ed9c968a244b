mod active;
mod service;
mod store;
mod waypoint_directory;

pub use active::ActivePointer;
pub use service::DirectoryService;
pub use store::{DirectoryError, WaypointStore};
pub use waypoint_directory::{Removal, WaypointDirectory};

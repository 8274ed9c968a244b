use crate::domain::Waypoint;
use crate::geodesy::{DistanceBearing, DistanceUnit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// The operations a front end can perform on the directory, whether it lives in process or behind the RPC server.
///
/// There is no change notification: after any mutation a front end refetches `list_names` and `get_active`.
#[async_trait]
pub trait WaypointDirectory: Send + Sync {
    type Error: Error + Send + Sync + 'static;

    async fn list_names(&self) -> Result<Vec<String>, Self::Error>;

    async fn get_active(&self) -> Result<Option<String>, Self::Error>;

    async fn set_active(&self, name: &str) -> Result<(), Self::Error>;

    async fn get(&self, name: &str) -> Result<Waypoint, Self::Error>;

    /// Makes the waypoint active and returns it, as one step.
    async fn select_and_get(&self, name: &str) -> Result<Waypoint, Self::Error>;

    /// Adds the waypoint and makes it the active one.
    async fn add(&self, waypoint: Waypoint) -> Result<(), Self::Error>;

    /// Overwrites the coordinates of an existing waypoint, its name is the key.
    async fn modify(&self, waypoint: Waypoint) -> Result<(), Self::Error>;

    async fn remove(&self, name: &str) -> Result<Removal, Self::Error>;

    async fn calc_dist_bear(&self, from: &str, to: &str, unit: DistanceUnit) -> Result<DistanceBearing, Self::Error>;

    async fn service_info(&self) -> Result<String, Self::Error>;

    async fn library_size(&self) -> Result<usize, Self::Error>;

    async fn debug_library(&self) -> Result<(), Self::Error>;
}

/// The active pointer state right after a removal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    pub active: Option<String>,
    pub last_entry: bool,
}

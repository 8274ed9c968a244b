use crate::directory::active::ActivePointer;
use crate::directory::store::{DirectoryError, WaypointStore};
use crate::directory::waypoint_directory::{Removal, WaypointDirectory};
use crate::domain::Waypoint;
use crate::geodesy::{DistanceBearing, DistanceUnit, distance_and_bearing_in};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Default)]
struct Directory {
    store: WaypointStore,
    active: ActivePointer,
}

/// The shared waypoint directory. Clones share the same state.
///
/// The store and the active pointer sit behind a single lock, so every operation is atomic with respect to every
/// other one and a mutation is visible to any call made after it returned.
#[derive(Clone, Debug, Default)]
pub struct DirectoryService {
    directory: Arc<RwLock<Directory>>,
}

impl DirectoryService {
    pub fn new() -> Self {
        DirectoryService::default()
    }

    /// Seeds the directory in the given order. The active pointer stays unset until a front end selects or adds one.
    pub fn with_waypoints(waypoints: Vec<Waypoint>) -> Result<Self, DirectoryError> {
        let mut store = WaypointStore::new();
        for waypoint in waypoints {
            store.add(&waypoint.name, waypoint.coordinates)?;
        }

        Ok(DirectoryService {
            directory: Arc::new(RwLock::new(Directory {
                store,
                active: ActivePointer::Unset,
            })),
        })
    }
}

#[async_trait]
impl WaypointDirectory for DirectoryService {
    type Error = DirectoryError;

    async fn list_names(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(self.directory.read().await.store.list_names())
    }

    async fn get_active(&self) -> Result<Option<String>, DirectoryError> {
        Ok(self.directory.read().await.active.get().map(str::to_string))
    }

    #[instrument(skip(self))]
    async fn set_active(&self, name: &str) -> Result<(), DirectoryError> {
        let mut guard = self.directory.write().await;
        let Directory { store, active } = &mut *guard;

        active.select(name, store)?;
        debug!("🎯 Selected waypoint '{}'", name);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Waypoint, DirectoryError> {
        self.directory.read().await.store.get(name)
    }

    #[instrument(skip(self))]
    async fn select_and_get(&self, name: &str) -> Result<Waypoint, DirectoryError> {
        let mut guard = self.directory.write().await;
        let Directory { store, active } = &mut *guard;

        active.select(name, store)?;
        debug!("🎯 Selected waypoint '{}'", name);
        store.get(name)
    }

    #[instrument(skip_all, fields(name = %waypoint.name))]
    async fn add(&self, waypoint: Waypoint) -> Result<(), DirectoryError> {
        let mut guard = self.directory.write().await;

        if let Err(e) = guard.store.add(&waypoint.name, waypoint.coordinates) {
            warn!("⚠️ Could not add waypoint: {}", e);
            return Err(e);
        }
        guard.active.added(&waypoint.name);

        info!("📍 Added waypoint '{}' at {:?}", waypoint.name, waypoint.coordinates);
        Ok(())
    }

    #[instrument(skip_all, fields(name = %waypoint.name))]
    async fn modify(&self, waypoint: Waypoint) -> Result<(), DirectoryError> {
        let mut guard = self.directory.write().await;

        if let Err(e) = guard.store.modify(&waypoint.name, waypoint.coordinates) {
            warn!("⚠️ Could not modify waypoint: {}", e);
            return Err(e);
        }

        info!("📍 Modified waypoint '{}', now at {:?}", waypoint.name, waypoint.coordinates);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<Removal, DirectoryError> {
        let mut guard = self.directory.write().await;
        let Directory { store, active } = &mut *guard;

        if let Err(e) = store.remove(name) {
            warn!("⚠️ Could not remove waypoint: {}", e);
            return Err(e);
        }
        active.removed(name, store);

        let removal = Removal {
            active: active.get().map(str::to_string),
            last_entry: store.is_empty(),
        };
        info!(active = ?removal.active, "🗑️ Removed waypoint '{}'", name);
        Ok(removal)
    }

    #[instrument(skip(self))]
    async fn calc_dist_bear(&self, from: &str, to: &str, unit: DistanceUnit) -> Result<DistanceBearing, DirectoryError> {
        let (from_waypoint, to_waypoint) = {
            let guard = self.directory.read().await;
            (guard.store.get(from)?, guard.store.get(to)?)
        };

        let result = distance_and_bearing_in(&from_waypoint.coordinates, &to_waypoint.coordinates, unit);
        debug!("🧭 {:.4} {} at {:.4}°", result.distance, unit, result.bearing);
        Ok(result)
    }

    async fn service_info(&self) -> Result<String, DirectoryError> {
        Ok(format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
    }

    async fn library_size(&self) -> Result<usize, DirectoryError> {
        Ok(self.directory.read().await.store.len())
    }

    async fn debug_library(&self) -> Result<(), DirectoryError> {
        let guard = self.directory.read().await;

        info!(size = guard.store.len(), active = ?guard.active.get(), "📚 Directory contents");
        for (name, coordinates) in guard.store.iter() {
            info!(
                "📚 '{}': lat = {}, lon = {}, ele = {}",
                name, coordinates.latitude, coordinates.longitude, coordinates.elevation
            );
        }
        Ok(())
    }
}

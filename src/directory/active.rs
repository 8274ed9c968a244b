use crate::directory::store::{DirectoryError, WaypointStore};

/// A name reference to the waypoint a front end shows by default. It never owns the waypoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ActivePointer {
    #[default]
    Unset,
    Set(String),
}

impl ActivePointer {
    pub fn get(&self) -> Option<&str> {
        match self {
            ActivePointer::Unset => None,
            ActivePointer::Set(name) => Some(name),
        }
    }

    pub fn select(&mut self, name: &str, store: &WaypointStore) -> Result<(), DirectoryError> {
        if !store.contains(name) {
            return Err(DirectoryError::NotFound(name.to_string()));
        }

        *self = ActivePointer::Set(name.to_string());
        Ok(())
    }

    /// A freshly added waypoint always becomes active.
    pub fn added(&mut self, name: &str) {
        *self = ActivePointer::Set(name.to_string());
    }

    /// Must be called after `removed` has been deleted from `store`.
    pub fn removed(&mut self, removed: &str, store: &WaypointStore) {
        if self.get() != Some(removed) {
            return;
        }

        *self = match store.first_name() {
            Some(first) => ActivePointer::Set(first.to_string()),
            None => ActivePointer::Unset,
        };
    }
}

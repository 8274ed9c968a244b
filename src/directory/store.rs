use crate::domain::{Coordinates, Waypoint};
use std::collections::HashMap;
use thiserror::Error;

/// Waypoints keyed by name, enumerated in the order they were added.
#[derive(Debug, Default)]
pub struct WaypointStore {
    coordinates: HashMap<String, Coordinates>,
    order: Vec<String>,
}

impl WaypointStore {
    pub fn new() -> Self {
        WaypointStore::default()
    }

    pub fn add(&mut self, name: &str, coordinates: Coordinates) -> Result<(), DirectoryError> {
        if name.trim().is_empty() {
            return Err(DirectoryError::InvalidName);
        }

        if !coordinates.is_finite() {
            return Err(DirectoryError::InvalidCoordinate(name.to_string()));
        }

        if self.coordinates.contains_key(name) {
            return Err(DirectoryError::DuplicateName(name.to_string()));
        }

        self.coordinates.insert(name.to_string(), coordinates);
        self.order.push(name.to_string());
        Ok(())
    }

    pub fn modify(&mut self, name: &str, coordinates: Coordinates) -> Result<(), DirectoryError> {
        let Some(existing) = self.coordinates.get_mut(name) else {
            return Err(DirectoryError::NotFound(name.to_string()));
        };

        if !coordinates.is_finite() {
            return Err(DirectoryError::InvalidCoordinate(name.to_string()));
        }

        *existing = coordinates;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), DirectoryError> {
        if self.coordinates.remove(name).is_none() {
            return Err(DirectoryError::NotFound(name.to_string()));
        }

        self.order.retain(|existing| existing != name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Waypoint, DirectoryError> {
        self.coordinates
            .get(name)
            .map(|coordinates| Waypoint {
                name: name.to_string(),
                coordinates: *coordinates,
            })
            .ok_or_else(|| DirectoryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.coordinates.contains_key(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Coordinates)> {
        self.order.iter().filter_map(|name| self.coordinates.get(name).map(|coordinates| (name.as_str(), coordinates)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("waypoint name must not be empty")]
    InvalidName,
    #[error("a waypoint named '{0}' already exists")]
    DuplicateName(String),
    #[error("no waypoint named '{0}'")]
    NotFound(String),
    #[error("coordinates of waypoint '{0}' must be finite numbers")]
    InvalidCoordinate(String),
}

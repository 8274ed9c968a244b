use crate::domain::Coordinates;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64, elevation: f64) -> Self {
        Waypoint {
            name: name.into(),
            coordinates: Coordinates::new(latitude, longitude, elevation),
        }
    }
}

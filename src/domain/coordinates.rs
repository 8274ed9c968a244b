use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "lat", alias = "latitude")]
    pub latitude: f64,
    #[serde(rename = "lon", alias = "longitude")]
    pub longitude: f64,
    #[serde(rename = "ele", alias = "elevation")]
    pub elevation: f64, // Unit agnostic
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Coordinates {
            latitude,
            longitude,
            elevation,
        }
    }

    /// Latitude and longitude are not range checked, they only need to be actual numbers.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.elevation.is_finite()
    }
}

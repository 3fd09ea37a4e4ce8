//! Resolution of coordinates to a human-readable location.

use crate::types::Coordinates;

/// A named bounding box.
#[derive(Debug, Clone, Copy)]
pub struct KnownLocation {
    pub label: &'static str,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl KnownLocation {
    fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

/// Boxes checked in order.
pub const KNOWN_LOCATIONS: &[KnownLocation] = &[KnownLocation {
    label: "São Paulo, SP",
    min_latitude: -24.0,
    max_latitude: -23.0,
    min_longitude: -47.0,
    max_longitude: -46.0,
}];

/// Whether the pair lies on the globe.
pub fn is_valid(coordinates: &Coordinates) -> bool {
    (-90.0..=90.0).contains(&coordinates.latitude)
        && (-180.0..=180.0).contains(&coordinates.longitude)
}

/// City label when the point falls in a known box, else `"lat,lon"` to four decimals.
pub fn resolve(coordinates: &Coordinates) -> String {
    let (latitude, longitude) = (coordinates.latitude, coordinates.longitude);

    KNOWN_LOCATIONS
        .iter()
        .find(|known| known.contains(latitude, longitude))
        .map(|known| known.label.to_string())
        .unwrap_or_else(|| format!("{:.4},{:.4}", latitude, longitude))
}

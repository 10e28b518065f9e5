use serde::{Deserialize, Serialize};

/// One position reading. Immutable — each fix from the provider is a
/// fresh snapshot; updates never mutate an earlier reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated accuracy radius in meters.
    pub accuracy: f64,
}

impl Location {
    /// Static map preview for the doctor's incoming-request card.
    /// The image itself is fetched by the view; the backend only
    /// templates the URL with the current coordinates.
    pub fn map_preview_url(&self) -> String {
        format!(
            "https://maps.geoapify.com/v1/staticmap?style=osm-carto&width=600&height=300\
             &center=lonlat:{lon},{lat}&zoom=15\
             &marker=lonlat:{lon},{lat};type:awesome;color:%23ff0000;size:large",
            lon = self.longitude,
            lat = self.latitude,
        )
    }
}

use crate::neighborhood::LocationHint;
use std::f64::consts::PI;

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Downtown Miami.
pub const DEFAULT_CENTER: LocationHint = LocationHint {
    lat: 25.7617,
    lon: -80.1918,
};
pub const DEFAULT_ZOOM: u8 = 11;
pub const FOCUS_ZOOM: u8 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub location: LocationHint,
    pub label: String,
}

/// Map viewport kept in sync with the locations returned by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    center: LocationHint,
    zoom: u8,
    marker: Option<Marker>,
    tile_url_template: String,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_URL)
    }
}

impl MapView {
    pub fn new(tile_url_template: impl Into<String>) -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            marker: None,
            tile_url_template: tile_url_template.into(),
        }
    }

    pub fn center(&self) -> LocationHint {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    /// Recenters on `location`, zooms in and drops a labelled marker there.
    pub fn focus(&mut self, location: LocationHint, label: impl Into<String>) {
        self.center = location;
        self.zoom = FOCUS_ZOOM;
        self.marker = Some(Marker {
            location,
            label: label.into(),
        });
    }

    /// Web-mercator tile containing the center at the current zoom.
    pub fn tile(&self) -> TileCoord {
        let n = f64::from(1u32 << self.zoom);
        let max = (1u32 << self.zoom) - 1;
        let lat = self.center.lat.to_radians();

        let x = ((self.center.lon + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();

        TileCoord {
            x: clamp_tile(x, max),
            y: clamp_tile(y, max),
            z: self.zoom,
        }
    }

    pub fn tile_url(&self) -> String {
        let tile = self.tile();
        self.tile_url_template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    pub fn osm_link(&self) -> String {
        let LocationHint { lat, lon } = self.center;
        let view = format!("#map={}/{lat:.4}/{lon:.4}", self.zoom);
        match &self.marker {
            Some(Marker { location, .. }) => format!(
                "https://www.openstreetmap.org/?mlat={:.4}&mlon={:.4}{view}",
                location.lat, location.lon
            ),
            None => format!("https://www.openstreetmap.org/{view}"),
        }
    }
}

fn clamp_tile(value: f64, max: u32) -> u32 {
    if value.is_nan() || value < 0.0 {
        0
    } else {
        (value as u32).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_ZOOM, FOCUS_ZOOM, MapView, TileCoord};
    use crate::neighborhood::LocationHint;

    const WYNWOOD: LocationHint = LocationHint {
        lat: 25.8010,
        lon: -80.1994,
    };

    #[test]
    fn starts_over_miami_without_marker() {
        let map = MapView::default();
        assert_eq!(map.zoom(), DEFAULT_ZOOM);
        assert_eq!(map.marker(), None);
        assert_eq!(
            map.tile(),
            TileCoord {
                x: 567,
                y: 872,
                z: 11
            }
        );
    }

    #[test]
    fn focus_moves_center_and_marker() {
        let mut map = MapView::default();
        map.focus(WYNWOOD, "Wynwood");
        assert_eq!(map.center(), WYNWOOD);
        let marker = map.marker().expect("marker");
        assert_eq!(marker.location, WYNWOOD);
        assert_eq!(marker.label, "Wynwood");
        assert_eq!(map.zoom(), FOCUS_ZOOM);
    }

    #[test]
    fn tile_url_fills_template() {
        let mut map = MapView::new("https://tiles.example/{z}/{x}/{y}.png");
        let brickell = LocationHint {
            lat: 25.7617,
            lon: -80.1918,
        };
        map.focus(brickell, "Brickell");
        assert_eq!(map.tile_url(), "https://tiles.example/14/4542/6977.png");
    }

    #[test]
    fn tiles_are_clamped_near_the_poles() {
        let mut map = MapView::default();
        let far_north = LocationHint {
            lat: 89.9,
            lon: 180.0,
        };
        map.focus(far_north, "far north");
        let tile = map.tile();
        assert_eq!(tile.y, 0);
        assert_eq!(tile.x, (1 << FOCUS_ZOOM) - 1);
    }

    #[test]
    fn osm_link_includes_marker_when_set() {
        let mut map = MapView::default();
        assert_eq!(
            map.osm_link(),
            "https://www.openstreetmap.org/#map=11/25.7617/-80.1918"
        );

        map.focus(WYNWOOD, "Wynwood");
        assert_eq!(
            map.osm_link(),
            "https://www.openstreetmap.org/?mlat=25.8010&mlon=-80.1994#map=14/25.8010/-80.1994"
        );
    }
}

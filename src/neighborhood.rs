use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NeighborhoodRecord {
    pub name: String,
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    pub climate_parameters: ClimateParameters,
    pub vulnerability: String,
    pub solutions: String,
}

impl NeighborhoodRecord {
    pub fn location(&self) -> LocationHint {
        LocationHint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClimateParameters {
    pub flood_risk: String,
    pub storm_surge: String,
    pub heat_index: String,
    pub sea_level_rise: String,
    pub precipitation_trends: String,
    pub wind_risk: String,
    pub coastal_erosion: String,
    pub groundwater_intrusion: String,
    pub infrastructure_resilience: String,
    pub adaptation_cost_estimate: String,
}

impl ClimateParameters {
    /// Labelled fields in their canonical order.
    pub fn entries(&self) -> [(&'static str, &str); 10] {
        [
            ("Flood Risk", self.flood_risk.as_str()),
            ("Storm Surge", self.storm_surge.as_str()),
            ("Heat Index", self.heat_index.as_str()),
            ("Sea Level Rise", self.sea_level_rise.as_str()),
            ("Precipitation Trends", self.precipitation_trends.as_str()),
            ("Wind Risk", self.wind_risk.as_str()),
            ("Coastal Erosion", self.coastal_erosion.as_str()),
            ("Groundwater Intrusion", self.groundwater_intrusion.as_str()),
            ("Infrastructure Resilience", self.infrastructure_resilience.as_str()),
            ("Adaptation Cost Estimate", self.adaptation_cost_estimate.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LocationHint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read neighborhood dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse neighborhood dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads the whole dataset. Called once per chat request so edits to the file
/// are picked up without a restart.
pub fn load_neighborhoods(path: &Path) -> Result<Vec<NeighborhoodRecord>, DatasetError> {
    let raw = fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub fn sample_record(name: &str, lat: f64, lon: f64) -> NeighborhoodRecord {
    NeighborhoodRecord {
        name: name.to_string(),
        description: format!("{name} description"),
        lat,
        lon,
        climate_parameters: ClimateParameters {
            flood_risk: format!("{name} flood"),
            storm_surge: format!("{name} surge"),
            heat_index: format!("{name} heat"),
            sea_level_rise: format!("{name} slr"),
            precipitation_trends: format!("{name} rain"),
            wind_risk: format!("{name} wind"),
            coastal_erosion: format!("{name} erosion"),
            groundwater_intrusion: format!("{name} groundwater"),
            infrastructure_resilience: format!("{name} infrastructure"),
            adaptation_cost_estimate: format!("{name} cost"),
        },
        vulnerability: format!("{name} vulnerability"),
        solutions: format!("{name} solutions"),
    }
}

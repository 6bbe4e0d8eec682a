//! Conventional variable names for common environmental properties.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Dataset;
use crate::error::{GridPropError, Result};

/// Physical property with a table of conventional variable names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Current,
    Wind,
    WaterTemperature,
    Salinity,
    IceConcentration,
}

impl PropertyKind {
    pub const ALL: [PropertyKind; 5] = [
        PropertyKind::Current,
        PropertyKind::Wind,
        PropertyKind::WaterTemperature,
        PropertyKind::Salinity,
        PropertyKind::IceConcentration,
    ];

    /// Candidate component name sets, tried in order
    pub fn vector_names(self) -> &'static [&'static [&'static str]] {
        match self {
            PropertyKind::Current => &[
                &["u", "v", "w"],
                &["U", "V", "W"],
                &["u", "v"],
                &["U", "V"],
                &["water_u", "water_v"],
                &["curr_ucmp", "curr_vcmp"],
            ],
            PropertyKind::Wind => &[
                &["air_u", "air_v"],
                &["Air_U", "Air_V"],
                &["air_ucmp", "air_vcmp"],
                &["wind_u", "wind_v"],
            ],
            _ => &[],
        }
    }

    /// Candidate scalar variable names, tried in order
    pub fn scalar_names(self) -> &'static [&'static str] {
        match self {
            PropertyKind::WaterTemperature => &["water_t", "temp"],
            PropertyKind::Salinity => &["salt"],
            PropertyKind::IceConcentration => &["ice_fraction"],
            PropertyKind::Current | PropertyKind::Wind => &[],
        }
    }

    /// Prefix for generated property names
    pub fn name_prefix(self) -> &'static str {
        match self {
            PropertyKind::Current => "current",
            PropertyKind::Wind => "wind",
            PropertyKind::WaterTemperature => "water_temperature",
            PropertyKind::Salinity => "salinity",
            PropertyKind::IceConcentration => "ice_concentration",
        }
    }

    /// First conventional scalar name present in `dataset`
    pub fn resolve_scalar(self, dataset: &dyn Dataset) -> Result<String> {
        self.scalar_names()
            .iter()
            .find(|name| dataset.has_variable(name))
            .map(|name| name.to_string())
            .ok_or_else(|| self.unresolved(dataset))
    }

    /// First conventional name set fully present in `dataset`
    pub fn resolve_vector(self, dataset: &dyn Dataset) -> Result<Vec<String>> {
        self.vector_names()
            .iter()
            .find(|names| names.iter().all(|n| dataset.has_variable(n)))
            .map(|names| names.iter().map(|n| n.to_string()).collect())
            .ok_or_else(|| self.unresolved(dataset))
    }

    fn unresolved(self, dataset: &dyn Dataset) -> GridPropError {
        let source = dataset
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "dataset".to_string());
        GridPropError::UnresolvedVariable {
            message: format!(
                "Default {} names are not in {}; a variable name must be supplied",
                self, source
            ),
        }
    }
}

impl std::str::FromStr for PropertyKind {
    type Err = GridPropError;

    fn from_str(s: &str) -> Result<Self> {
        PropertyKind::ALL
            .into_iter()
            .find(|kind| kind.name_prefix() == s)
            .ok_or_else(|| GridPropError::Config {
                message: format!(
                    "Unknown property kind: {}. Must be one of: {}",
                    s,
                    PropertyKind::ALL.map(PropertyKind::name_prefix).join(", ")
                ),
            })
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_prefix())
    }
}

//! Persistence records for properties.
//!
//! A [`PropertyRecord`] keeps what is needed to rebuild a property from its
//! source files: never the data itself.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::error::{GridPropError, Result};
use crate::grid::GridTopology;
use crate::property::{GriddedProperty, Property, VectorGriddedProperty};
use crate::source::{DatasetLoader, SourceRequest};

/// Which property type a record rebuilds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Scalar,
    Vector,
}

/// Serializable description of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub varnames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_topology: Option<GridTopology>,
    #[serde(default)]
    pub fill_value: f64,
}

impl PropertyRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Source request equivalent to this record
    pub fn to_request(&self) -> Result<SourceRequest> {
        let data_file = self.data_file.clone().ok_or_else(|| {
            GridPropError::construction(format!(
                "Property {} has no data file to rebuild from",
                self.name
            ))
        })?;

        let mut request = SourceRequest::default()
            .data_file(data_file)
            .name(self.name.clone())
            .fill_value(self.fill_value);
        request.grid_file = self.grid_file.clone();
        request.grid_topology = self.grid_topology.clone();
        request.units = self.units.clone();
        match self.kind {
            RecordKind::Scalar => {
                let varname = self.varnames.first().ok_or_else(|| {
                    GridPropError::construction(format!("Property {} has no variable name", self.name))
                })?;
                request.varname = Some(varname.clone());
            }
            RecordKind::Vector => request.varnames = Some(self.varnames.clone()),
        }
        Ok(request)
    }

    /// Rebuild the property by re-reading its source files
    pub fn reconstruct(&self, loader: &dyn DatasetLoader) -> Result<Property> {
        let request = self.to_request()?;
        info!(property = %self.name, kind = ?self.kind, "Reconstructing property");
        Ok(match self.kind {
            RecordKind::Scalar => GriddedProperty::from_source(&request, loader)?.into(),
            RecordKind::Vector => VectorGriddedProperty::from_source(&request, loader)?.into(),
        })
    }
}

impl GriddedProperty {
    pub fn to_record(&self) -> PropertyRecord {
        PropertyRecord {
            name: self.name().to_string(),
            kind: RecordKind::Scalar,
            units: self.units().map(str::to_string),
            varnames: self.varname().map(str::to_string).into_iter().collect(),
            data_file: self.data_file().map(|p| p.to_path_buf()),
            grid_file: self.grid_file().map(|p| p.to_path_buf()),
            grid_topology: self.grid().topology().cloned(),
            fill_value: self.fill_value(),
        }
    }
}

impl VectorGriddedProperty {
    pub fn to_record(&self) -> PropertyRecord {
        PropertyRecord {
            name: self.name().to_string(),
            kind: RecordKind::Vector,
            units: self.units().map(str::to_string),
            varnames: self.varnames(),
            data_file: self.data_file().map(|p| p.to_path_buf()),
            grid_file: self.grid_file().map(|p| p.to_path_buf()),
            grid_topology: self.grid().topology().cloned(),
            fill_value: self.components()[0].fill_value(),
        }
    }
}

impl Property {
    pub fn to_record(&self) -> PropertyRecord {
        match self {
            Property::Scalar(p) => p.to_record(),
            Property::Vector(p) => p.to_record(),
        }
    }
}

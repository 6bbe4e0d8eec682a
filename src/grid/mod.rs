//! Spatial grids.
//!
//! A [`Grid`] answers two questions for the property layer: which part of the
//! grid a data array is located on (nodes or centers), and what the data's
//! value is at arbitrary horizontal points. Grids are shared between
//! properties through [`GridRef`] and never owned by them.

pub mod common;
pub mod rectilinear;
pub mod triangular;

use ndarray::{Array1, Array2, ArrayView2, ArrayViewD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{GridPropError, Result};

pub use rectilinear::RectilinearGrid;
pub use triangular::TriangularGrid;

/// Shared handle to a grid
pub type GridRef = Arc<dyn Grid>;

/// Number of point-location results a grid keeps per memo hint
pub const LOCATION_CACHE_ENTRIES: usize = 8;

/// Where data values sit on a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataLocation {
    Node,
    Center,
}

/// Names of the dataset variables that describe a grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTopology {
    /// Node longitude variable
    pub node_lon: String,
    /// Node latitude variable
    pub node_lat: String,
    /// Face-node connectivity variable, for unstructured grids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<String>,
}

impl GridTopology {
    pub fn rectilinear(node_lon: impl Into<String>, node_lat: impl Into<String>) -> Self {
        Self {
            node_lon: node_lon.into(),
            node_lat: node_lat.into(),
            faces: None,
        }
    }

    pub fn triangular(
        node_lon: impl Into<String>,
        node_lat: impl Into<String>,
        faces: impl Into<String>,
    ) -> Self {
        Self {
            node_lon: node_lon.into(),
            node_lat: node_lat.into(),
            faces: Some(faces.into()),
        }
    }
}

/// Spatial grid capability consumed by gridded properties
pub trait Grid: Send + Sync + fmt::Debug {
    /// Short name of the grid kind
    fn name(&self) -> &str;

    /// Number of trailing data dimensions that are spatial
    fn spatial_ndim(&self) -> usize;

    /// Shape of node-located data
    fn node_shape(&self) -> Vec<usize>;

    /// Shape of center-located data
    fn center_shape(&self) -> Vec<usize>;

    /// Interpolate a spatial data slice sitting at `location` to horizontal
    /// points.
    ///
    /// `points` is N×2 or wider; only the first two columns are read.
    /// Points outside the grid are NaN. `memo` is a hint key (usually the
    /// points hash) under which point-location results may be reused.
    fn interpolate_located(
        &self,
        points: &ArrayView2<f64>,
        data: &ArrayViewD<f64>,
        location: DataLocation,
        memo: Option<u64>,
    ) -> Result<Array1<f64>>;

    /// Interpolate a spatial data slice, taking its location from its shape
    fn interpolate_var_to_points(
        &self,
        points: &ArrayView2<f64>,
        data: &ArrayViewD<f64>,
        memo: Option<u64>,
    ) -> Result<Array1<f64>> {
        let location = self
            .infer_location(data.shape())
            .filter(|_| data.ndim() == self.spatial_ndim())
            .ok_or_else(|| {
                GridPropError::shape_mismatch(format!(
                    "Data slice shape {:?} matches neither nodes {:?} nor centers {:?}",
                    data.shape(),
                    self.node_shape(),
                    self.center_shape()
                ))
            })?;
        self.interpolate_located(points, data, location, memo)
    }

    /// Coordinates of the grid centers as an N×2 array
    fn center_points(&self) -> Array2<f64>;

    /// Dataset variables this grid was built from, if any
    fn topology(&self) -> Option<&GridTopology> {
        None
    }

    /// Spatial shape of data sitting at `location`
    fn location_shape(&self, location: DataLocation) -> Vec<usize> {
        match location {
            DataLocation::Node => self.node_shape(),
            DataLocation::Center => self.center_shape(),
        }
    }

    /// Whether `shape` ends in this grid's node or center shape.
    ///
    /// Node wins when both shapes are equal, as on a triangular mesh with as
    /// many faces as nodes. Callers holding face data on such a mesh pass the
    /// location explicitly.
    fn infer_location(&self, shape: &[usize]) -> Option<DataLocation> {
        let n = self.spatial_ndim();
        if shape.len() < n {
            return None;
        }
        let trailing = &shape[shape.len() - n..];
        if trailing == self.node_shape().as_slice() {
            Some(DataLocation::Node)
        } else if trailing == self.center_shape().as_slice() {
            Some(DataLocation::Center)
        } else {
            None
        }
    }
}

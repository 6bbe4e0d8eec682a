//! Gridded properties.
//!
//! A [`GriddedProperty`] ties a data array to a shared grid, an optional time
//! axis and an optional depth model, and answers "value at these points at
//! this time". A [`VectorGriddedProperty`] composes several co-located scalar
//! properties into one multi-component field.

pub mod collection;
pub mod data;
pub mod scalar;
pub mod vector;

use serde::{Deserialize, Serialize};

use crate::depth::DepthModel;
use crate::error::{GridPropError, Result};
use crate::grid::{DataLocation, Grid};
use crate::time::TimeAxis;

pub use collection::PropertyCollection;
pub use data::FieldData;
pub use scalar::{GriddedProperty, GriddedPropertyBuilder};
pub use vector::{VectorGriddedProperty, VectorGriddedPropertyBuilder};

/// How a property's data varies, fixed when data or time is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// `[spatial...]`
    Stationary,
    /// `[depth, spatial...]`
    DepthResolved,
    /// `[time, spatial...]`
    TimeVarying,
    /// `[time, depth, spatial...]`
    TimeAndDepth,
}

impl FieldKind {
    pub fn has_time(self) -> bool {
        matches!(self, FieldKind::TimeVarying | FieldKind::TimeAndDepth)
    }

    pub fn has_depth(self) -> bool {
        matches!(self, FieldKind::DepthResolved | FieldKind::TimeAndDepth)
    }

    /// Classify a data shape against a grid, time axis and depth model
    pub fn classify(
        shape: &[usize],
        grid: &dyn Grid,
        time: Option<&TimeAxis>,
        depth: Option<&DepthModel>,
    ) -> Result<(FieldKind, DataLocation)> {
        Self::classify_at(shape, grid, time, depth, None)
    }

    /// Classify with the data location fixed by the caller when given
    pub fn classify_at(
        shape: &[usize],
        grid: &dyn Grid,
        time: Option<&TimeAxis>,
        depth: Option<&DepthModel>,
        location: Option<DataLocation>,
    ) -> Result<(FieldKind, DataLocation)> {
        let location = match location {
            Some(location) => {
                let spatial = grid.location_shape(location);
                let fits = shape.len() >= spatial.len() && shape[shape.len() - spatial.len()..] == spatial[..];
                fits.then_some(location)
            }
            None => grid.infer_location(shape),
        };
        let location = location.ok_or_else(|| {
            GridPropError::shape_mismatch(format!(
                "Data/grid shape mismatch. Data shape is {:?}, grid node shape is {:?}",
                shape,
                grid.node_shape()
            ))
        })?;

        let leading = shape.len() - grid.spatial_ndim();
        let kind = match leading {
            0 => FieldKind::Stationary,
            1 => match (time, depth) {
                (Some(axis), _) if axis.len() == shape[0] => FieldKind::TimeVarying,
                (Some(axis), Some(_)) if axis.len() == 1 => FieldKind::DepthResolved,
                (Some(axis), None) => {
                    return Err(GridPropError::shape_mismatch(format!(
                        "Data/time interval mismatch: data has {} steps, time axis has {}",
                        shape[0],
                        axis.len()
                    )))
                }
                (None, Some(_)) => FieldKind::DepthResolved,
                (_, None) => {
                    return Err(GridPropError::dimension(format!(
                        "Data shape {:?} has a leading dimension but neither a time axis nor a depth model",
                        shape
                    )))
                }
                (Some(axis), Some(_)) => {
                    return Err(GridPropError::shape_mismatch(format!(
                        "Data/time interval mismatch: data has {} steps, time axis has {}",
                        shape[0],
                        axis.len()
                    )))
                }
            },
            2 => {
                match time {
                    Some(axis) if axis.len() != shape[0] => {
                        return Err(GridPropError::shape_mismatch(format!(
                            "Data/time interval mismatch: data has {} steps, time axis has {}",
                            shape[0],
                            axis.len()
                        )))
                    }
                    None if shape[0] != 1 => {
                        return Err(GridPropError::dimension(
                            "Cannot determine correct time index without time axis",
                        ))
                    }
                    _ => {}
                }
                if depth.is_none() {
                    return Err(GridPropError::construction(format!(
                        "Data shape {:?} has a depth dimension but no depth model",
                        shape
                    )));
                }
                FieldKind::TimeAndDepth
            }
            _ => {
                return Err(GridPropError::dimension(format!(
                    "Data of rank {} is unsupported on a {} grid",
                    shape.len(),
                    grid.name()
                )))
            }
        };
        Ok((kind, location))
    }
}

/// Either kind of gridded property
#[derive(Debug)]
pub enum Property {
    Scalar(GriddedProperty),
    Vector(VectorGriddedProperty),
}

impl Property {
    pub fn name(&self) -> &str {
        match self {
            Property::Scalar(p) => p.name(),
            Property::Vector(p) => p.name(),
        }
    }

    pub fn as_scalar(&self) -> Option<&GriddedProperty> {
        match self {
            Property::Scalar(p) => Some(p),
            Property::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorGriddedProperty> {
        match self {
            Property::Vector(p) => Some(p),
            Property::Scalar(_) => None,
        }
    }
}

impl From<GriddedProperty> for Property {
    fn from(p: GriddedProperty) -> Self {
        Property::Scalar(p)
    }
}

impl From<VectorGriddedProperty> for Property {
    fn from(p: VectorGriddedProperty) -> Self {
        Property::Vector(p)
    }
}

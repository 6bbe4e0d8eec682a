//! Data sources for gridded properties.
//!
//! A [`Dataset`] exposes named variables with metadata and reads them as
//! `f64` arrays with missing values masked as NaN, either whole or one block
//! at a time. A [`DatasetLoader`] opens
//! datasets by path. Properties are built from a source through
//! [`SourceRequest`], which resolves the dataset, grid and time axis once
//! and shares them among components.

pub mod build;
pub mod defaults;
pub mod memory;
pub mod metadata;
#[cfg(feature = "netcdf")]
pub mod netcdf;
pub mod shared;

use ndarray::ArrayD;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use crate::error::{GridPropError, Result};

pub use defaults::PropertyKind;
pub use memory::{MemoryDataset, MemoryLoader};
pub use metadata::{AttributeValue, VariableInfo};
#[cfg(feature = "netcdf")]
pub use self::netcdf::{NetcdfDataset, NetcdfLoader};
pub use shared::{SharedResources, SourceRequest};

/// Shared handle to an open dataset
pub type DatasetRef = Arc<dyn Dataset>;

/// A named collection of array variables
pub trait Dataset: Send + Sync + fmt::Debug {
    /// Location the dataset was opened from
    fn path(&self) -> Option<&Path>;

    /// Variable names in dataset order
    fn variable_names(&self) -> Vec<String>;

    fn variable(&self, name: &str) -> Option<&VariableInfo>;

    /// Read a variable as `f64`, with missing values masked as NaN
    fn read(&self, name: &str) -> Result<ArrayD<f64>>;

    /// Read the block of a variable selected by one range per dimension.
    ///
    /// The result keeps every dimension, so a single index reads as a range
    /// of length one.
    fn read_slice(&self, name: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>>;

    fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    fn variable_checked(&self, name: &str) -> Result<&VariableInfo> {
        self.variable(name).ok_or_else(|| GridPropError::UnresolvedVariable {
            message: format!("Variable not found: {}", name),
        })
    }

    /// Read a one-dimensional variable
    fn read_vec(&self, name: &str) -> Result<Vec<f64>> {
        let array = self.read(name)?;
        if array.ndim() != 1 {
            return Err(GridPropError::dimension(format!(
                "Variable {} has {} dimensions, expected 1",
                name,
                array.ndim()
            )));
        }
        Ok(array.iter().copied().collect())
    }
}

/// Opens datasets by path
pub trait DatasetLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<DatasetRef>;
}

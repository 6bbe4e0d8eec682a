//! Property data held in memory or read from a dataset block by block.

use ndarray::{ArrayD, Axis, CowArray, IxDyn};
use std::fmt;
use tracing::debug;

use crate::error::{GridPropError, Result};
use crate::source::DatasetRef;

/// Values of a gridded property.
///
/// `Deferred` data stays in its dataset; each query reads only the leading
/// slab (one time step, or one layer for depth-only data) it needs.
#[derive(Clone)]
pub enum FieldData {
    Loaded(ArrayD<f64>),
    Deferred {
        dataset: DatasetRef,
        varname: String,
        shape: Vec<usize>,
    },
}

impl fmt::Debug for FieldData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldData::Loaded(data) => f.debug_tuple("Loaded").field(&data.shape()).finish(),
            FieldData::Deferred { varname, shape, .. } => f
                .debug_struct("Deferred")
                .field("varname", varname)
                .field("shape", shape)
                .finish(),
        }
    }
}

impl FieldData {
    /// Data left in `dataset` until a query reads it
    pub fn deferred(dataset: DatasetRef, varname: impl Into<String>) -> Result<Self> {
        let varname = varname.into();
        let shape = dataset.variable_checked(&varname)?.shape.clone();
        Ok(FieldData::Deferred {
            dataset,
            varname,
            shape,
        })
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            FieldData::Loaded(data) => data.shape(),
            FieldData::Deferred { shape, .. } => shape,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, FieldData::Loaded(_))
    }

    /// The whole array
    pub fn full(&self) -> Result<CowArray<'_, f64, IxDyn>> {
        match self {
            FieldData::Loaded(data) => Ok(CowArray::from(data.view())),
            FieldData::Deferred { dataset, varname, .. } => Ok(CowArray::from(dataset.read(varname)?)),
        }
    }

    /// The sub-array at `index` along the leading axis
    pub fn leading(&self, index: usize) -> Result<CowArray<'_, f64, IxDyn>> {
        let len = self.shape().first().copied().unwrap_or(0);
        if index >= len {
            return Err(GridPropError::dimension(format!(
                "Index {} is beyond a leading dimension of {}",
                index, len
            )));
        }
        match self {
            FieldData::Loaded(data) => Ok(CowArray::from(data.index_axis(Axis(0), index))),
            FieldData::Deferred {
                dataset,
                varname,
                shape,
            } => {
                let ranges: Vec<_> = std::iter::once(index..index + 1)
                    .chain(shape[1..].iter().map(|&n| 0..n))
                    .collect();
                let block = dataset.read_slice(varname, &ranges)?;
                debug!(variable = %varname, index, "Read deferred slab");
                Ok(CowArray::from(block.index_axis_move(Axis(0), 0)))
            }
        }
    }

    /// Read deferred data into memory
    pub fn load(&mut self) -> Result<()> {
        if let FieldData::Deferred { dataset, varname, .. } = self {
            let data = dataset.read(varname)?;
            *self = FieldData::Loaded(data);
        }
        Ok(())
    }
}

impl From<ArrayD<f64>> for FieldData {
    fn from(data: ArrayD<f64>) -> Self {
        FieldData::Loaded(data)
    }
}

//! In-memory datasets.
//!
//! Useful for tests and for callers that already hold their arrays. Values
//! are stored raw and unpacked on read exactly like file-backed datasets.

use ndarray::{ArrayD, Slice};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::metadata::{AttributeValue, VariableInfo};
use super::{Dataset, DatasetLoader, DatasetRef};
use crate::error::{GridPropError, Result};

/// Dataset whose variables live in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    path: Option<PathBuf>,
    order: Vec<String>,
    variables: HashMap<String, VariableInfo>,
    arrays: HashMap<String, ArrayD<f64>>,
}

impl MemoryDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Add a variable with named dimensions; the data shape gives their sizes
    pub fn with_variable(
        mut self,
        name: &str,
        dimensions: &[&str],
        data: ArrayD<f64>,
        attributes: &[(&str, AttributeValue)],
    ) -> Result<Self> {
        if dimensions.len() != data.ndim() {
            return Err(GridPropError::shape_mismatch(format!(
                "Variable {} names {} dimensions but has shape {:?}",
                name,
                dimensions.len(),
                data.shape()
            )));
        }
        let mut info = VariableInfo::new(name, dimensions, data.shape());
        for (key, value) in attributes {
            info = info.with_attribute(*key, value.clone());
        }
        if !self.variables.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.variables.insert(name.to_string(), info);
        self.arrays.insert(name.to_string(), data);
        Ok(self)
    }

    /// Add a variable carrying only a `units` attribute
    pub fn with_units(self, name: &str, dimensions: &[&str], data: ArrayD<f64>, units: &str) -> Result<Self> {
        self.with_variable(
            name,
            dimensions,
            data,
            &[("units", AttributeValue::Text(units.to_string()))],
        )
    }
}

impl Dataset for MemoryDataset {
    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn variable_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.get(name)
    }

    fn read(&self, name: &str) -> Result<ArrayD<f64>> {
        let info = self.variable_checked(name)?;
        let mut data = self
            .arrays
            .get(name)
            .cloned()
            .ok_or_else(|| GridPropError::UnresolvedVariable {
                message: format!("Data array for variable {} not found", name),
            })?;
        info.unpack(&mut data);
        Ok(data)
    }

    fn read_slice(&self, name: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let info = self.variable_checked(name)?;
        info.check_slice(ranges)?;
        let array = self.arrays.get(name).ok_or_else(|| GridPropError::UnresolvedVariable {
            message: format!("Data array for variable {} not found", name),
        })?;
        let mut block = array
            .slice_each_axis(|ax| Slice::from(ranges[ax.axis.index()].clone()))
            .to_owned();
        info.unpack(&mut block);
        Ok(block)
    }
}

/// Loader serving registered in-memory datasets by path
#[derive(Debug, Default)]
pub struct MemoryLoader {
    datasets: Mutex<HashMap<PathBuf, DatasetRef>>,
    opens: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under its path
    pub fn insert(&self, dataset: MemoryDataset) -> Result<()> {
        let path = dataset.path().map(Path::to_path_buf).ok_or_else(|| {
            GridPropError::construction("In-memory dataset needs a path to be registered")
        })?;
        self.datasets.lock().insert(path, Arc::new(dataset));
        Ok(())
    }

    /// Number of successful `open` calls so far
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DatasetLoader for MemoryLoader {
    fn open(&self, path: &Path) -> Result<DatasetRef> {
        let dataset = self.datasets.lock().get(path).cloned().ok_or_else(|| {
            GridPropError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            ))
        })?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        debug!(path = %path.display(), "Opened in-memory dataset");
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_read_unpacks_missing_values() {
        let ds = MemoryDataset::new("mem.nc")
            .with_variable(
                "salt",
                &["x"],
                array![35.0, -1.0].into_dyn(),
                &[("_FillValue", AttributeValue::Number(-1.0))],
            )
            .unwrap();
        let salt = ds.read("salt").unwrap();
        assert_eq!(salt[0], 35.0);
        assert!(salt[1].is_nan());
        assert!(matches!(
            ds.read("temp"),
            Err(GridPropError::UnresolvedVariable { .. })
        ));
    }

    #[test]
    fn test_read_slice() {
        let ds = MemoryDataset::new("mem.nc")
            .with_variable(
                "temp",
                &["time", "x"],
                array![[1.0, 2.0, 3.0], [4.0, -1.0, 6.0]].into_dyn(),
                &[("_FillValue", AttributeValue::Number(-1.0))],
            )
            .unwrap();
        let row = ds.read_slice("temp", &[1..2, 0..3]).unwrap();
        assert_eq!(row.shape(), &[1, 3]);
        assert_eq!(row[[0, 0]], 4.0);
        assert!(row[[0, 1]].is_nan());

        let corner = ds.read_slice("temp", &[0..2, 2..3]).unwrap();
        assert_eq!(corner.iter().copied().collect::<Vec<_>>(), vec![3.0, 6.0]);
        assert!(ds.read_slice("temp", &[0..3, 0..3]).is_err());
    }

    #[test]
    fn test_dimension_count_must_match() {
        let result = MemoryDataset::new("mem.nc").with_variable("x", &["a", "b"], array![1.0].into_dyn(), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_loader_counts_opens() {
        let loader = MemoryLoader::new();
        loader.insert(MemoryDataset::new("a.nc")).unwrap();
        assert!(loader.open(Path::new("a.nc")).is_ok());
        assert!(loader.open(Path::new("b.nc")).is_err());
        assert_eq!(loader.open_count(), 1);
    }
}

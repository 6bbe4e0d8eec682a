//! NetCDF-backed datasets.
//!
//! Metadata is read once when the file is opened. Variable data is read on
//! demand, so a property only loads the arrays it uses.

use ndarray::{Array, IxDyn};
use netcdf::{Attribute, Extent, Variable as NetCDFVariable};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::metadata::{AttributeValue, VariableInfo};
use super::{Dataset, DatasetLoader, DatasetRef};
use crate::error::{GridPropError, Result};

/// An opened NetCDF file
#[derive(Debug, Clone)]
pub struct NetcdfDataset {
    path: PathBuf,
    order: Vec<String>,
    variables: HashMap<String, VariableInfo>,
    global_attributes: HashMap<String, AttributeValue>,
}

impl NetcdfDataset {
    /// Open a NetCDF file and read its metadata
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GridPropError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }

        let file = netcdf::open(path)?;
        info!(path = %path.display(), "Opened NetCDF file");
        debug!(
            variables = file.variables().count(),
            dimensions = file.dimensions().count(),
            "NetCDF file layout"
        );

        let mut global_attributes = HashMap::new();
        for attr in file.attributes() {
            global_attributes.insert(attr.name().to_string(), convert_attribute(&attr)?);
        }

        let mut order = Vec::new();
        let mut variables = HashMap::new();
        for var in file.variables() {
            if !is_supported_variable(&var) {
                warn!(variable = %var.name(), "Skipping unsupported variable");
                continue;
            }
            let info = extract_variable(&var)?;
            order.push(info.name.clone());
            variables.insert(info.name.clone(), info);
        }

        Ok(Self {
            path: path.to_path_buf(),
            order,
            variables,
            global_attributes,
        })
    }

    pub fn global_attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.global_attributes
    }
}

impl Dataset for NetcdfDataset {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn variable_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.get(name)
    }

    fn read(&self, name: &str) -> Result<Array<f64, IxDyn>> {
        let info = self.variable_checked(name)?;
        let file = netcdf::open(&self.path)?;
        let var = file.variable(name).ok_or_else(|| GridPropError::UnresolvedVariable {
            message: format!("Variable {} disappeared from {}", name, self.path.display()),
        })?;

        // The NetCDF library converts every numeric type to double on read
        let values: Vec<f64> = var.get_values::<f64, _>(..)?;
        let mut array = Array::from_shape_vec(IxDyn(&info.shape), values)?;
        info.unpack(&mut array);
        debug!(variable = name, shape = ?info.shape, "Read NetCDF variable");
        Ok(array)
    }

    fn read_slice(&self, name: &str, ranges: &[Range<usize>]) -> Result<Array<f64, IxDyn>> {
        let info = self.variable_checked(name)?;
        info.check_slice(ranges)?;
        let file = netcdf::open(&self.path)?;
        let var = file.variable(name).ok_or_else(|| GridPropError::UnresolvedVariable {
            message: format!("Variable {} disappeared from {}", name, self.path.display()),
        })?;

        let extents: Vec<Extent> = ranges.iter().cloned().map(Extent::from).collect();
        let values: Vec<f64> = var.get_values::<f64, _>(extents.as_slice())?;
        let shape: Vec<usize> = ranges.iter().map(|r| r.end - r.start).collect();
        let mut array = Array::from_shape_vec(IxDyn(&shape), values)?;
        info.unpack(&mut array);
        debug!(variable = name, ?ranges, "Read NetCDF block");
        Ok(array)
    }
}

/// Loader opening NetCDF files from disk
#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfLoader;

impl DatasetLoader for NetcdfLoader {
    fn open(&self, path: &Path) -> Result<DatasetRef> {
        Ok(Arc::new(NetcdfDataset::open(path)?))
    }
}

fn extract_variable(var: &NetCDFVariable) -> Result<VariableInfo> {
    let dimensions: Vec<String> = var
        .dimensions()
        .iter()
        .map(|dim| dim.name().to_string())
        .collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

    let mut attributes = HashMap::new();
    for attr in var.attributes() {
        attributes.insert(attr.name().to_string(), convert_attribute(&attr)?);
    }

    Ok(VariableInfo {
        name: var.name().to_string(),
        dimensions,
        shape,
        attributes,
    })
}

/// Check if a variable has a supported type that we can work with
fn is_supported_variable(var: &NetCDFVariable) -> bool {
    use netcdf::types::{BasicType, VariableType};

    matches!(
        var.vartype(),
        VariableType::Basic(BasicType::Byte)
            | VariableType::Basic(BasicType::Short)
            | VariableType::Basic(BasicType::Int)
            | VariableType::Basic(BasicType::Float)
            | VariableType::Basic(BasicType::Double)
    )
}

/// Convert a NetCDF attribute to our AttributeValue enum
fn convert_attribute(attr: &Attribute) -> Result<AttributeValue> {
    use netcdf::AttributeValue as NcAttributeValue;

    let value = attr.value()?;
    let converted = match value {
        NcAttributeValue::Str(s) => AttributeValue::Text(s),
        NcAttributeValue::Uchar(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Schar(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Short(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Int(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Float(v) => AttributeValue::Number(v as f64),
        NcAttributeValue::Double(v) => AttributeValue::Number(v),
        NcAttributeValue::Shorts(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        NcAttributeValue::Ints(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        NcAttributeValue::Floats(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
        NcAttributeValue::Doubles(v) => AttributeValue::NumberArray(v),
        other => AttributeValue::Text(format!("{:?}", other)),
    };
    Ok(converted)
}

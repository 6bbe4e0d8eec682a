//! Variable metadata shared by dataset implementations.

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

use crate::error::{GridPropError, Result};

/// Attributes that mark missing values
const MISSING_ATTRIBUTES: [&str; 2] = ["_FillValue", "missing_value"];

/// Metadata about a dataset variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Name of the variable
    pub name: String,
    /// Dimension names, outermost first
    pub dimensions: Vec<String>,
    /// Shape of the variable (dimension sizes)
    pub shape: Vec<usize>,
    /// Variable attributes
    pub attributes: HashMap<String, AttributeValue>,
}

/// Possible attribute values in a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numbers carried by the attribute, whether scalar or array
    pub fn as_numbers(&self) -> Vec<f64> {
        match self {
            AttributeValue::Number(v) => vec![*v],
            AttributeValue::NumberArray(v) => v.clone(),
            AttributeValue::Text(_) => Vec::new(),
        }
    }
}

impl VariableInfo {
    pub fn new(name: impl Into<String>, dimensions: &[&str], shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn text_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::as_text)
    }

    pub fn number_attribute(&self, name: &str) -> Option<f64> {
        self.attributes
            .get(name)
            .and_then(|a| a.as_numbers().first().copied())
    }

    /// The `units` attribute, if present and non-empty
    pub fn units(&self) -> Option<&str> {
        self.text_attribute("units").filter(|u| !u.trim().is_empty())
    }

    /// Fail unless `ranges` selects a block inside this variable
    pub fn check_slice(&self, ranges: &[Range<usize>]) -> Result<()> {
        if ranges.len() != self.shape.len() {
            return Err(GridPropError::dimension(format!(
                "Slice of {} has {} ranges for {} dimensions",
                self.name,
                ranges.len(),
                self.shape.len()
            )));
        }
        if let Some((range, len)) = ranges
            .iter()
            .zip(&self.shape)
            .find(|(r, &len)| r.start > r.end || r.end > len)
        {
            return Err(GridPropError::shape_mismatch(format!(
                "Slice {:?} of {} is outside a dimension of length {}",
                range, self.name, len
            )));
        }
        Ok(())
    }

    /// Mask missing values and apply CF packing to raw values.
    ///
    /// Entries equal to `_FillValue` or `missing_value` become NaN, then
    /// `scale_factor` and `add_offset` are applied.
    pub fn unpack(&self, data: &mut ArrayD<f64>) {
        let missing: Vec<f64> = MISSING_ATTRIBUTES
            .iter()
            .filter_map(|name| self.attributes.get(*name))
            .flat_map(AttributeValue::as_numbers)
            .collect();
        let scale = self.number_attribute("scale_factor").unwrap_or(1.0);
        let offset = self.number_attribute("add_offset").unwrap_or(0.0);

        data.mapv_inplace(|v| {
            if missing.contains(&v) {
                f64::NAN
            } else {
                v * scale + offset
            }
        });
    }
}

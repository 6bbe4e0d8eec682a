//! Named set of properties with unique names.

use std::collections::HashMap;
use tracing::debug;

use super::{GriddedProperty, Property, VectorGriddedProperty};
use crate::error::{GridPropError, Result};

/// Owns properties and keeps their names unique
#[derive(Debug, Default)]
pub struct PropertyCollection {
    properties: Vec<Property>,
    counters: HashMap<String, usize>,
}

impl PropertyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next free name of the form `<prefix><n>`, counting from 0 per prefix
    pub fn generate_name(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            let candidate = format!("{}{}", prefix, counter);
            *counter += 1;
            if !self.properties.iter().any(|p| p.name() == candidate) {
                return candidate;
            }
        }
    }

    /// Add a property; its name must not already be taken
    pub fn insert(&mut self, property: impl Into<Property>) -> Result<()> {
        let property = property.into();
        if self.contains(property.name()) {
            return Err(GridPropError::construction(format!(
                "A property named {} already exists",
                property.name()
            )));
        }
        debug!(property = property.name(), "Added to collection");
        self.properties.push(property);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn scalar(&self, name: &str) -> Option<&GriddedProperty> {
        self.get(name).and_then(Property::as_scalar)
    }

    pub fn vector(&self, name: &str) -> Option<&VectorGriddedProperty> {
        self.get(name).and_then(Property::as_vector)
    }

    pub fn remove(&mut self, name: &str) -> Option<Property> {
        let index = self.properties.iter().position(|p| p.name() == name)?;
        Some(self.properties.remove(index))
    }

    /// Names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.properties.iter().map(Property::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridRef, RectilinearGrid};
    use ndarray::Array2;
    use std::sync::Arc;

    fn property(grid: &GridRef, name: &str) -> GriddedProperty {
        GriddedProperty::builder()
            .name(name)
            .grid(Arc::clone(grid))
            .data(Array2::<f64>::zeros((2, 2)).into_dyn())
            .build()
            .unwrap()
    }

    #[test]
    fn test_unique_names() {
        let grid: GridRef = Arc::new(RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap());
        let mut props = PropertyCollection::new();

        let first = props.generate_name("temperature");
        assert_eq!(first, "temperature0");
        props.insert(property(&grid, &first)).unwrap();
        props.insert(property(&grid, "temperature1")).unwrap();
        assert_eq!(props.generate_name("temperature"), "temperature2");
        assert_eq!(props.generate_name("salinity"), "salinity0");

        let err = props.insert(property(&grid, "temperature0")).unwrap_err();
        assert!(matches!(err, GridPropError::Construction { .. }));
        assert_eq!(props.names(), vec!["temperature0", "temperature1"]);
    }

    #[test]
    fn test_lookup_and_remove() {
        let grid: GridRef = Arc::new(RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap());
        let mut props = PropertyCollection::new();
        props.insert(property(&grid, "salt")).unwrap();

        assert!(props.scalar("salt").is_some());
        assert!(props.vector("salt").is_none());
        assert!(props.remove("salt").is_some());
        assert!(props.is_empty());
    }
}

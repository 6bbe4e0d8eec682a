//! Vector gridded property composed of co-located scalar components.

use chrono::NaiveDateTime;
use ndarray::{Array2, ArrayView2, Axis};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::scalar::GriddedProperty;
use super::FieldKind;
use crate::cache::{Fingerprint, ResultCache, VECTOR_CACHE_ENTRIES};
use crate::depth::DepthModel;
use crate::error::{GridPropError, Result};
use crate::grid::common::check_points;
use crate::grid::GridRef;
use crate::time::TimeAxis;

/// Multi-component field such as a (u, v) current
pub struct VectorGriddedProperty {
    name: String,
    units: Option<String>,
    components: Vec<GriddedProperty>,
    memoize: bool,
    cache: Mutex<ResultCache<Array2<f64>>>,
}

impl fmt::Debug for VectorGriddedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorGriddedProperty")
            .field("name", &self.name)
            .field("units", &self.units)
            .field("components", &self.varnames())
            .finish()
    }
}

/// Pointer equality on shared grids, ignoring vtables
pub(crate) fn same_grid(a: &GridRef, b: &GridRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl VectorGriddedProperty {
    pub fn builder() -> VectorGriddedPropertyBuilder {
        VectorGriddedPropertyBuilder::default()
    }

    /// Values at `points` and `time`, one column per component
    pub fn at(
        &self,
        points: &ArrayView2<f64>,
        time: NaiveDateTime,
        units: Option<&str>,
        extrapolate: bool,
    ) -> Result<Array2<f64>> {
        let raw = self.raw_at(points, time, extrapolate)?;
        let mut values = Array2::clone(&raw);
        for (component, column) in self.components.iter().zip(values.axis_iter_mut(Axis(1))) {
            component.finish(column, units)?;
        }
        Ok(values)
    }

    /// Surface-layer values, one column per component
    pub fn at_surface(
        &self,
        points: &ArrayView2<f64>,
        time: NaiveDateTime,
        units: Option<&str>,
        extrapolate: bool,
    ) -> Result<Array2<f64>> {
        let columns = self
            .components
            .iter()
            .map(|c| c.at_surface(points, time, units, extrapolate))
            .collect::<Result<Vec<_>>>()?;
        stack_columns(points.nrows(), columns.iter().map(|c| c.view()))
    }

    fn raw_at(
        &self,
        points: &ArrayView2<f64>,
        time: NaiveDateTime,
        extrapolate: bool,
    ) -> Result<Arc<Array2<f64>>> {
        check_points(points)?;
        let fingerprint = Fingerprint::new(points, time, extrapolate);
        if self.memoize {
            if let Some(hit) = self.cache.lock().lookup(&fingerprint) {
                debug!(property = %self.name, %time, "Cache hit");
                return Ok(hit);
            }
        }

        let columns = self
            .components
            .iter()
            .map(|c| c.raw_at(points, time, extrapolate))
            .collect::<Result<Vec<_>>>()?;
        let values = stack_columns(points.nrows(), columns.iter().map(|c| c.view()))?;
        if !self.memoize {
            return Ok(Arc::new(values));
        }
        debug!(property = %self.name, %time, points = points.nrows(), "Cache miss");
        Ok(self.cache.lock().store(fingerprint, values))
    }

    /// Replace the time axis of every component.
    ///
    /// Either every component accepts the axis or none is changed.
    pub fn set_time(&mut self, time: Option<TimeAxis>) -> Result<()> {
        for component in &self.components {
            FieldKind::classify_at(
                component.data_shape(),
                component.grid().as_ref(),
                time.as_ref(),
                component.depth(),
                Some(component.location()),
            )?;
        }
        for component in &mut self.components {
            component.set_time(time.clone())?;
        }
        self.clear_cache();
        Ok(())
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn components(&self) -> &[GriddedProperty] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&GriddedProperty> {
        self.components.iter().find(|c| c.name() == name)
    }

    pub fn varnames(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|c| c.varname().unwrap_or(c.name()).to_string())
            .collect()
    }

    fn first(&self) -> &GriddedProperty {
        // Non-empty by construction
        &self.components[0]
    }

    pub fn grid(&self) -> &GridRef {
        self.first().grid()
    }

    pub fn time(&self) -> Option<&TimeAxis> {
        self.first().time()
    }

    pub fn depth(&self) -> Option<&DepthModel> {
        self.first().depth()
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.first().data_file()
    }

    pub fn grid_file(&self) -> Option<&Path> {
        self.first().grid_file()
    }

    pub fn is_data_on_nodes(&self) -> bool {
        self.first().is_data_on_nodes()
    }

    pub fn data_shape(&self) -> &[usize] {
        self.first().data_shape()
    }

    pub fn memoize(&self) -> bool {
        self.memoize
    }
}

fn stack_columns<'a>(
    rows: usize,
    columns: impl Iterator<Item = ndarray::ArrayView1<'a, f64>>,
) -> Result<Array2<f64>> {
    let columns: Vec<_> = columns.collect();
    let mut out = Array2::zeros((rows, columns.len()));
    for (mut target, column) in out.axis_iter_mut(Axis(1)).zip(columns) {
        if column.len() != rows {
            return Err(GridPropError::shape_mismatch(format!(
                "Component returned {} values for {} points",
                column.len(),
                rows
            )));
        }
        target.assign(&column);
    }
    Ok(out)
}

/// Builder for [`VectorGriddedProperty`]
pub struct VectorGriddedPropertyBuilder {
    name: Option<String>,
    units: Option<String>,
    components: Vec<GriddedProperty>,
    grid: Option<GridRef>,
    time: Option<TimeAxis>,
    memoize: bool,
    cache_entries: usize,
}

impl Default for VectorGriddedPropertyBuilder {
    fn default() -> Self {
        Self {
            name: None,
            units: None,
            components: Vec::new(),
            grid: None,
            time: None,
            memoize: true,
            cache_entries: VECTOR_CACHE_ENTRIES,
        }
    }
}

impl VectorGriddedPropertyBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn component(mut self, component: GriddedProperty) -> Self {
        self.components.push(component);
        self
    }

    pub fn components(mut self, components: impl IntoIterator<Item = GriddedProperty>) -> Self {
        self.components.extend(components);
        self
    }

    /// Grid every component must already share
    pub fn grid(mut self, grid: GridRef) -> Self {
        self.grid = Some(grid);
        self
    }

    /// Time axis applied to every component
    pub fn time(mut self, time: TimeAxis) -> Self {
        self.time = Some(time);
        self
    }

    pub fn memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn cache_entries(mut self, entries: usize) -> Self {
        self.cache_entries = entries;
        self
    }

    pub fn build(self) -> Result<VectorGriddedProperty> {
        let mut components = self.components;
        let Some(first) = components.first() else {
            return Err(GridPropError::construction(
                "Vector property requires at least one component",
            ));
        };
        let grid = self.grid.unwrap_or_else(|| Arc::clone(first.grid()));

        if let Some(stray) = components.iter().find(|c| !same_grid(c.grid(), &grid)) {
            return Err(GridPropError::construction(format!(
                "Component {} is not on the shared grid",
                stray.name()
            )));
        }

        if let Some(time) = self.time {
            for component in &mut components {
                component.set_time(Some(time.clone())).map_err(|e| {
                    GridPropError::construction(format!(
                        "Time was not compatible with component {}: {}",
                        component.name(),
                        e
                    ))
                })?;
            }
        } else if let Some(stray) = components.iter().find(|c| c.time() != components[0].time()) {
            return Err(GridPropError::construction(format!(
                "Component {} has a different time axis",
                stray.name()
            )));
        }

        let depth = components[0].depth();
        let mismatched = |c: &GriddedProperty| match (c.depth(), depth) {
            (None, None) => false,
            (Some(a), Some(b)) => !a.same_layers(b),
            _ => true,
        };
        if let Some(stray) = components.iter().find(|c| mismatched(c)) {
            return Err(GridPropError::construction(format!(
                "Component {} has a different depth model",
                stray.name()
            )));
        }

        let units = self.units.or_else(|| {
            let first = components[0].units();
            components
                .iter()
                .all(|c| c.units() == first)
                .then(|| first.map(str::to_string))
                .flatten()
        });
        let name = self.name.unwrap_or_else(|| {
            components
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join("_")
        });
        debug!(property = %name, components = components.len(), "Built vector property");

        Ok(VectorGriddedProperty {
            name,
            units,
            components,
            memoize: self.memoize,
            cache: Mutex::new(ResultCache::new(self.cache_entries)),
        })
    }
}

//! Scalar gridded property.

use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayD, ArrayView2, ArrayViewD, ArrayViewMut1, Axis};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use super::data::FieldData;
use super::FieldKind;
use crate::cache::{Fingerprint, ResultCache, SCALAR_CACHE_ENTRIES};
use crate::depth::{is_surface_only, DepthBrackets, DepthModel, LayerBracket};
use crate::error::{GridPropError, Result};
use crate::grid::common::check_points;
use crate::grid::{DataLocation, GridRef};
use crate::time::TimeAxis;
use crate::units;

/// A physical quantity sampled on a shared grid
pub struct GriddedProperty {
    name: String,
    units: Option<String>,
    time: Option<TimeAxis>,
    depth: Option<DepthModel>,
    data: FieldData,
    grid: GridRef,
    fill_value: f64,
    varname: Option<String>,
    data_file: Option<PathBuf>,
    grid_file: Option<PathBuf>,
    kind: FieldKind,
    location: DataLocation,
    /// Location given by the caller instead of inferred from the data shape
    pinned_location: Option<DataLocation>,
    memoize: bool,
    cache: Mutex<ResultCache<Array1<f64>>>,
}

impl fmt::Debug for GriddedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GriddedProperty")
            .field("name", &self.name)
            .field("units", &self.units)
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("data", &self.data)
            .field("grid", &self.grid.name())
            .finish()
    }
}

impl GriddedProperty {
    pub fn builder() -> GriddedPropertyBuilder {
        GriddedPropertyBuilder::default()
    }

    /// Value of the property at `points` and `time`.
    ///
    /// `points` is N×2 (surface) or N×3 with depth positive downward.
    /// Masked results are replaced with the fill value. Requesting `units`
    /// converts from the stored units.
    pub fn at(
        &self,
        points: &ArrayView2<f64>,
        time: NaiveDateTime,
        units: Option<&str>,
        extrapolate: bool,
    ) -> Result<Array1<f64>> {
        let raw = self.raw_at(points, time, extrapolate)?;
        let mut values = Array1::clone(&raw);
        self.finish(values.view_mut(), units)?;
        Ok(values)
    }

    /// Value at the surface layer only, ignoring any depth column.
    ///
    /// Not memoized; the grid still reuses point locations.
    pub fn at_surface(
        &self,
        points: &ArrayView2<f64>,
        time: NaiveDateTime,
        units: Option<&str>,
        extrapolate: bool,
    ) -> Result<Array1<f64>> {
        check_points(points)?;
        let memo = crate::cache::hash_points(points);
        let mut values = match (&self.time, self.kind.has_time()) {
            (Some(axis), true) if axis.len() > 1 => {
                self.blend_in_time(axis, time, extrapolate, |t| {
                    self.at_surface_slab(points, t, memo)
                })?
            }
            (_, true) => self.at_surface_slab(points, 0, memo)?,
            (_, false) => {
                let data = self.data.full()?;
                self.at_surface_plane(points, data.view(), memo)?
            }
        };
        self.finish(values.view_mut(), units)?;
        Ok(values)
    }

    /// Values at every grid center, in the grid's center order.
    ///
    /// Stationary center-located data is returned directly.
    pub fn center_values(
        &self,
        time: NaiveDateTime,
        units: Option<&str>,
        extrapolate: bool,
    ) -> Result<Array1<f64>> {
        if self.kind == FieldKind::Stationary && self.location == DataLocation::Center {
            let mut values = Array1::from_iter(self.data.full()?.iter().copied());
            self.finish(values.view_mut(), units)?;
            return Ok(values);
        }
        let centers = self.grid.center_points();
        self.at(&centers.view(), time, units, extrapolate)
    }

    /// Raw native-unit result, memoized when enabled
    pub(crate) fn raw_at(
        &self,
        points: &ArrayView2<f64>,
        time: NaiveDateTime,
        extrapolate: bool,
    ) -> Result<Arc<Array1<f64>>> {
        check_points(points)?;
        let fingerprint = Fingerprint::new(points, time, extrapolate);
        if self.memoize {
            if let Some(hit) = self.cache.lock().lookup(&fingerprint) {
                debug!(property = %self.name, %time, "Cache hit");
                return Ok(hit);
            }
        }

        let values = self.interpolate(points, time, extrapolate, fingerprint.points)?;
        if !self.memoize {
            return Ok(Arc::new(values));
        }
        debug!(property = %self.name, %time, points = points.nrows(), "Cache miss");
        Ok(self.cache.lock().store(fingerprint, values))
    }

    /// Convert to `units` and replace masked values with the fill value
    pub(crate) fn finish(&self, mut values: ArrayViewMut1<f64>, units: Option<&str>) -> Result<()> {
        if let Some((from, to)) = units::conversion(self.units.as_deref(), units)? {
            units::convert_in_place(from, to, &mut values)?;
        }
        let fill = self.fill_value;
        values.mapv_inplace(|v| if v.is_nan() { fill } else { v });
        Ok(())
    }

    fn interpolate(
        &self,
        points: &ArrayView2<f64>,
        time: NaiveDateTime,
        extrapolate: bool,
        memo: u64,
    ) -> Result<Array1<f64>> {
        match self.kind {
            FieldKind::Stationary => self.at_plane(points, self.data.full()?.view(), memo),
            FieldKind::DepthResolved => self.at_depth(points, self.data.full()?.view(), extrapolate, memo),
            FieldKind::TimeVarying | FieldKind::TimeAndDepth => match &self.time {
                Some(axis) if axis.len() > 1 => {
                    let surface = self.kind.has_depth() && is_surface_only(points);
                    self.blend_in_time(axis, time, extrapolate, |t| {
                        if surface {
                            self.at_surface_slab(points, t, memo)
                        } else {
                            self.at_time_index(points, t, extrapolate, memo)
                        }
                    })
                }
                _ => self.at_time_index(points, 0, extrapolate, memo),
            },
        }
    }

    /// Resolve `time` against `axis` and blend the bracketing samples
    fn blend_in_time<F>(
        &self,
        axis: &TimeAxis,
        time: NaiveDateTime,
        extrapolate: bool,
        sample: F,
    ) -> Result<Array1<f64>>
    where
        F: Fn(usize) -> Result<Array1<f64>>,
    {
        if !extrapolate {
            axis.valid_time(time)?;
        }
        if time <= axis.min_time() {
            return sample(0);
        }
        if time >= axis.max_time() {
            return sample(axis.len() - 1);
        }

        let i1 = axis.index_of(time, extrapolate)?;
        let alpha = axis.interp_alpha(time, extrapolate)?;
        trace!(property = %self.name, index = i1, alpha, "Blending time steps");
        let v0 = sample(i1 - 1)?;
        let v1 = sample(i1)?;
        Ok(&v0 + &((&v1 - &v0) * alpha))
    }

    fn at_plane(&self, points: &ArrayView2<f64>, plane: ArrayViewD<f64>, memo: u64) -> Result<Array1<f64>> {
        self.grid
            .interpolate_located(points, &plane, self.location, Some(memo))
    }

    fn at_time_index(
        &self,
        points: &ArrayView2<f64>,
        index: usize,
        extrapolate: bool,
        memo: u64,
    ) -> Result<Array1<f64>> {
        let slab = self.data.leading(index)?;
        if self.kind.has_depth() {
            self.at_depth(points, slab.view(), extrapolate, memo)
        } else {
            self.at_plane(points, slab.view(), memo)
        }
    }

    fn at_surface_slab(&self, points: &ArrayView2<f64>, index: usize, memo: u64) -> Result<Array1<f64>> {
        self.at_surface_plane(points, self.data.leading(index)?.view(), memo)
    }

    /// Interpolate the surface layer of a slab without a time dimension
    fn at_surface_plane(
        &self,
        points: &ArrayView2<f64>,
        slab: ArrayViewD<f64>,
        memo: u64,
    ) -> Result<Array1<f64>> {
        if !self.kind.has_depth() {
            return self.at_plane(points, slab, memo);
        }
        let depth = self.depth_model()?;
        let surface = depth.surface_index(slab.len_of(Axis(0)))?;
        self.at_plane(points, slab.index_axis(Axis(0), surface), memo)
    }

    /// Interpolate a `[depth, spatial...]` slab at each point's depth.
    ///
    /// Underground points are masked unless extrapolating, which samples the
    /// bottom layer instead.
    fn at_depth(
        &self,
        points: &ArrayView2<f64>,
        slab: ArrayViewD<f64>,
        extrapolate: bool,
        memo: u64,
    ) -> Result<Array1<f64>> {
        let depth = self.depth_model()?;
        let n_layers = slab.len_of(Axis(0));

        let brackets = match depth.interpolation_alphas(points, n_layers, Some(memo))? {
            DepthBrackets::SurfaceOnly => {
                let surface = depth.surface_index(n_layers)?;
                return self.at_plane(points, slab.index_axis(Axis(0), surface), memo);
            }
            DepthBrackets::Resolved(brackets) => brackets,
        };

        let bottom = depth.bottom_index(n_layers)?;
        let mut needed = BTreeSet::new();
        for bracket in &brackets {
            match *bracket {
                LayerBracket::Layer(k) => {
                    needed.insert(k);
                }
                LayerBracket::Between { shallow, deep, .. } => {
                    needed.insert(shallow);
                    needed.insert(deep);
                }
                LayerBracket::Underground if extrapolate => {
                    needed.insert(bottom);
                }
                LayerBracket::Underground => {}
            }
        }

        let mut layers = BTreeMap::new();
        for k in needed {
            layers.insert(k, self.at_plane(points, slab.index_axis(Axis(0), k), memo)?);
        }

        let values = brackets
            .iter()
            .enumerate()
            .map(|(i, bracket)| match *bracket {
                LayerBracket::Layer(k) => layers[&k][i],
                LayerBracket::Between { shallow, deep, alpha } => {
                    let v0 = layers[&shallow][i];
                    v0 + (layers[&deep][i] - v0) * alpha
                }
                LayerBracket::Underground if extrapolate => layers[&bottom][i],
                LayerBracket::Underground => f64::NAN,
            })
            .collect::<Vec<_>>();
        Ok(Array1::from(values))
    }

    fn depth_model(&self) -> Result<&DepthModel> {
        self.depth.as_ref().ok_or_else(|| {
            GridPropError::construction(format!("Property {} has depth data but no depth model", self.name))
        })
    }

    /// Replace the time axis, re-validating it against the bound data
    pub fn set_time(&mut self, time: Option<TimeAxis>) -> Result<()> {
        let (kind, location) = FieldKind::classify_at(
            self.data.shape(),
            self.grid.as_ref(),
            time.as_ref(),
            self.depth.as_ref(),
            self.pinned_location,
        )?;
        self.time = time;
        self.kind = kind;
        self.location = location;
        self.clear_cache();
        Ok(())
    }

    /// Replace the data, re-validating it against the grid and time axis
    pub fn set_data(&mut self, data: impl Into<FieldData>) -> Result<()> {
        let data = data.into();
        let (kind, location) = FieldKind::classify_at(
            data.shape(),
            self.grid.as_ref(),
            self.time.as_ref(),
            self.depth.as_ref(),
            self.pinned_location,
        )?;
        self.data = data;
        self.kind = kind;
        self.location = location;
        self.clear_cache();
        Ok(())
    }

    /// Read deferred data into memory; cached results stay valid
    pub fn load_data(&mut self) -> Result<()> {
        self.data.load()
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

    pub fn time(&self) -> Option<&TimeAxis> {
        self.time.as_ref()
    }

    pub fn depth(&self) -> Option<&DepthModel> {
        self.depth.as_ref()
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    pub fn grid(&self) -> &GridRef {
        &self.grid
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    pub fn varname(&self) -> Option<&str> {
        self.varname.as_deref()
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    pub fn grid_file(&self) -> Option<&Path> {
        self.grid_file.as_deref()
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn location(&self) -> DataLocation {
        self.location
    }

    pub fn is_data_on_nodes(&self) -> bool {
        self.location == DataLocation::Node
    }

    pub fn data_shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn grid_shape(&self) -> Vec<usize> {
        self.grid.node_shape()
    }

    pub fn memoize(&self) -> bool {
        self.memoize
    }
}

/// Builder for [`GriddedProperty`]
pub struct GriddedPropertyBuilder {
    name: Option<String>,
    units: Option<String>,
    time: Option<TimeAxis>,
    depth: Option<DepthModel>,
    data: Option<FieldData>,
    grid: Option<GridRef>,
    location: Option<DataLocation>,
    fill_value: f64,
    varname: Option<String>,
    data_file: Option<PathBuf>,
    grid_file: Option<PathBuf>,
    memoize: bool,
    cache_entries: usize,
}

impl Default for GriddedPropertyBuilder {
    fn default() -> Self {
        Self {
            name: None,
            units: None,
            time: None,
            depth: None,
            data: None,
            grid: None,
            location: None,
            fill_value: 0.0,
            varname: None,
            data_file: None,
            grid_file: None,
            memoize: true,
            cache_entries: SCALAR_CACHE_ENTRIES,
        }
    }
}

impl GriddedPropertyBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn time(mut self, time: TimeAxis) -> Self {
        self.time = Some(time);
        self
    }

    pub fn depth(mut self, depth: DepthModel) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn data(mut self, data: ArrayD<f64>) -> Self {
        self.data = Some(FieldData::Loaded(data));
        self
    }

    /// Data in memory or left in a dataset until queried
    pub fn field_data(mut self, data: FieldData) -> Self {
        self.data = Some(data);
        self
    }

    /// Place the data on nodes or centers instead of inferring it from its
    /// shape, for grids where both shapes coincide
    pub fn location(mut self, location: DataLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn grid(mut self, grid: GridRef) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn varname(mut self, varname: impl Into<String>) -> Self {
        self.varname = Some(varname.into());
        self
    }

    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    pub fn grid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.grid_file = Some(path.into());
        self
    }

    /// Disable to skip the result cache entirely
    pub fn memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn cache_entries(mut self, entries: usize) -> Self {
        self.cache_entries = entries;
        self
    }

    pub fn build(self) -> Result<GriddedProperty> {
        let grid = self
            .grid
            .ok_or_else(|| GridPropError::construction("Gridded property requires a grid"))?;
        let data = self
            .data
            .ok_or_else(|| GridPropError::construction("Gridded property requires data"))?;
        let (kind, location) = FieldKind::classify_at(
            data.shape(),
            grid.as_ref(),
            self.time.as_ref(),
            self.depth.as_ref(),
            self.location,
        )?;

        let name = self
            .name
            .or_else(|| self.varname.clone())
            .unwrap_or_else(|| "GriddedProperty".to_string());
        debug!(
            property = %name,
            ?kind,
            ?location,
            shape = ?data.shape(),
            loaded = data.is_loaded(),
            grid = grid.name(),
            "Built gridded property"
        );

        Ok(GriddedProperty {
            name,
            units: self.units,
            time: self.time,
            depth: self.depth,
            data,
            grid,
            fill_value: self.fill_value,
            varname: self.varname,
            data_file: self.data_file,
            grid_file: self.grid_file,
            kind,
            location,
            pinned_location: self.location,
            memoize: self.memoize,
            cache: Mutex::new(ResultCache::new(self.cache_entries)),
        })
    }
}

//! Shared-resource resolution for building properties from a source.
//!
//! Properties built together from one source reuse a single opened dataset,
//! grid and time axis. [`SharedResources::resolve`] runs once per
//! construction call and fills in whatever the request leaves unset.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::defaults::PropertyKind;
use super::{DatasetLoader, DatasetRef};
use crate::depth::DepthModel;
use crate::error::{GridPropError, Result};
use crate::grid::{GridRef, GridTopology, RectilinearGrid, TriangularGrid};
use crate::time::TimeAxis;

/// Coordinate variable pairs tried when no topology is given
const DEFAULT_COORDINATES: [(&str, &str); 2] = [("lon", "lat"), ("longitude", "latitude")];

/// Everything needed to build a property from a data source.
///
/// Unset fields are resolved from the source: `filename` stands for both
/// `data_file` and `grid_file`; a missing variable name is looked up from
/// the `kind` table; a missing grid is read from the grid file.
#[derive(Debug, Clone, Default)]
pub struct SourceRequest {
    pub filename: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
    pub grid_file: Option<PathBuf>,
    pub dataset: Option<DatasetRef>,
    pub varname: Option<String>,
    pub varnames: Option<Vec<String>>,
    pub kind: Option<PropertyKind>,
    pub name: Option<String>,
    pub units: Option<String>,
    pub time: Option<TimeAxis>,
    pub grid: Option<GridRef>,
    pub grid_topology: Option<GridTopology>,
    pub depth: Option<DepthModel>,
    pub fill_value: f64,
    /// Read whole variables up front instead of one slab per query
    pub load_all: bool,
    pub memoize: Option<bool>,
    pub cache_entries: Option<usize>,
    pub vector_cache_entries: Option<usize>,
}

impl SourceRequest {
    /// Request reading data and grid from one file
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    pub fn varname(mut self, varname: impl Into<String>) -> Self {
        self.varname = Some(varname.into());
        self
    }

    pub fn varnames<S: Into<String>>(mut self, varnames: impl IntoIterator<Item = S>) -> Self {
        self.varnames = Some(varnames.into_iter().map(Into::into).collect());
        self
    }

    pub fn kind(mut self, kind: PropertyKind) -> Self {
        self.kind = Some(kind);
        self
    }

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

    pub fn grid(mut self, grid: GridRef) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn grid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.grid_file = Some(path.into());
        self
    }

    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    pub fn dataset(mut self, dataset: DatasetRef) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn grid_topology(mut self, topology: GridTopology) -> Self {
        self.grid_topology = Some(topology);
        self
    }

    pub fn depth(mut self, depth: DepthModel) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn load_all(mut self, load_all: bool) -> Self {
        self.load_all = load_all;
        self
    }

    pub fn memoize(mut self, memoize: bool) -> Self {
        self.memoize = Some(memoize);
        self
    }

    pub fn cache_entries(mut self, entries: usize) -> Self {
        self.cache_entries = Some(entries);
        self
    }

    pub fn vector_cache_entries(mut self, entries: usize) -> Self {
        self.vector_cache_entries = Some(entries);
        self
    }

    pub(crate) fn resolved_data_file(&self) -> Option<PathBuf> {
        self.data_file.clone().or_else(|| self.filename.clone())
    }

    pub(crate) fn resolved_grid_file(&self) -> Option<PathBuf> {
        self.grid_file
            .clone()
            .or_else(|| self.filename.clone())
            .or_else(|| self.resolved_data_file())
    }
}

/// Dataset, grid and file paths shared by every component of one build
#[derive(Debug, Clone)]
pub struct SharedResources {
    pub dataset: DatasetRef,
    pub grid_dataset: DatasetRef,
    pub data_file: Option<PathBuf>,
    pub grid_file: Option<PathBuf>,
    pub grid: GridRef,
}

impl SharedResources {
    /// Open datasets and build the grid, reusing whatever `request` supplies
    pub fn resolve(request: &SourceRequest, loader: &dyn DatasetLoader) -> Result<Self> {
        let data_file = request.resolved_data_file();
        let grid_file = request.resolved_grid_file();

        let dataset = match (&request.dataset, &data_file) {
            (Some(dataset), _) => Arc::clone(dataset),
            (None, Some(path)) => loader.open(path)?,
            (None, None) => {
                return Err(GridPropError::construction(
                    "A dataset, filename or data_file is required",
                ))
            }
        };

        let grid_dataset = match &grid_file {
            Some(path) if dataset.path() != Some(path.as_path()) => loader.open(path)?,
            _ => Arc::clone(&dataset),
        };

        let grid = match &request.grid {
            Some(grid) => Arc::clone(grid),
            None => grid_from_dataset(&grid_dataset, request.grid_topology.as_ref())?,
        };

        info!(
            data_file = ?data_file,
            grid_file = ?grid_file,
            grid = grid.name(),
            "Resolved shared resources"
        );

        Ok(Self {
            dataset,
            grid_dataset,
            data_file: data_file.or_else(|| request.dataset.as_ref().and_then(|d| d.path().map(Path::to_path_buf))),
            grid_file,
            grid,
        })
    }

    /// The request's time axis, or the one discovered for `varname`
    pub fn time_for(&self, request: &SourceRequest, varname: &str) -> Result<Option<TimeAxis>> {
        match &request.time {
            Some(time) => Ok(Some(time.clone())),
            None => discover_time(&self.dataset, varname),
        }
    }
}

/// Find a CF time coordinate for `varname`.
///
/// Candidates are the variable's `time` attribute, then its first
/// dimension. Only a coordinate whose units read `<unit> since <epoch>`
/// counts as time.
pub fn discover_time(dataset: &DatasetRef, varname: &str) -> Result<Option<TimeAxis>> {
    let info = dataset.variable_checked(varname)?;
    let candidates = info
        .text_attribute("time")
        .into_iter()
        .chain(info.dimensions.first().map(String::as_str));

    for candidate in candidates {
        let Some(coordinate) = dataset.variable(candidate) else {
            continue;
        };
        let Some(units) = coordinate.text_attribute("units").filter(|u| u.contains(" since ")) else {
            continue;
        };
        let values = dataset.read_vec(candidate)?;
        debug!(variable = varname, time = candidate, steps = values.len(), "Discovered time axis");
        return TimeAxis::from_cf(&values, units).map(Some);
    }
    Ok(None)
}

/// Build a grid from coordinate variables in `dataset`
pub fn grid_from_dataset(dataset: &DatasetRef, topology: Option<&GridTopology>) -> Result<GridRef> {
    let topology = match topology {
        Some(topology) => topology.clone(),
        None => DEFAULT_COORDINATES
            .iter()
            .find(|(lon, lat)| dataset.has_variable(lon) && dataset.has_variable(lat))
            .map(|(lon, lat)| GridTopology::rectilinear(*lon, *lat))
            .ok_or_else(|| {
                GridPropError::construction(format!(
                    "No grid coordinates found in {}; a grid topology must be supplied",
                    dataset
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "dataset".to_string())
                ))
            })?,
    };

    let lon = dataset.read_vec(&topology.node_lon)?;
    let lat = dataset.read_vec(&topology.node_lat)?;

    let grid: GridRef = match &topology.faces {
        None => Arc::new(RectilinearGrid::new(lon, lat)?.with_topology(topology)),
        Some(faces_var) => {
            if lon.len() != lat.len() {
                return Err(GridPropError::shape_mismatch(format!(
                    "Node coordinates differ in length: {} longitudes, {} latitudes",
                    lon.len(),
                    lat.len()
                )));
            }
            let faces = read_faces(dataset, faces_var)?;
            let nodes = lon.into_iter().zip(lat).map(|(x, y)| [x, y]).collect();
            Arc::new(TriangularGrid::new(nodes, faces)?.with_topology(topology))
        }
    };
    Ok(grid)
}

/// Read face-node connectivity, honouring a `start_index` of 1
fn read_faces(dataset: &DatasetRef, name: &str) -> Result<Vec<[usize; 3]>> {
    let info = dataset.variable_checked(name)?;
    let start = info.number_attribute("start_index").unwrap_or(0.0) as usize;
    let raw = dataset.read(name)?;
    if raw.ndim() != 2 || raw.shape()[1] != 3 {
        return Err(GridPropError::dimension(format!(
            "Face variable {} has shape {:?}, expected [n, 3]",
            name,
            raw.shape()
        )));
    }

    raw.outer_iter()
        .map(|row| {
            let mut face = [0usize; 3];
            for (slot, &v) in face.iter_mut().zip(row.iter()) {
                if !v.is_finite() || v < start as f64 {
                    return Err(GridPropError::construction(format!(
                        "Face variable {} holds an invalid node index {}",
                        name, v
                    )));
                }
                *slot = v as usize - start;
            }
            Ok(face)
        })
        .collect()
}

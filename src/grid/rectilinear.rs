//! Rectilinear longitude/latitude grid.
//!
//! Node data is shaped `[ny, nx]` and interpolated bilinearly within the cell
//! containing each point. Center data is shaped `[ny - 1, nx - 1]` and is
//! constant over each cell.

use lru::LruCache;
use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, Ix2};
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

use super::common::{check_points, is_strictly_monotonic, linear_weight, locate_cell};
use super::{DataLocation, Grid, GridTopology, LOCATION_CACHE_ENTRIES};
use crate::error::{GridPropError, Result};

/// Cell containing a point and the fractional position inside it
#[derive(Debug, Clone, Copy, PartialEq)]
struct CellPosition {
    /// Longitude (column) index of the cell's lower corner
    i: usize,
    /// Latitude (row) index of the cell's lower corner
    j: usize,
    fx: f64,
    fy: f64,
}

type Locations = Arc<Vec<Option<CellPosition>>>;

/// Grid with 1-D node longitudes and latitudes
#[derive(Debug)]
pub struct RectilinearGrid {
    lon: Vec<f64>,
    lat: Vec<f64>,
    topology: Option<GridTopology>,
    locations: Mutex<LruCache<u64, Locations>>,
}

impl RectilinearGrid {
    /// Create a grid from strictly monotonic node coordinates
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Result<Self> {
        for (name, coords) in [("longitude", &lon), ("latitude", &lat)] {
            if coords.len() < 2 {
                return Err(GridPropError::construction(format!(
                    "Rectilinear grid needs at least two {} nodes, got {}",
                    name,
                    coords.len()
                )));
            }
            if !is_strictly_monotonic(coords) {
                return Err(GridPropError::construction(format!(
                    "Rectilinear grid {} must be strictly monotonic",
                    name
                )));
            }
        }

        Ok(Self {
            lon,
            lat,
            topology: None,
            locations: Mutex::new(LruCache::new(
                NonZeroUsize::new(LOCATION_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    /// Record the dataset variables this grid was read from
    pub fn with_topology(mut self, topology: GridTopology) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    fn locate(&self, points: &ArrayView2<f64>) -> Vec<Option<CellPosition>> {
        points
            .rows()
            .into_iter()
            .map(|p| {
                let (i, fx) = locate_cell(p[0], &self.lon)?;
                let (j, fy) = locate_cell(p[1], &self.lat)?;
                Some(CellPosition { i, j, fx, fy })
            })
            .collect()
    }

    fn locations(&self, points: &ArrayView2<f64>, memo: Option<u64>) -> Locations {
        let Some(key) = memo else {
            return Arc::new(self.locate(points));
        };
        if let Some(found) = self.locations.lock().peek(&key) {
            if found.len() == points.nrows() {
                trace!(grid = self.name(), memo = key, "Reusing point locations");
                return Arc::clone(found);
            }
        }
        let located = Arc::new(self.locate(points));
        self.locations.lock().push(key, Arc::clone(&located));
        located
    }
}

impl Grid for RectilinearGrid {
    fn name(&self) -> &str {
        "rectilinear"
    }

    fn spatial_ndim(&self) -> usize {
        2
    }

    fn node_shape(&self) -> Vec<usize> {
        vec![self.lat.len(), self.lon.len()]
    }

    fn center_shape(&self) -> Vec<usize> {
        vec![self.lat.len() - 1, self.lon.len() - 1]
    }

    fn interpolate_located(
        &self,
        points: &ArrayView2<f64>,
        data: &ArrayViewD<f64>,
        location: DataLocation,
        memo: Option<u64>,
    ) -> Result<Array1<f64>> {
        check_points(points)?;
        if data.shape() != self.location_shape(location).as_slice() {
            return Err(GridPropError::shape_mismatch(format!(
                "Data slice shape {:?} does not match the {:?} shape {:?}",
                data.shape(),
                location,
                self.location_shape(location)
            )));
        }
        let data = data.view().into_dimensionality::<Ix2>()?;
        let cells = self.locations(points, memo);

        let values = cells
            .iter()
            .map(|cell| match (cell, location) {
                (None, _) => f64::NAN,
                (Some(c), DataLocation::Center) => {
                    // A point on the far edge belongs to the last cell
                    data[[c.j.min(data.nrows() - 1), c.i.min(data.ncols() - 1)]]
                }
                (Some(c), DataLocation::Node) => {
                    let (wx0, wx1) = linear_weight(c.fx);
                    let (wy0, wy1) = linear_weight(c.fy);
                    let (i, j) = (c.i, c.j);
                    wy0 * (wx0 * data[[j, i]] + wx1 * data[[j, i + 1]])
                        + wy1 * (wx0 * data[[j + 1, i]] + wx1 * data[[j + 1, i + 1]])
                }
            })
            .collect::<Vec<_>>();

        Ok(Array1::from(values))
    }

    fn center_points(&self) -> Array2<f64> {
        let ny = self.lat.len() - 1;
        let nx = self.lon.len() - 1;
        let mut centers = Array2::zeros((ny * nx, 2));
        for j in 0..ny {
            for i in 0..nx {
                let row = j * nx + i;
                centers[[row, 0]] = 0.5 * (self.lon[i] + self.lon[i + 1]);
                centers[[row, 1]] = 0.5 * (self.lat[j] + self.lat[j + 1]);
            }
        }
        centers
    }

    fn topology(&self) -> Option<&GridTopology> {
        self.topology.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn grid() -> RectilinearGrid {
        RectilinearGrid::new(vec![0.0, 1.0, 2.0], vec![10.0, 11.0]).unwrap()
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        assert!(RectilinearGrid::new(vec![0.0], vec![0.0, 1.0]).is_err());
        assert!(RectilinearGrid::new(vec![0.0, 2.0, 1.0], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_bilinear_node_interpolation() {
        let grid = grid();
        // value = lon + 10 * (lat - 10)
        let data = array![[0.0, 1.0, 2.0], [10.0, 11.0, 12.0]].into_dyn();
        let points = array![[0.5, 10.5], [2.0, 11.0], [0.0, 10.0], [1.25, 10.2]];

        let values = grid
            .interpolate_var_to_points(&points.view(), &data.view(), None)
            .unwrap();

        assert!((values[0] - 5.5).abs() < 1e-12);
        assert!((values[1] - 12.0).abs() < 1e-12);
        assert!((values[2] - 0.0).abs() < 1e-12);
        assert!((values[3] - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_center_interpolation() {
        let grid = grid();
        let data = array![[7.0, 9.0]].into_dyn();
        let points = array![[0.5, 10.5], [1.5, 10.9], [2.0, 11.0]];
        let values = grid
            .interpolate_var_to_points(&points.view(), &data.view(), None)
            .unwrap();
        assert_eq!(values.to_vec(), vec![7.0, 9.0, 9.0]);
    }

    #[test]
    fn test_outside_points_are_masked() {
        let grid = grid();
        let data = Array2::<f64>::ones((2, 3)).into_dyn();
        let points = array![[-1.0, 10.5], [0.5, 12.0], [0.5, 10.5]];
        let values = grid
            .interpolate_var_to_points(&points.view(), &data.view(), Some(7))
            .unwrap();
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_eq!(values[2], 1.0);
    }

    #[test]
    fn test_memoized_locations_are_reused() {
        let grid = grid();
        let data = Array2::<f64>::zeros((2, 3)).into_dyn();
        let points = array![[0.5, 10.5]];
        grid.interpolate_var_to_points(&points.view(), &data.view(), Some(1))
            .unwrap();
        assert!(grid.locations.lock().contains(&1));
    }

    #[test]
    fn test_shape_mismatch() {
        let grid = grid();
        let data = Array2::<f64>::zeros((3, 3)).into_dyn();
        let points = array![[0.5, 10.5]];
        let result = grid.interpolate_var_to_points(&points.view(), &data.view(), None);
        assert!(matches!(result, Err(GridPropError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_center_points() {
        let centers = grid().center_points();
        assert_eq!(centers, array![[0.5, 10.5], [1.5, 10.5]]);
    }
}

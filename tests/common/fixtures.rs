//! In-memory grids, time axes and datasets with known values.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::{array, Array1, Array2, Array3, ArrayView2, ArrayViewD};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gridprop::{
    DataLocation, Grid, GridPropError, GridRef, GridTopology, GriddedProperty, MemoryDataset,
    MemoryLoader, RectilinearGrid, TimeAxis,
};

/// 2016-01-01 00:00:00
pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn minutes(m: i64) -> NaiveDateTime {
    t0() + Duration::minutes(m)
}

/// `n` hourly steps starting at [`t0`]
pub fn hourly(n: usize) -> TimeAxis {
    TimeAxis::new((0..n).map(|i| t0() + Duration::hours(i as i64)).collect()).unwrap()
}

/// Unit square with nodes at 0 and 1
pub fn unit_grid() -> GridRef {
    Arc::new(RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap())
}

/// Grid wrapper counting horizontal interpolations
#[derive(Debug)]
pub struct CountingGrid {
    inner: RectilinearGrid,
    calls: AtomicUsize,
}

impl CountingGrid {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Grid for CountingGrid {
    fn name(&self) -> &str {
        "counting"
    }

    fn spatial_ndim(&self) -> usize {
        self.inner.spatial_ndim()
    }

    fn node_shape(&self) -> Vec<usize> {
        self.inner.node_shape()
    }

    fn center_shape(&self) -> Vec<usize> {
        self.inner.center_shape()
    }

    fn interpolate_located(
        &self,
        points: &ArrayView2<f64>,
        data: &ArrayViewD<f64>,
        location: DataLocation,
        memo: Option<u64>,
    ) -> Result<Array1<f64>, GridPropError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.interpolate_located(points, data, location, memo)
    }

    fn center_points(&self) -> Array2<f64> {
        self.inner.center_points()
    }

    fn topology(&self) -> Option<&GridTopology> {
        self.inner.topology()
    }
}

/// Uniform values 1, 2, 3 over three hourly steps, in m/s
pub fn stepped(grid: GridRef) -> GriddedProperty {
    let mut data = Array3::<f64>::zeros((3, 2, 2));
    for (i, mut slab) in data.outer_iter_mut().enumerate() {
        slab.fill(i as f64 + 1.0);
    }
    GriddedProperty::builder()
        .name("stepped")
        .units("m/s")
        .grid(grid)
        .data(data.into_dyn())
        .time(hourly(3))
        .build()
        .unwrap()
}

/// A 3×2 node grid with hourly currents and temperature.
///
/// `u` is `step + 1`, `v` is `-(step + 1)`, `water_t` holds 10 °C with one
/// missing cell at `(lat 1, lon 2)`.
pub fn currents_dataset(path: &str) -> MemoryDataset {
    let mut u = Array3::<f64>::zeros((3, 2, 3));
    for (i, mut slab) in u.outer_iter_mut().enumerate() {
        slab.fill(i as f64 + 1.0);
    }
    let v = u.mapv(|x| -x);
    let mut temp = Array3::<f64>::from_elem((3, 2, 3), 10.0);
    temp.slice_mut(ndarray::s![.., 1, 2]).fill(-999.0);

    MemoryDataset::new(path)
        .with_units("lon", &["lon"], array![0.0, 1.0, 2.0].into_dyn(), "degrees_east")
        .unwrap()
        .with_units("lat", &["lat"], array![0.0, 1.0].into_dyn(), "degrees_north")
        .unwrap()
        .with_units("time", &["time"], array![0.0, 1.0, 2.0].into_dyn(), "hours since 2016-01-01 00:00:00")
        .unwrap()
        .with_units("u", &["time", "lat", "lon"], u.into_dyn(), "m/s")
        .unwrap()
        .with_units("v", &["time", "lat", "lon"], v.into_dyn(), "m/s")
        .unwrap()
        .with_variable(
            "water_t",
            &["time", "lat", "lon"],
            temp.into_dyn(),
            &[
                ("units", gridprop::source::AttributeValue::Text("C".to_string())),
                ("_FillValue", gridprop::source::AttributeValue::Number(-999.0)),
            ],
        )
        .unwrap()
}

pub fn currents_loader(path: &str) -> MemoryLoader {
    let loader = MemoryLoader::new();
    loader.insert(currents_dataset(path)).unwrap();
    loader
}

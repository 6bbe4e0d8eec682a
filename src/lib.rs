//! # gridprop
//!
//! Gridded environmental properties for particle-transport models.
//!
//! This library wraps model output (currents, winds, water temperature,
//! salinity, ice) as properties that can be sampled at arbitrary points and
//! times. Values are interpolated horizontally on the property's grid,
//! vertically through its depth model and linearly in time.
//!
//! ## Key Features
//!
//! - **Scalar and vector properties**: vector fields compose co-located scalar components
//! - **Time and depth brackets**: linear blending between the bracketing steps and layers
//! - **Result memoization**: small fingerprint-keyed caches per property
//! - **Unit conversion**: results in any unit of the stored quantity
//! - **Source loading**: build properties from NetCDF files, sharing one dataset and grid
//!
//! ## Architecture
//!
//! - **Grids** (`grid`): point location and horizontal interpolation
//! - **Axes** (`time`, `depth`): time and vertical brackets
//! - **Properties** (`property`): the `at` pipeline, caching and fill values
//! - **Sources** (`source`, `record`): datasets, default names and persistence

pub mod cache;
pub mod config;
pub mod depth;
pub mod error;
pub mod grid;
pub mod logging;
pub mod property;
pub mod record;
pub mod source;
pub mod time;
pub mod units;

pub use config::Config;
pub use depth::{DepthModel, LayerRef, SigmaDepth};
pub use error::{GridPropError, Result};
pub use grid::{DataLocation, Grid, GridRef, GridTopology, RectilinearGrid, TriangularGrid};
pub use logging::{
    generate_operation_id, init_tracing, log_data_load_stats, log_error, log_operation_end,
    log_operation_start, log_timed_operation,
};
pub use property::{
    FieldData, FieldKind, GriddedProperty, Property, PropertyCollection, VectorGriddedProperty,
};
pub use record::{PropertyRecord, RecordKind};
pub use source::{
    Dataset, DatasetLoader, DatasetRef, MemoryDataset, MemoryLoader, PropertyKind, SourceRequest,
};
#[cfg(feature = "netcdf")]
pub use source::{NetcdfDataset, NetcdfLoader};
pub use time::TimeAxis;

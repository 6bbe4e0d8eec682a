//! Building properties from data sources.

use std::sync::Arc;
use tracing::{info, warn};

use super::shared::{SharedResources, SourceRequest};
use super::DatasetLoader;
use crate::depth::{DepthModel, LayerRef};
use crate::error::{GridPropError, Result};
use crate::property::{FieldData, GriddedProperty, VectorGriddedProperty};

impl GriddedProperty {
    /// Build a scalar property from a data source.
    ///
    /// Units default to the variable's `units` attribute, time to the
    /// variable's CF time coordinate, and 4-D data gets a surface-only depth
    /// model at the last layer. Data stays in the dataset unless the request
    /// sets `load_all`.
    pub fn from_source(request: &SourceRequest, loader: &dyn DatasetLoader) -> Result<Self> {
        let shared = SharedResources::resolve(request, loader)?;
        Self::from_shared(request, &shared)
    }

    pub(crate) fn from_shared(request: &SourceRequest, shared: &SharedResources) -> Result<Self> {
        let dataset = &shared.dataset;
        let varname = match (&request.varname, request.kind) {
            (Some(varname), _) => varname.clone(),
            (None, Some(kind)) => kind.resolve_scalar(dataset.as_ref())?,
            (None, None) => {
                return Err(GridPropError::UnresolvedVariable {
                    message: "Neither a variable name nor a property kind was supplied".to_string(),
                })
            }
        };

        let info = dataset.variable_checked(&varname)?;
        let data = if request.load_all {
            FieldData::Loaded(dataset.read(&varname)?)
        } else {
            FieldData::deferred(Arc::clone(dataset), varname.clone())?
        };
        let units = request.units.clone().or_else(|| info.units().map(str::to_string));
        let time = shared.time_for(request, &varname)?;

        let depth = match &request.depth {
            Some(depth) => Some(depth.clone()),
            None if data.shape().len() == shared.grid.spatial_ndim() + 2 => {
                warn!(variable = %varname, "No depth model given; sampling the last layer as the surface");
                Some(DepthModel::surface(LayerRef::Last))
            }
            None => None,
        };

        let mut builder = GriddedProperty::builder()
            .name(request.name.clone().unwrap_or_else(|| varname.clone()))
            .varname(varname.clone())
            .grid(shared.grid.clone())
            .field_data(data)
            .fill_value(request.fill_value);
        if let Some(units) = units {
            builder = builder.units(units);
        }
        if let Some(time) = time {
            builder = builder.time(time);
        }
        if let Some(depth) = depth {
            builder = builder.depth(depth);
        }
        if let Some(path) = &shared.data_file {
            builder = builder.data_file(path.clone());
        }
        if let Some(path) = &shared.grid_file {
            builder = builder.grid_file(path.clone());
        }
        if let Some(memoize) = request.memoize {
            builder = builder.memoize(memoize);
        }
        if let Some(entries) = request.cache_entries {
            builder = builder.cache_entries(entries);
        }

        let property = builder.build()?;
        info!(
            property = property.name(),
            variable = %varname,
            kind = ?property.kind(),
            loaded = request.load_all,
            "Built property from source"
        );
        Ok(property)
    }
}

impl VectorGriddedProperty {
    /// Build a vector property whose components share one dataset, grid and
    /// time axis.
    pub fn from_source(request: &SourceRequest, loader: &dyn DatasetLoader) -> Result<Self> {
        let shared = SharedResources::resolve(request, loader)?;
        let varnames = match (&request.varnames, request.kind) {
            (Some(varnames), _) if !varnames.is_empty() => varnames.clone(),
            (_, Some(kind)) => kind.resolve_vector(shared.dataset.as_ref())?,
            _ => {
                return Err(GridPropError::UnresolvedVariable {
                    message: "Neither variable names nor a property kind was supplied".to_string(),
                })
            }
        };
        let time = shared.time_for(request, &varnames[0])?;

        let components = varnames
            .iter()
            .map(|varname| {
                let component = SourceRequest {
                    varname: Some(varname.clone()),
                    varnames: None,
                    name: Some(varname.clone()),
                    time: time.clone(),
                    ..request.clone()
                };
                GriddedProperty::from_shared(&component, &shared)
            })
            .collect::<Result<Vec<_>>>()?;

        let name = request
            .name
            .clone()
            .or_else(|| request.kind.map(|k| k.name_prefix().to_string()));
        let mut builder = VectorGriddedProperty::builder()
            .components(components)
            .grid(shared.grid.clone());
        if let Some(name) = name {
            builder = builder.name(name);
        }
        if let Some(units) = &request.units {
            builder = builder.units(units.clone());
        }
        if let Some(memoize) = request.memoize {
            builder = builder.memoize(memoize);
        }
        if let Some(entries) = request.vector_cache_entries {
            builder = builder.cache_entries(entries);
        }
        builder.build()
    }
}

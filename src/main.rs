//! gridprop - sample gridded environmental properties at a point
//!
//! Opens a NetCDF file, builds a scalar or vector property from it and prints
//! the interpolated value at the requested location and time as JSON.

use ndarray::Array2;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info};

use gridprop::config::Args;
use gridprop::time::parse_timestamp;
use gridprop::{
    init_tracing, log_data_load_stats, log_error, log_operation_end, log_operation_start,
    log_timed_operation, Config, DatasetLoader, GridPropError, GriddedProperty, NetcdfLoader,
    Property, PropertyKind, Result, SourceRequest, VectorGriddedProperty,
};

fn main() -> Result<()> {
    let (config, args) = Config::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    config.validate().map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        e
    })?;

    init_tracing(&config.log_level);
    info!("Starting gridprop v{}", env!("CARGO_PKG_VERSION"));

    run(&config, &args).map_err(|e| {
        log_error(&e, "gridprop");
        e
    })
}

fn run(config: &Config, args: &Args) -> Result<()> {
    let start = Instant::now();
    log_operation_start("load", Some(&args.data_file.display().to_string()));

    let loader = NetcdfLoader;
    let dataset = loader.open(&args.data_file).map_err(|e| {
        error!("Failed to open {}: {}", args.data_file.display(), e);
        e
    })?;
    log_data_load_stats(dataset.as_ref());

    let mut request = config.apply(SourceRequest::default().data_file(&args.data_file).dataset(dataset));
    if let Some(grid_file) = &args.grid_file {
        request = request.grid_file(grid_file);
    }

    let property = build_property(request, args, &loader)?;
    log_operation_end("load", start, true);

    let points = match args.depth {
        Some(depth) => Array2::from_shape_vec((1, 3), vec![args.lon, args.lat, depth])?,
        None => Array2::from_shape_vec((1, 2), vec![args.lon, args.lat])?,
    };

    let time = match &args.time {
        Some(text) => parse_timestamp(text).ok_or_else(|| GridPropError::Config {
            message: format!("Unrecognized time: {}", text),
        })?,
        None => match &property {
            Property::Scalar(p) => p.time().map(|t| t.min_time()),
            Property::Vector(p) => p.time().map(|t| t.min_time()),
        }
        .unwrap_or_else(|| chrono::Utc::now().naive_utc()),
    };

    let units = args.units.as_deref();
    let extrapolate = config.interpolation.extrapolate;
    let values: Vec<f64> = log_timed_operation("at", || -> Result<Vec<f64>> {
        Ok(match &property {
            Property::Scalar(p) => p.at(&points.view(), time, units, extrapolate)?.to_vec(),
            Property::Vector(p) => p.at(&points.view(), time, units, extrapolate)?.row(0).to_vec(),
        })
    })?;

    let output_units = units.map(str::to_string).or_else(|| match &property {
        Property::Scalar(p) => p.units().map(str::to_string),
        Property::Vector(p) => p.units().map(str::to_string),
    });
    let output = json!({
        "name": property.name(),
        "units": output_units,
        "time": time.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "point": points.row(0).to_vec(),
        "values": values,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One variable makes a scalar property, several make a vector property;
/// otherwise the kind's conventional names decide.
fn build_property(request: SourceRequest, args: &Args, loader: &dyn DatasetLoader) -> Result<Property> {
    match args.vars.as_slice() {
        [varname] => Ok(GriddedProperty::from_source(&request.varname(varname), loader)?.into()),
        [] => {
            let kind: PropertyKind = args
                .kind
                .as_deref()
                .ok_or_else(|| GridPropError::Config {
                    message: "Either --var or --kind is required".to_string(),
                })?
                .parse()?;
            let request = request.kind(kind);
            if kind.vector_names().is_empty() {
                Ok(GriddedProperty::from_source(&request, loader)?.into())
            } else {
                Ok(VectorGriddedProperty::from_source(&request, loader)?.into())
            }
        }
        varnames => Ok(VectorGriddedProperty::from_source(&request.varnames(varnames.iter().cloned()), loader)?.into()),
    }
}
